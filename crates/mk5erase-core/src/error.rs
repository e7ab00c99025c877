//! Error types for the mk5erase core library

use std::time::Duration;

use thiserror::Error;

use crate::bank::BankId;

/// Main error type for recorder operations
#[derive(Error, Debug)]
pub enum Error {
    /// The TCP link to the recorder could not be established
    #[error("Failed to connect to {address}: {source}")]
    Connection {
        /// `host:port` that was dialled
        address: String,
        /// The underlying socket error
        source: std::io::Error,
    },

    /// The recorder identified itself as something we don't drive
    #[error("Failed to recognize Mark5 type '{0}'")]
    UnsupportedDevice(String),

    /// A reply carried a status code outside the accepted set
    #[error("Query ('{query}') execution failed, reply: '{reply}'")]
    CommandRejected {
        /// Query that was sent
        query: String,
        /// Raw reply text for that query
        reply: String,
    },

    /// A batched reply did not contain one segment per query
    #[error("Number of query replies is different from number of queries (sent: '{sent}', received '{received}')")]
    ReplyCountMismatch {
        /// Joined query line that was sent
        sent: String,
        /// Raw reply text
        received: String,
    },

    /// The bank never reported a settled state
    #[error("Switching to bank {bank} timed out after {elapsed:?}")]
    BankSwitchTimeout {
        /// Bank that was requested
        bank: BankId,
        /// Time spent polling
        elapsed: Duration,
    },

    /// Per-drive statistics were inconsistent with the serial list
    #[error("Disk statistics protocol error: {0}")]
    StatsProtocol(String),

    /// A reply field was missing or could not be interpreted
    #[error("Malformed reply to '{query}': {reason} (reply: '{reply}')")]
    MalformedReply {
        /// Query whose reply was malformed
        query: String,
        /// Decoded reply fields, re-joined for display
        reply: String,
        /// What was wrong with it
        reason: String,
    },

    /// The link failed mid-exchange
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation was cancelled
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias using the mk5erase error type
pub type Result<T> = std::result::Result<T, Error>;
