//! Request/response link to one recorder
//!
//! A [`DeviceLink`] owns the transport for its whole lifetime. Every method takes `&mut self`:
//! the protocol has no request ids, so two interleaved exchanges would misalign replies.

use std::fmt;

use serde::Serialize;

use crate::codec::{self, Reply, DEFAULT_ACCEPTED};
use crate::error::{Error, Result};
use crate::transport::{TcpTransport, Transport};

/// Default control port of the recorder software
pub const DEFAULT_PORT: u16 = 2620;

/// Recorder variants this tool knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceType {
    /// Mark5A
    Mark5A,
    /// Mark5B (and B+)
    Mark5B,
    /// Mark5C
    Mark5C,
}

impl DeviceType {
    /// Classify the type string reported by `dts_id?`
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "mark5A" => Some(DeviceType::Mark5A),
            "mark5b" => Some(DeviceType::Mark5B),
            "Mark5C" => Some(DeviceType::Mark5C),
            _ => None,
        }
    }

    /// The type string as the recorder reports it
    pub fn id(&self) -> &'static str {
        match self {
            DeviceType::Mark5A => "mark5A",
            DeviceType::Mark5B => "mark5b",
            DeviceType::Mark5C => "Mark5C",
        }
    }

    /// Query reporting the current byte position during a transfer
    pub fn position_query(&self) -> &'static str {
        match self {
            DeviceType::Mark5A => "position?",
            DeviceType::Mark5B | DeviceType::Mark5C => "pointers?",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// An identified recorder behind a transport
pub struct DeviceLink<T: Transport = TcpTransport> {
    transport: T,
    device_type: DeviceType,
}

impl DeviceLink<TcpTransport> {
    /// Connect over TCP and identify the recorder
    pub fn connect(address: &str, port: u16) -> Result<Self> {
        let transport = TcpTransport::connect(address, port)?;
        Self::with_transport(transport)
    }
}

impl<T: Transport> DeviceLink<T> {
    /// Identify the recorder behind an already-open transport
    pub fn with_transport(mut transport: T) -> Result<Self> {
        let reply = exchange(&mut transport, "dts_id?", DEFAULT_ACCEPTED)?;
        let id = reply.require(2, "device type")?;
        let device_type =
            DeviceType::from_id(id).ok_or_else(|| Error::UnsupportedDevice(id.to_string()))?;

        tracing::info!("Connected to {} recorder", device_type);
        Ok(Self {
            transport,
            device_type,
        })
    }

    /// Recorder variant reported at connect time
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Send one query, accepting status 0 or 1
    pub fn send_query(&mut self, query: &str) -> Result<Reply> {
        self.send_query_accepting(query, DEFAULT_ACCEPTED)
    }

    /// Send one query, accepting any status in `accepted`
    pub fn send_query_accepting(&mut self, query: &str, accepted: &[&str]) -> Result<Reply> {
        exchange(&mut self.transport, query, accepted)
    }

    /// Send several queries as one line, accepting status 0 or 1 for each
    pub fn send_queries<S: AsRef<str>>(&mut self, queries: &[S]) -> Result<Vec<Reply>> {
        self.send_queries_accepting(queries, DEFAULT_ACCEPTED)
    }

    /// Send several queries as one line and return one reply per query, in order
    ///
    /// The device executes the joined line as a unit, which is what makes pairs like
    /// `protect=off;reset=erase` safe. A reply with the wrong number of segments means the
    /// link is out of step and fails the whole batch.
    pub fn send_queries_accepting<S: AsRef<str>>(
        &mut self,
        queries: &[S],
        accepted: &[&str],
    ) -> Result<Vec<Reply>> {
        let line = codec::encode_batch(queries);
        self.transport.send(&line)?;
        let raw = self.transport.receive()?;
        tracing::trace!(query = line.trim_end(), reply = %raw.trim_end(), "batch exchange");

        let segments = codec::split_batch(&raw);
        if segments.len() != queries.len() {
            return Err(Error::ReplyCountMismatch {
                sent: line.trim_end().to_string(),
                received: raw.trim_end().to_string(),
            });
        }

        queries
            .iter()
            .zip(segments)
            .map(|(query, segment)| check_status(query.as_ref(), segment, accepted))
            .collect()
    }
}

fn exchange<T: Transport>(transport: &mut T, query: &str, accepted: &[&str]) -> Result<Reply> {
    transport.send(&codec::encode(query))?;
    let raw = transport.receive()?;
    tracing::trace!(query, reply = %raw.trim_end(), "exchange");
    check_status(query, &raw, accepted)
}

fn check_status(query: &str, raw: &str, accepted: &[&str]) -> Result<Reply> {
    let reply = Reply::decode(raw);
    match reply.status() {
        Some(status) if accepted.contains(&status) => Ok(reply),
        _ => Err(Error::CommandRejected {
            query: query.to_string(),
            reply: raw.trim().to_string(),
        }),
    }
}
