//! # mk5erase core
//!
//! Protocol client and erase/condition controller for Mark5 disk-pack recorders.
//!
//! ## Modules
//!
//! - `codec`: Query encoding and reply decoding for the ASCII control protocol
//! - `transport`: TCP and scripted byte transports
//! - `clock`: Time source for the polling loops
//! - `link`: Identified request/response link to one recorder
//! - `bank`: Bank selection and mounted pack discovery
//! - `erase`: Erase and conditioning controller
//! - `stats`: Per-drive statistics collection
//! - `directory`: Scan directory of a mounted pack
//! - `error`: Error types and result aliases
//! - `settings`: Persistent user settings from configuration file
//!
//! ## Example
//!
//! ```no_run
//! use mk5erase_core::{BankId, DeviceLink, EraseConfig, EraseController, DEFAULT_PORT};
//!
//! let mut link = DeviceLink::connect("mark5.example.org", DEFAULT_PORT)?;
//!
//! let config = EraseConfig::new().condition(true).sample_progress(true);
//! let controller = EraseController::with_config(config)
//!     .on_progress(|p| println!("{} pass: {:.0}% to go", p.pass, p.percentage()));
//!
//! let result = controller.run(&mut link, BankId::A)?;
//! println!("Conditioned in {:?}", result.duration);
//! # Ok::<(), mk5erase_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bank;
pub mod clock;
pub mod codec;
pub mod directory;
pub mod erase;
pub mod error;
pub mod link;
pub mod settings;
pub mod stats;
pub mod transport;

pub use bank::{
    BankController, BankId, MountedBank, BANK_POLL_ACCEPTED, DEFAULT_POLL_INTERVAL,
    DEFAULT_SWITCH_TIMEOUT,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Reply, DEFAULT_ACCEPTED, LINE_TERMINATOR};
pub use directory::{
    group_scans, read_directory, DataCheckLayout, DirInfo, DirectoryListing, ScanGroup, ScanInfo,
};
pub use erase::{
    format_thresholds, stat_thresholds, ConditionPass, ConditionProgress, EraseConfig,
    EraseController, EraseResult, ProgressCallback, ProgressSampler, DEFAULT_SAMPLE_INTERVAL,
    DEFAULT_TRANSFER_POLL_INTERVAL,
};
pub use error::{Error, Result};
pub use link::{DeviceLink, DeviceType, DEFAULT_PORT};
pub use settings::{DeviceSettings, DisplaySettings, EraseSettings, Settings, SettingsError};
pub use stats::{
    collect_disk_stats, DiskSerials, DiskStatVector, DiskStats, DriveKey, STAT_VECTOR_LEN,
};
pub use transport::{ScriptedTransport, SentLog, TcpTransport, Transport, IO_TIMEOUT};
