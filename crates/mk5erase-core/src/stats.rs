//! Per-drive statistics
//!
//! `get_stats?` reports one drive per call and cycles through the drives that are present.
//! The number of drives depends on the hardware, so the walk stops when the first drive seen
//! comes round again.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::codec::Reply;
use crate::error::{Error, Result};
use crate::link::DeviceLink;
use crate::transport::Transport;

/// Number of values in one drive's statistics
pub const STAT_VECTOR_LEN: usize = 9;

/// First field of `get_stats?` holding a statistic
const FIRST_STAT_FIELD: usize = 3;

/// First field of `disk_serial?` holding a serial number
const FIRST_SERIAL_FIELD: usize = 2;

/// Statistics of one drive, as reported by the recorder
pub type DiskStatVector = [u64; STAT_VECTOR_LEN];

/// Statistics of every drive in a pack
pub type DiskStats = BTreeMap<DriveKey, DiskStatVector>;

/// Identifies one drive of a pack
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DriveKey {
    /// Drive position as numbered by the recorder
    pub index: usize,
    /// Drive serial number (empty if the recorder reported none)
    pub serial: String,
}

/// Serial numbers from `disk_serial?`, indexed by drive
///
/// Drives come in master/slave pairs; an empty slot means no drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskSerials {
    serials: Vec<String>,
}

impl DiskSerials {
    /// Query the recorder for its drive serials
    pub fn query<T: Transport>(link: &mut DeviceLink<T>) -> Result<Self> {
        Ok(Self::from_reply(&link.send_query("disk_serial?")?))
    }

    /// Interpret a `disk_serial?` reply
    pub fn from_reply(reply: &Reply) -> Self {
        let serials = reply
            .fields()
            .iter()
            .skip(FIRST_SERIAL_FIELD)
            .cloned()
            .collect();
        Self { serials }
    }

    /// Serial of drive `index`, if the recorder reported that slot
    pub fn serial(&self, index: usize) -> Option<&str> {
        self.serials.get(index).map(String::as_str)
    }

    /// Number of slots reported
    pub fn len(&self) -> usize {
        self.serials.len()
    }

    /// Whether no slots were reported
    pub fn is_empty(&self) -> bool {
        self.serials.is_empty()
    }

    /// Number of busses with a master drive attached
    pub fn bus_count(&self) -> u64 {
        self.serials
            .iter()
            .step_by(2)
            .filter(|serial| !serial.is_empty())
            .count() as u64
    }
}

/// Walk the statistics ring once and return every drive's statistics
pub fn collect_disk_stats<T: Transport>(link: &mut DeviceLink<T>) -> Result<DiskStats> {
    let serials = DiskSerials::query(link)?;
    let mut stats = DiskStats::new();

    let mut reply = link.send_query("get_stats?")?;
    let sentinel = drive_index(&reply)?;

    loop {
        let drive = drive_index(&reply)?;
        let serial = serials.serial(drive).ok_or_else(|| {
            Error::StatsProtocol(format!(
                "drive {} has no serial entry ({} slots reported)",
                drive,
                serials.len()
            ))
        })?;
        let key = DriveKey {
            index: drive,
            serial: serial.to_string(),
        };
        if stats.contains_key(&key) {
            return Err(Error::StatsProtocol(format!(
                "drive {} reported twice before returning to drive {}",
                drive, sentinel
            )));
        }

        tracing::debug!("Drive {} ({}) statistics collected", drive, key.serial);
        stats.insert(key, stat_vector(&reply)?);

        reply = link.send_query("get_stats?")?;
        if drive_index(&reply)? == sentinel {
            break;
        }
    }

    Ok(stats)
}

fn drive_index(reply: &Reply) -> Result<usize> {
    reply.parse_field(2, "drive index")
}

fn stat_vector(reply: &Reply) -> Result<DiskStatVector> {
    if reply.len() < FIRST_STAT_FIELD + STAT_VECTOR_LEN {
        return Err(Error::StatsProtocol(format!(
            "expected {} statistics, got {} (reply: '{}')",
            STAT_VECTOR_LEN,
            reply.len().saturating_sub(FIRST_STAT_FIELD),
            reply
        )));
    }

    let mut values = [0u64; STAT_VECTOR_LEN];
    for (offset, value) in values.iter_mut().enumerate() {
        *value = reply.parse_field(FIRST_STAT_FIELD + offset, "statistic")?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;

    fn stats_reply(drive: usize) -> String {
        let values: Vec<String> = (0..STAT_VECTOR_LEN)
            .map(|i| (drive * 100 + i).to_string())
            .collect();
        format!("!get_stats? 0 : {} : {} ;", drive, values.join(" : "))
    }

    fn ring_link(
        serials: &'static str,
        order: Vec<usize>,
    ) -> (DeviceLink<ScriptedTransport>, crate::transport::SentLog) {
        let mut replies = vec![
            "!dts_id? 0 : mark5b ;".to_string(),
            format!("!disk_serial? 0 : {} ;", serials),
        ];
        replies.extend(order.into_iter().map(stats_reply));
        let transport = ScriptedTransport::from_replies(replies);
        let log = transport.sent_log();
        (DeviceLink::with_transport(transport).unwrap(), log)
    }

    #[test]
    fn test_collect_stops_at_wraparound() {
        let (mut link, log) = ring_link("S0 : S1 : S2 : S3", vec![0, 1, 2, 3, 0]);

        let stats = collect_disk_stats(&mut link).unwrap();

        assert_eq!(stats.len(), 4);
        assert_eq!(log.count("get_stats?"), 5);
        assert_eq!(log.count("disk_serial?"), 1);
        let keys: Vec<_> = stats.keys().map(|k| (k.index, k.serial.as_str())).collect();
        assert_eq!(keys, vec![(0, "S0"), (1, "S1"), (2, "S2"), (3, "S3")]);
        assert_eq!(
            stats[&DriveKey {
                index: 2,
                serial: "S2".to_string()
            }],
            [200, 201, 202, 203, 204, 205, 206, 207, 208]
        );
    }

    #[test]
    fn test_collect_starting_mid_ring() {
        let (mut link, _log) = ring_link("S0 : S1 : S2 : S3", vec![2, 3, 0, 1, 2]);
        let stats = collect_disk_stats(&mut link).unwrap();
        assert_eq!(stats.len(), 4);
    }

    #[test]
    fn test_collect_single_drive() {
        let (mut link, _log) = ring_link("S0", vec![0, 0]);
        let stats = collect_disk_stats(&mut link).unwrap();
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn test_collect_sparse_serials() {
        // Drive 1 slot is empty but the recorder still reports statistics for 0 and 2
        let (mut link, _log) = ring_link("S0 :  : S2", vec![0, 2, 0]);
        let stats = collect_disk_stats(&mut link).unwrap();
        let indices: Vec<usize> = stats.keys().map(|k| k.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_collect_drive_without_serial() {
        let (mut link, _log) = ring_link("S0 : S1", vec![0, 1, 5]);
        let err = collect_disk_stats(&mut link).unwrap_err();
        assert!(matches!(err, Error::StatsProtocol(ref msg) if msg.contains("drive 5")));
    }

    #[test]
    fn test_collect_ring_that_never_wraps() {
        let (mut link, _log) = ring_link("S0 : S1 : S2", vec![0, 1, 2, 1]);
        assert!(matches!(
            collect_disk_stats(&mut link),
            Err(Error::StatsProtocol(_))
        ));
    }

    #[test]
    fn test_collect_short_stats_reply() {
        let replies = vec![
            "!dts_id? 0 : mark5b ;".to_string(),
            "!disk_serial? 0 : S0 ;".to_string(),
            "!get_stats? 0 : 0 : 1 : 2 ;".to_string(),
        ];
        let mut link = DeviceLink::with_transport(ScriptedTransport::from_replies(replies)).unwrap();
        assert!(matches!(
            collect_disk_stats(&mut link),
            Err(Error::StatsProtocol(_))
        ));
    }

    #[test]
    fn test_bus_count() {
        let reply = Reply::decode("!disk_serial? 0 : M0 : S0 : M1 :  :  :  : M3 : S3 ;");
        let serials = DiskSerials::from_reply(&reply);
        assert_eq!(serials.len(), 8);
        assert_eq!(serials.bus_count(), 3);
        assert_eq!(serials.serial(6), Some("M3"));
        assert_eq!(serials.serial(8), None);
    }
}
