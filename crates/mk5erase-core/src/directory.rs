//! Scan directory of a mounted pack
//!
//! Before a pack is erased the operator gets to see what is on it. The directory is read scan by
//! scan with `scan_set=<n>;scan_set?`, and consecutive scans of the same experiment and station
//! are folded into one line.

use serde::Serialize;

use crate::bank::{BankController, BankId};
use crate::clock::Clock;
use crate::codec::Reply;
use crate::error::Result;
use crate::link::{DeviceLink, DeviceType};
use crate::transport::Transport;

/// Offset from the end of the last scan used to read the end time
const END_TIME_OFFSET: i64 = -1_000_000;

/// Summary from `dir_info?`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirInfo {
    /// Number of scans recorded
    pub scan_count: usize,
    /// Byte offset of the record pointer
    pub record_pointer: u64,
    /// Capacity of the pack in bytes
    pub pack_size: u64,
}

impl DirInfo {
    /// Interpret a `dir_info?` reply
    pub fn from_reply(reply: &Reply) -> Result<Self> {
        Ok(Self {
            scan_count: reply.parse_field(2, "scan count")?,
            record_pointer: reply.parse_field(3, "record pointer")?,
            pack_size: reply.parse_field(4, "pack size")?,
        })
    }

    /// Whether nothing has ever been recorded
    pub fn is_empty(&self) -> bool {
        self.scan_count == 0 && self.record_pointer == 0
    }
}

/// One scan from `scan_set?`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanInfo {
    /// Scan name, usually `<exper>_<station>_<scan>`
    pub name: String,
    /// First byte of the scan
    pub start_byte: u64,
    /// Byte after the last byte of the scan
    pub end_byte: u64,
}

impl ScanInfo {
    /// Interpret a `scan_set?` reply
    pub fn from_reply(reply: &Reply) -> Result<Self> {
        Ok(Self {
            name: reply.require(3, "scan name")?.to_string(),
            start_byte: reply.parse_field(4, "start byte")?,
            end_byte: reply.parse_field(5, "end byte")?,
        })
    }

    /// `(exper/station, scan)` if the name follows the usual three-part scheme
    fn experiment_station(&self) -> Option<(String, &str)> {
        let parts: Vec<&str> = self.name.split('_').collect();
        match parts.as_slice() {
            [exper, station, scan] => Some((format!("{}/{}", exper, station), scan)),
            _ => None,
        }
    }
}

/// A run of consecutive scans shown as one directory line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanGroup {
    /// `exper/station`, or the raw scan name for irregular names
    pub label: String,
    /// Scan part of the first name in the run (irregular names have none)
    pub first_scan: Option<String>,
    /// Scan part of the last name in the run
    pub last_scan: Option<String>,
    /// First byte of the run
    pub start_byte: u64,
    /// End byte of the last scan in the run
    pub end_byte: u64,
}

/// Fold consecutive scans of one experiment and station together
pub fn group_scans(scans: &[ScanInfo]) -> Vec<ScanGroup> {
    let mut groups: Vec<ScanGroup> = Vec::new();
    let mut previous_regular = false;

    for scan in scans {
        match scan.experiment_station() {
            Some((label, number)) => {
                let extends = previous_regular
                    && groups.last().is_some_and(|group| group.label == label);
                if extends {
                    if let Some(group) = groups.last_mut() {
                        group.last_scan = Some(number.to_string());
                        group.end_byte = scan.end_byte;
                    }
                } else {
                    groups.push(ScanGroup {
                        label,
                        first_scan: Some(number.to_string()),
                        last_scan: Some(number.to_string()),
                        start_byte: scan.start_byte,
                        end_byte: scan.end_byte,
                    });
                }
                previous_regular = true;
            }
            None => {
                groups.push(ScanGroup {
                    label: scan.name.clone(),
                    first_scan: None,
                    last_scan: None,
                    start_byte: scan.start_byte,
                    end_byte: scan.end_byte,
                });
                previous_regular = false;
            }
        }
    }

    groups
}

/// Where `data_check?` puts the data source and time, per recorder type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataCheckLayout {
    /// Field holding the data source
    pub source_field: usize,
    /// Field holding the time stamp
    pub time_field: usize,
    /// Sources for which the time stamp is meaningless
    pub invalid_sources: &'static [&'static str],
}

impl DataCheckLayout {
    /// Layout used by `device`
    pub fn for_device(device: DeviceType) -> Self {
        match device {
            DeviceType::Mark5B => Self {
                source_field: 2,
                time_field: 3,
                invalid_sources: &["tvg", "?"],
            },
            DeviceType::Mark5A | DeviceType::Mark5C => Self {
                source_field: 2,
                time_field: 4,
                invalid_sources: &["SS", "tvg", "?"],
            },
        }
    }

    /// Time stamp of a `data_check?` reply, `None` if the data source carries none
    pub fn time(&self, reply: &Reply) -> Result<Option<String>> {
        let source = reply.require(self.source_field, "data source")?;
        if self.invalid_sources.contains(&source) {
            return Ok(None);
        }
        Ok(Some(reply.require(self.time_field, "time")?.to_string()))
    }
}

/// Everything shown about one pack before it is erased
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    /// Bank the pack is mounted in
    pub bank: BankId,
    /// Directory summary
    pub info: DirInfo,
    /// Scan runs in recording order
    pub groups: Vec<ScanGroup>,
    /// Time stamp at the start of the first scan
    pub start_time: Option<String>,
    /// Time stamp near the end of the last scan
    pub end_time: Option<String>,
}

/// Select `bank` and read its scan directory
pub fn read_directory<T: Transport, C: Clock>(
    link: &mut DeviceLink<T>,
    banks: &BankController<C>,
    bank: BankId,
) -> Result<DirectoryListing> {
    banks.set_bank(link, bank)?;

    let info = DirInfo::from_reply(&link.send_query("dir_info?")?)?;
    tracing::debug!(
        "Bank {}: {} scan(s), record pointer {}",
        bank,
        info.scan_count,
        info.record_pointer
    );

    if info.scan_count == 0 {
        return Ok(DirectoryListing {
            bank,
            info,
            groups: Vec::new(),
            start_time: None,
            end_time: None,
        });
    }

    let mut scans = Vec::with_capacity(info.scan_count);
    for number in 1..=info.scan_count {
        let select = format!("scan_set={}", number);
        let replies = link.send_queries(&[select.as_str(), "scan_set?"])?;
        scans.push(ScanInfo::from_reply(&replies[1])?);
    }

    let layout = DataCheckLayout::for_device(link.device_type());
    let start = link.send_queries(&["scan_set=1", "data_check?"])?;
    let start_time = layout.time(&start[1])?;
    let last = format!("scan_set={}:{}", info.scan_count, END_TIME_OFFSET);
    let end = link.send_queries(&[last.as_str(), "data_check?"])?;
    let end_time = layout.time(&end[1])?;

    Ok(DirectoryListing {
        bank,
        info,
        groups: group_scans(&scans),
        start_time,
        end_time,
    })
}
