//! Formatting helpers for operator output

use humansize::{format_size, DECIMAL};
use mk5erase_core::{DirectoryListing, DiskStatVector, DriveKey, ScanGroup};

const GIGABYTE: f64 = 1.0e9;

const COLUMNS: [&str; 5] = [
    "exper/station",
    "start scan",
    "end scan",
    "start byte",
    "end byte",
];

/// Byte count in the units the operator asked for
pub fn format_bytes(bytes: u64, gigabyte: bool) -> String {
    if gigabyte {
        format!("{:.9} GB", bytes as f64 / GIGABYTE)
    } else {
        format!("{} B", bytes)
    }
}

/// Byte count for progress lines, padded so successive lines line up
pub fn format_progress_bytes(bytes: u64, gigabyte: bool) -> String {
    if gigabyte {
        format!("{:13.7} GB", bytes as f64 / GIGABYTE)
    } else {
        format!("{} B", bytes)
    }
}

/// Compact human readable size for summaries
pub fn format_pack_size(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Bytes per second to megabits per second
pub fn to_mbps(bytes_per_sec: f64) -> f64 {
    bytes_per_sec * 8.0 / 1.0e6
}

/// One line of drive statistics
pub fn format_drive_stats(key: &DriveKey, stats: &DiskStatVector) -> String {
    let values: Vec<String> = stats.iter().map(u64::to_string).collect();
    format!("{}, {}: {}", key.index, key.serial, values.join(" : "))
}

/// Scan directory as aligned table rows, header first
pub fn directory_table(groups: &[ScanGroup], gigabyte: bool) -> Vec<String> {
    let mut rows: Vec<[String; 5]> = vec![COLUMNS.map(String::from)];
    rows.extend(groups.iter().map(|group| {
        [
            group.label.clone(),
            group.first_scan.clone().unwrap_or_default(),
            group.last_scan.clone().unwrap_or_default(),
            format_bytes(group.start_byte, gigabyte),
            format_bytes(group.end_byte, gigabyte),
        ]
    }));

    let mut widths = [0usize; 5];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(widths)
                .enumerate()
                .map(|(column, (cell, width))| {
                    if column == 0 {
                        format!("{:<width$}", cell, width = width)
                    } else {
                        format!("{:>width$}", cell, width = width)
                    }
                })
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect()
}

/// Full directory report for one pack
pub fn directory_report(vsn: &str, listing: &DirectoryListing, gigabyte: bool) -> Vec<String> {
    let mut lines = vec![format!("VSN <{}> in bank {} contents:", vsn, listing.bank)];
    let info = &listing.info;

    if info.scan_count == 0 {
        if info.record_pointer != 0 {
            lines.push(format!(
                "No scans in DirList, but record pointer = {}",
                format_bytes(info.record_pointer, gigabyte)
            ));
        } else {
            lines.push("Disk pack is empty".to_string());
        }
        return lines;
    }

    lines.extend(directory_table(&listing.groups, gigabyte));
    lines.push(format!(
        "Size: {}  Scans: {}  Recorded: {}",
        format_bytes(info.pack_size, gigabyte),
        info.scan_count,
        format_bytes(info.record_pointer, gigabyte)
    ));
    lines.push(format!(
        "Start time: {}  End time {}",
        listing.start_time.as_deref().unwrap_or("unknown"),
        listing.end_time.as_deref().unwrap_or("unknown")
    ));
    lines
}
