//! List command - shows the directory of every mounted pack

use anyhow::{Context, Result};
use console::style;
use serde_json::json;

use mk5erase_core::{read_directory, BankController};

use super::{connect, Target};
use crate::display;

/// Execute the list command
pub fn execute(target: &Target, gigabyte: bool, json: bool, silent: bool) -> Result<()> {
    let mut link = connect(target)?;
    let controller = BankController::new();
    let mounted = controller
        .mounted_banks(&mut link)
        .context("Failed to list mounted banks")?;

    let mut listings = Vec::with_capacity(mounted.len());
    for pack in &mounted {
        let listing = read_directory(&mut link, &controller, pack.bank)
            .with_context(|| format!("Failed to read the directory of bank {}", pack.bank))?;
        listings.push((pack, listing));
    }

    // JSON output mode - always output even in silent mode (it's machine-readable)
    if json {
        let output: Vec<_> = listings
            .iter()
            .map(|(pack, listing)| {
                json!({
                    "vsn": pack.vsn,
                    "active": pack.active,
                    "directory": listing,
                })
            })
            .collect();
        let output =
            serde_json::to_string_pretty(&output).context("Failed to serialize directory")?;
        println!("{}", output);
        return Ok(());
    }

    if silent {
        return Ok(());
    }

    if listings.is_empty() {
        println!("Nothing mounted");
        return Ok(());
    }

    println!(
        "{} {} pack(s) on {}:",
        style("Found").green().bold(),
        listings.len(),
        link.device_type()
    );
    for (pack, listing) in &listings {
        println!();
        for line in display::directory_report(&pack.vsn, listing, gigabyte) {
            println!("{}", line);
        }
        if pack.active {
            println!("{}", style("(active bank)").dim());
        }
    }

    Ok(())
}
