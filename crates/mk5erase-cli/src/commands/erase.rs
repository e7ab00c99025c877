//! Erase command - erases (and optionally conditions) the mounted packs
//!
//! For every mounted pack the directory is shown and the operator confirms before anything is
//! touched. Confirmed banks are then erased one after the other.

use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use mk5erase_core::{
    read_directory, BankController, BankId, ConditionProgress, DeviceLink, DirInfo, EraseConfig,
    EraseController, EraseResult, Error,
};

use super::{connect, Target};
use crate::display;

/// Arguments for the erase command
pub struct EraseArgs {
    pub target: Target,
    pub config: EraseConfig,
    pub gigabyte: bool,
    pub skip_confirm: bool,
    pub json: bool,
    pub test: bool,
    pub cancel_flag: Arc<AtomicBool>,
    pub silent: bool,
}

/// Execute the erase command
pub fn execute(args: EraseArgs) -> Result<()> {
    // JSON goes to stdout on its own
    let quiet = args.silent || args.json;

    let mut link = connect(&args.target)?;
    let banks = choose_banks(&mut link, &args, quiet)?;

    if banks.is_empty() {
        println_if!(quiet, "Nothing to erase");
        return Ok(());
    }

    if args.test {
        println_if!(
            quiet,
            "{}",
            style("============== WARNING in test mode ===============").yellow().bold()
        );
    }

    let mut reports = Vec::with_capacity(banks.len());
    for bank in banks {
        // Cleared by the Ctrl+C handler
        if !args.cancel_flag.load(Ordering::SeqCst) {
            return Err(Error::Cancelled)
                .with_context(|| format!("Bank {} was not erased", bank));
        }

        println_if!(quiet, "\n{} {}", style("Bank").bold(), bank);

        let result = if args.test {
            EraseResult::simulated()
        } else {
            erase_bank(&mut link, &args, bank, quiet)?
        };

        for (key, stats) in &result.disk_stats {
            println_if!(quiet, "{}", display::format_drive_stats(key, stats));
        }

        if args.config.condition {
            let info = DirInfo::from_reply(&link.send_query("dir_info?")?)?;
            print_condition_summary(bank, &info, &result, quiet);
        } else {
            println_if!(
                quiet,
                "  {} Bank {} erased in {:.1}s",
                style("✓").green(),
                bank,
                result.duration.as_secs_f64()
            );
        }

        reports.push(json!({ "bank": bank, "result": result }));
    }

    if args.json {
        let output =
            serde_json::to_string_pretty(&reports).context("Failed to serialize erase results")?;
        println!("{}", output);
    }

    Ok(())
}

/// Show each mounted pack and ask which ones to erase
fn choose_banks(link: &mut DeviceLink, args: &EraseArgs, quiet: bool) -> Result<Vec<BankId>> {
    let controller = BankController::new();
    let mounted = controller
        .mounted_banks(link)
        .context("Failed to list mounted banks")?;

    if mounted.is_empty() {
        println_if!(quiet, "Nothing mounted");
        return Ok(Vec::new());
    }

    let mut chosen = Vec::new();
    for pack in mounted {
        let listing = read_directory(link, &controller, pack.bank)
            .with_context(|| format!("Failed to read the directory of bank {}", pack.bank))?;

        println_if!(quiet);
        for line in display::directory_report(&pack.vsn, &listing, args.gigabyte) {
            println_if!(quiet, "{}", line);
        }
        println_if!(quiet);

        let confirmed = args.skip_confirm
            || Confirm::new()
                .with_prompt(format!(
                    "Are you sure that you want to erase {} in bank {}?",
                    pack.vsn, pack.bank
                ))
                .default(false)
                .interact()?;
        if confirmed {
            chosen.push(pack.bank);
        }
    }

    Ok(chosen)
}

fn erase_bank(
    link: &mut DeviceLink,
    args: &EraseArgs,
    bank: BankId,
    quiet: bool,
) -> Result<EraseResult> {
    let pb = create_progress_bar(&args.config, bank, quiet)?;

    let pb_clone = pb.clone();
    let gigabyte = args.gigabyte;
    let controller = EraseController::with_config(args.config.clone())
        .on_progress(move |progress| update_progress_bar(&pb_clone, progress, gigabyte));

    // Connect cancel flag for the duration of this run only
    let done = Arc::new(AtomicBool::new(false));
    let bridge = spawn_cancel_bridge(
        Arc::clone(&args.cancel_flag),
        controller.cancel_handle(),
        Arc::clone(&done),
    );

    let result = controller.run(link, bank);
    done.store(true, Ordering::SeqCst);
    let _ = bridge.join();
    pb.finish_and_clear();

    result.with_context(|| format!("Erasing bank {} failed", bank))
}

/// Forward a cleared `running` flag into `erase_cancel` until `done` is set
fn spawn_cancel_bridge(
    running: Arc<AtomicBool>,
    erase_cancel: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while !done.load(Ordering::SeqCst) {
            if !running.load(Ordering::SeqCst) {
                erase_cancel.store(true, Ordering::SeqCst);
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    })
}

fn create_progress_bar(config: &EraseConfig, bank: BankId, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let pb = if config.condition && config.sample_progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{bar:40.cyan/blue}] {msg}")?
                .progress_chars("█▓░"),
        );
        pb
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("  {spinner:.green} {msg}")?);
        pb
    };

    let action = if config.condition {
        "Conditioning"
    } else {
        "Erasing"
    };
    pb.set_message(format!("{} bank {}...", action, bank));
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn update_progress_bar(pb: &ProgressBar, progress: &ConditionProgress, gigabyte: bool) {
    pb.set_length(progress.pack_size);
    pb.set_position(progress.bytes_to_go.min(progress.pack_size));

    let rate = progress
        .data_rate
        .map(|r| format!(" at {:.0} Mbps", display::to_mbps(r)))
        .unwrap_or_default();
    pb.set_message(format!(
        "Bank {} {} cycle progress: {} to go ({:.0}%){}",
        progress.bank,
        progress.pass,
        display::format_progress_bytes(progress.bytes_to_go, gigabyte),
        progress.percentage(),
        rate
    ));
}

fn print_condition_summary(bank: BankId, info: &DirInfo, result: &EraseResult, quiet: bool) {
    let secs = result.duration.as_secs_f64();
    println_if!(
        quiet,
        "Conditioning {} in Bank {} took {:.0} secs ie. {:.1} mins",
        display::format_pack_size(info.pack_size),
        bank,
        secs,
        secs / 60.0
    );

    if let (Some(min), Some(max)) = (result.min_data_rate, result.max_data_rate) {
        println_if!(
            quiet,
            "Minimum data rate {:.0} Mbps, maximum data rate {:.0} Mbps",
            display::to_mbps(min),
            display::to_mbps(max)
        );
    }
}
