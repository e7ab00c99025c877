//! mk5erase - Erase and condition the disk packs mounted in a Mark5 recorder
//!
//! # Usage
//!
//! ```bash
//! # Show what is on the mounted packs
//! mk5erase -a mark5fx list
//!
//! # Erase, asking for confirmation per pack
//! mk5erase -a mark5fx erase
//!
//! # Condition while erasing, reporting progress every 5 minutes
//! mk5erase -a mark5fx erase --condition --progress -t 300
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use console::style;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use mk5erase_core::Settings;

mod commands;
mod display;

/// mk5erase - Erase and condition the disk packs mounted in a Mark5 recorder
#[derive(Parser)]
#[command(name = "mk5erase")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Suppress ALL output (implies --quiet and --yes)
    #[arg(long, global = true)]
    silent: bool,

    /// Recorder IP address or host name [default: localhost]
    #[arg(short, long, global = true)]
    address: Option<String>,

    /// Recorder control port [default: 2620]
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, env = "MK5ERASE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Erase the mounted disk packs, optionally conditioning them
    Erase {
        /// Run a read/write conditioning cycle while erasing
        #[arg(short, long)]
        condition: bool,

        /// Report conditioning progress
        #[arg(short = 'd', long)]
        progress: bool,

        /// Seconds between progress reports
        #[arg(short = 't', long, value_name = "SECS")]
        progress_interval: Option<u64>,

        /// Show byte counts in GB (10^9 bytes)
        #[arg(short, long)]
        gigabyte: bool,

        /// Skip confirmation prompts (use with caution!)
        #[arg(short = 'y', long)]
        yes: bool,

        /// Output results in JSON format
        #[arg(long)]
        json: bool,

        /// Report a fixed synthetic result instead of erasing
        #[arg(long, hide = true)]
        test: bool,
    },

    /// Show the directory of every mounted disk pack
    List {
        /// Show byte counts in GB (10^9 bytes)
        #[arg(short, long)]
        gigabyte: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show or create the configuration file
    Config {
        /// Create a configuration file with default values
        #[arg(long)]
        init: bool,

        /// Print the configuration file path
        #[arg(long)]
        path: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    // Set up panic handler for nicer error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{} {}", style("Error:").red().bold(), panic_info);
    }));

    if let Err(e) = run() {
        eprintln!("{} {}", style("Error:").red().bold(), e);

        // Show cause chain in verbose mode
        if std::env::var("RUST_BACKTRACE").is_ok() {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  {} {}", style("Caused by:").yellow(), cause);
                source = cause.source();
            }
        } else if let Some(cause) = e.source() {
            eprintln!("  {} {}", style("Caused by:").yellow(), cause);
        }

        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    // --silent implies --quiet (no logs at all, not even errors to tracing)
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet || cli.silent {
        EnvFilter::new("off")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let silent = cli.silent;
    let config_path = cli.config.clone().or_else(Settings::config_path);
    let settings = Settings::load_from_path(config_path);

    let target = commands::Target {
        address: cli.address.unwrap_or(settings.device.address.clone()),
        port: cli.port.unwrap_or(settings.device.port),
    };

    match cli.command {
        Commands::Erase {
            condition,
            progress,
            progress_interval,
            gigabyte,
            yes,
            json,
            test,
        } => {
            let mut config = settings.erase.erase_config();
            config.condition |= condition;
            config.sample_progress |= progress;
            if let Some(secs) = progress_interval {
                config.sample_interval = Duration::from_secs(secs);
            }

            let running = install_interrupt_handler(silent)?;

            commands::erase::execute(commands::erase::EraseArgs {
                target,
                config,
                gigabyte: gigabyte || settings.display.gigabyte,
                skip_confirm: yes || silent, // --silent implies --yes
                json,
                test,
                cancel_flag: running,
                silent,
            })
        }
        Commands::List { gigabyte, json } => commands::list::execute(
            &target,
            gigabyte || settings.display.gigabyte,
            json,
            silent,
        ),
        Commands::Config { init, path, json } => {
            commands::config::execute(commands::config::ConfigArgs {
                init,
                path,
                json,
                silent,
                config_file: cli.config,
            })
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Ctrl+C handler for erasing: the first press stops the run, the second exits
///
/// Returns the `running` flag, cleared on the first press.
fn install_interrupt_handler(silent: bool) -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        if !r.load(Ordering::SeqCst) {
            // Second Ctrl+C, force exit
            if !silent {
                eprintln!("\n{}", style("Forced exit").red().bold());
            }
            std::process::exit(130);
        }
        r.store(false, Ordering::SeqCst);
        if !silent {
            eprintln!(
                "\n{}",
                style("Stopping before the next recorder command... Press Ctrl+C again to force exit")
                    .yellow()
            );
        }
    })?;
    Ok(running)
}
