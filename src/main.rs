//! cpupulse CLI entry point.
//!
//! Parses command-line arguments and dispatches to the appropriate command handler.

use cpupulse::commands::{
    config_display_command, config_reset_command, config_set_command, run_command,
    status_command, ConfigSubcommand, RunOptions,
};
use cpupulse::logging;
use cpupulse::output::print_error;
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cpupulse")]
#[command(
    version,
    about = "Periodically pulse the CPU affinity of a running process",
    after_help = "EXAMPLES:
    # Start monitoring with the saved configuration (same as `cpupulse run`)
    cpupulse

    # Check whether the target is running
    cpupulse status

    # Change the target and interval
    cpupulse config set process_name RainbowSix_DX11.exe
    cpupulse config set interval_secs 300

    # Start at logon
    cpupulse config set autostart true"
)]
struct Cli {
    /// Mirror log output to stderr at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor the target process until interrupted
    #[command(after_help = "BEHAVIOR:
    Every interval, each process whose image name matches process_name has
    one CPU removed from its affinity set for the dwell time, then restored.
    Processes allowed on a single CPU are left alone.
    Configuration is re-read every cycle, so `config set` applies live.")]
    Run {
        /// Seconds to hold the narrowed affinity before restoring (at most 60)
        #[arg(long, default_value_t = 2)]
        dwell: u64,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Show whether the target is running and whether autostart is set up
    Status,

    /// View, modify, or reset configuration values
    #[command(after_help = "CONFIG FILE:
    ~/.config/cpupulse/config.toml

    If the file is missing or unreadable, defaults are used.")]
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = match &cli.command {
        None => run_command(RunOptions::default()),
        Some(Commands::Run { dwell, once }) => run_command(RunOptions {
            dwell: Duration::from_secs(*dwell),
            once: *once,
        }),
        Some(Commands::Status) => status_command(),
        Some(Commands::Config { subcommand }) => match subcommand {
            None => config_display_command(),
            Some(ConfigSubcommand::Set { key, value }) => config_set_command(key, value),
            Some(ConfigSubcommand::Reset) => config_reset_command(),
        },
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
