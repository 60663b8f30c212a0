//! Status and configuration display.

use std::path::Path;
use std::time::Duration;

use crate::config::Config;
use crate::state::MonitorSummary;

use super::colors::*;

/// Print the cpupulse header banner.
pub fn print_header() {
    println!("{CYAN}{BOLD}cpupulse v{}{RESET}", env!("CARGO_PKG_VERSION"));
    println!();
}

/// Format an interval as minutes when it divides evenly, seconds otherwise.
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else {
        format!("{} s", secs)
    }
}

/// Print a Config as TOML.
pub fn print_config(config: &Config, path: Option<&Path>) {
    if let Some(path) = path {
        println!("{GRAY}# {}{RESET}", path.display());
        if !path.exists() {
            println!("{YELLOW}# (file does not exist, using defaults){RESET}");
        }
        println!();
    }
    println!("{CYAN}process_name{RESET} = \"{}\"", config.process_name);
    println!("{CYAN}interval_secs{RESET} = {}", config.interval_secs);
    println!("{CYAN}autostart{RESET} = {}", config.autostart);
}

/// Print whether the target is running and whether autostart is set up.
pub fn print_status(config: &Config, target_running: bool, autostart_registered: bool) {
    let running = if target_running {
        format!("{GREEN}running{RESET}")
    } else {
        format!("{GRAY}not running{RESET}")
    };
    let autostart = match (config.autostart, autostart_registered) {
        (true, true) => format!("{GREEN}enabled{RESET}"),
        (false, false) => "disabled".to_string(),
        (true, false) => format!("{YELLOW}enabled in config, not registered{RESET}"),
        (false, true) => format!("{YELLOW}registered, disabled in config{RESET}"),
    };

    println!("{BLUE}Target:{RESET}    {} ({})", config.process_name, running);
    println!("{BLUE}Interval:{RESET}  {}", format_interval(config.interval()));
    println!("{BLUE}Autostart:{RESET} {}", autostart);
}

/// Print the line shown when monitoring begins.
pub fn print_monitor_started(config: &Config, log_path: &Path) {
    println!(
        "Watching {BOLD}{}{RESET} every {}. Press Ctrl+C to stop.",
        config.process_name,
        format_interval(config.interval())
    );
    println!("{GRAY}Log: {}{RESET}", log_path.display());
}

/// Print totals after monitoring stops.
pub fn print_summary(summary: &MonitorSummary) {
    println!();
    println!(
        "Stopped after {} cycle{}: {} mitigated, {} skipped, {} failed",
        summary.cycles,
        if summary.cycles == 1 { "" } else { "s" },
        summary.mitigated,
        summary.skipped,
        summary.failed
    );
}
