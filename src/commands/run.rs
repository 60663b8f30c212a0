//! Run command handler.
//!
//! Starts the monitor loop on a background thread and waits for Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigStore, FileConfigStore};
use crate::error::Result;
use crate::logging::log_file_path;
use crate::mitigator::{AffinityMitigator, DEFAULT_DWELL};
use crate::output::{print_error, print_info, print_monitor_started, print_summary};
use crate::process::SysinfoSource;
use crate::runner::MonitorLoop;
use crate::signal::ShutdownToken;

const MONITOR_THREAD_NAME: &str = "cpupulse-monitor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// How long the narrowed affinity is held.
    pub dwell: Duration,
    /// Run a single cycle and exit.
    pub once: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dwell: DEFAULT_DWELL,
            once: false,
        }
    }
}

/// Monitor the configured process until interrupted.
///
/// The loop runs on its own thread; this thread only waits for it. Ctrl+C
/// cancels the shared token, the loop restores any process it is holding
/// narrowed, and this returns `Ok(())`.
pub fn run_command(options: RunOptions) -> Result<()> {
    let store = Arc::new(FileConfigStore::new()?);
    let shutdown = ShutdownToken::install()?;

    print_monitor_started(&store.load(), &log_file_path());

    let mut monitor = MonitorLoop::new(SysinfoSource::new(), store)
        .with_mitigator(AffinityMitigator::new().with_dwell(options.dwell));

    if options.once {
        let report = monitor.run_cycle(&shutdown);
        print_info(&format!(
            "{} matched, {} mitigated, {} skipped, {} failed",
            report.matched, report.mitigated, report.skipped, report.failed
        ));
        return Ok(());
    }

    let loop_token = shutdown.clone();
    let worker = std::thread::Builder::new()
        .name(MONITOR_THREAD_NAME.to_string())
        .spawn(move || monitor.run(&loop_token))?;

    match worker.join() {
        Ok(summary) => print_summary(&summary),
        Err(_) => {
            log::error!("Monitor thread panicked");
            print_error("Monitor thread stopped unexpectedly; see the log for details");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_use_default_dwell() {
        let options = RunOptions::default();
        assert_eq!(options.dwell, Duration::from_secs(2));
        assert!(!options.once);
    }
}
