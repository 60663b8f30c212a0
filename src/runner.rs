use crate::config::{Config, ConfigStore};
use crate::error::MitigationError;
use crate::mitigator::{AffinityMitigator, MitigationOutcome};
use crate::process::{ProcessHandle, ProcessLocator, ProcessSource};
use crate::signal::ShutdownToken;
use crate::state::{CycleReport, MonitorState, MonitorSummary};
use std::sync::Arc;

// ============================================================================
// Monitor Loop
// ============================================================================

/// Periodically finds the configured process and pulses its affinity.
///
/// Configuration is re-read from the store at the start of every cycle, so
/// edits to the process name or interval apply without a restart. Matches
/// within a cycle are mitigated one after another, never concurrently.
pub struct MonitorLoop<S> {
    locator: ProcessLocator<S>,
    mitigator: AffinityMitigator,
    config: Arc<dyn ConfigStore>,
    state: MonitorState,
    last_config: Option<Config>,
}

impl<S: ProcessSource> MonitorLoop<S> {
    pub fn new(source: S, config: Arc<dyn ConfigStore>) -> Self {
        Self {
            locator: ProcessLocator::new(source),
            mitigator: AffinityMitigator::new(),
            config,
            state: MonitorState::Idle,
            last_config: None,
        }
    }

    pub fn with_mitigator(mut self, mitigator: AffinityMitigator) -> Self {
        self.mitigator = mitigator;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Runs cycles until `shutdown` is cancelled.
    ///
    /// Never returns early on a per-process failure; those are logged and
    /// the loop moves on. A mitigation in flight when `shutdown` fires is
    /// still restored before this returns.
    pub fn run(mut self, shutdown: &ShutdownToken) -> MonitorSummary {
        let mut summary = MonitorSummary::default();
        log::info!("Monitor started");

        while !shutdown.is_cancelled() {
            let config = self.refresh_config();
            let report = self.scan(&config, shutdown);
            summary.record(&report);

            if shutdown.is_cancelled() {
                break;
            }
            if !shutdown.sleep(config.interval()) {
                break;
            }
            self.transition_to(MonitorState::Idle);
        }

        self.transition_to(MonitorState::Stopped);
        log::info!(
            "Monitor stopped after {} cycle(s): {} mitigated, {} skipped, {} failed",
            summary.cycles,
            summary.mitigated,
            summary.skipped,
            summary.failed
        );
        summary
    }

    /// Runs a single cycle with the current configuration.
    pub fn run_cycle(&mut self, shutdown: &ShutdownToken) -> CycleReport {
        let config = self.refresh_config();
        let report = self.scan(&config, shutdown);
        self.transition_to(MonitorState::Idle);
        report
    }

    /// Whether the configured target is running right now.
    ///
    /// Used for status display only; the cycle does its own lookup.
    pub fn is_target_running(&mut self) -> bool {
        let config = self.config.load();
        self.locator.is_running(&config.process_name)
    }

    fn refresh_config(&mut self) -> Config {
        let config = self.config.load();

        match &self.last_config {
            None => log::info!(
                "Watching for {} every {}s",
                config.process_name,
                config.interval().as_secs()
            ),
            Some(previous) => {
                if previous.process_name != config.process_name {
                    log::info!(
                        "Target changed from {} to {}",
                        previous.process_name,
                        config.process_name
                    );
                }
                if previous.interval() != config.interval() {
                    log::info!(
                        "Interval changed from {}s to {}s",
                        previous.interval().as_secs(),
                        config.interval().as_secs()
                    );
                }
            }
        }

        self.last_config = Some(config.clone());
        config
    }

    fn scan(&mut self, config: &Config, shutdown: &ShutdownToken) -> CycleReport {
        let mut report = CycleReport::default();
        self.transition_to(MonitorState::Scanning);

        for handle in self.locator.find(&config.process_name) {
            if shutdown.is_cancelled() {
                break;
            }
            report.matched += 1;

            self.transition_to(MonitorState::Mitigating);
            match self.mitigator.mitigate(&handle, shutdown) {
                Ok(MitigationOutcome::Restored { .. }) => report.mitigated += 1,
                Ok(MitigationOutcome::Skipped { .. }) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    log_failure(&handle, &e);
                }
            }
            self.transition_to(MonitorState::Scanning);
        }

        if report.matched == 0 {
            log::debug!("{} is not running", config.process_name);
        }
        self.transition_to(MonitorState::Sleeping);
        report
    }

    fn transition_to(&mut self, next: MonitorState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        log::trace!("Monitor {} -> {}", self.state, next);
        self.state = next;
    }
}

fn log_failure<H: ProcessHandle>(handle: &H, error: &MitigationError) {
    match error {
        MitigationError::RestoreFailed { original, .. } => log::error!(
            "{} (pid {}) may be left with a narrowed affinity set (wanted {}): {}",
            handle.name(),
            handle.pid(),
            original,
            error
        ),
        _ => log::error!(
            "Error setting affinity on {} (pid {}): {}",
            handle.name(),
            handle.pid(),
            error
        ),
    }
}
