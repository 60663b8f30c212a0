use std::fmt;

/// Where the monitor loop currently is.
///
/// ```text
/// Idle -> Scanning -> (Mitigating -> Scanning)* -> Sleeping -> Idle
/// any  -> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Scanning,
    Mitigating,
    Sleeping,
    Stopped,
}

impl MonitorState {
    pub fn can_transition_to(&self, next: MonitorState) -> bool {
        use MonitorState::*;
        match (self, next) {
            (Stopped, _) => false,
            (_, Stopped) => true,
            (Idle, Scanning)
            | (Scanning, Mitigating)
            | (Mitigating, Scanning)
            | (Scanning, Sleeping)
            | (Sleeping, Idle) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MonitorState::Stopped)
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Idle => "idle",
            MonitorState::Scanning => "scanning",
            MonitorState::Mitigating => "mitigating",
            MonitorState::Sleeping => "sleeping",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Result of one locate-then-mitigate pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Processes found with the configured name.
    pub matched: usize,
    /// Processes narrowed and restored.
    pub mitigated: usize,
    /// Processes left alone because they had a single eligible unit.
    pub skipped: usize,
    /// Processes whose mitigation failed.
    pub failed: usize,
}

/// Totals over the lifetime of a monitor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorSummary {
    pub cycles: usize,
    pub mitigated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl MonitorSummary {
    pub fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.mitigated += report.mitigated;
        self.skipped += report.skipped;
        self.failed += report.failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MonitorState::*;

    #[test]
    fn test_normal_cycle_transitions_are_valid() {
        let path = [Idle, Scanning, Mitigating, Scanning, Sleeping, Idle, Scanning];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be allowed",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_any_state_can_stop() {
        for state in [Idle, Scanning, Mitigating, Sleeping] {
            assert!(state.can_transition_to(Stopped));
        }
    }

    #[test]
    fn test_stopped_is_terminal() {
        assert!(Stopped.is_terminal());
        for next in [Idle, Scanning, Mitigating, Sleeping, Stopped] {
            assert!(!Stopped.can_transition_to(next));
        }
    }

    #[test]
    fn test_shortcuts_are_rejected() {
        assert!(!Idle.can_transition_to(Mitigating));
        assert!(!Idle.can_transition_to(Sleeping));
        assert!(!Mitigating.can_transition_to(Sleeping));
        assert!(!Sleeping.can_transition_to(Scanning));
    }

    #[test]
    fn test_summary_accumulates_reports() {
        let mut summary = MonitorSummary::default();
        summary.record(&CycleReport {
            matched: 2,
            mitigated: 1,
            skipped: 0,
            failed: 1,
        });
        summary.record(&CycleReport::default());

        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.mitigated, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(Mitigating.to_string(), "mitigating");
    }
}
