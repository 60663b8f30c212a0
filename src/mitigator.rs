//! Temporary affinity narrowing.
//!
//! A mitigation removes one execution unit from a process's affinity set,
//! holds the narrowed set for a dwell period, then puts the original set
//! back. A process with a single eligible unit is left alone.

use std::time::Duration;

use crate::error::MitigationError;
use crate::process::{AffinitySet, ProcessHandle};
use crate::signal::ShutdownToken;

/// How long the narrowed set is held before restoring.
pub const DEFAULT_DWELL: Duration = Duration::from_secs(2);

/// Longest a process is kept narrowed.
pub const MAX_DWELL: Duration = Duration::from_secs(60);

/// Which unit to drop from the set.
///
/// `Last` drops the highest-ordered unit. There is no tuning behind this
/// choice; `First` exists so it can be changed without touching the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropPolicy {
    #[default]
    Last,
    First,
}

impl DropPolicy {
    fn index(&self, set: &AffinitySet) -> usize {
        match self {
            DropPolicy::Last => set.len().saturating_sub(1),
            DropPolicy::First => 0,
        }
    }
}

/// What a successful `mitigate` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MitigationOutcome {
    /// Fewer than two units were eligible; nothing was changed.
    Skipped { units: usize },
    /// The set was narrowed and then restored.
    Restored {
        original: AffinitySet,
        narrowed: AffinitySet,
    },
}

#[derive(Debug, Clone)]
pub struct AffinityMitigator {
    dwell: Duration,
    policy: DropPolicy,
}

impl AffinityMitigator {
    pub fn new() -> Self {
        Self {
            dwell: DEFAULT_DWELL,
            policy: DropPolicy::default(),
        }
    }

    /// Sets the dwell, capped at `MAX_DWELL`.
    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell.min(MAX_DWELL);
        self
    }

    pub fn with_policy(mut self, policy: DropPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    pub fn policy(&self) -> DropPolicy {
        self.policy
    }

    /// Narrows `handle`'s affinity by one unit, holds, then restores it.
    ///
    /// The dwell is cut short when `shutdown` is cancelled, but the restore
    /// step always runs once the narrowed set has been applied.
    ///
    /// # Errors
    ///
    /// - Reading or narrowing fails: the process is untouched (or gone).
    /// - Restoring fails: `MitigationError::RestoreFailed`; the process may
    ///   be left on the narrowed set.
    pub fn mitigate<H>(
        &self,
        handle: &H,
        shutdown: &ShutdownToken,
    ) -> Result<MitigationOutcome, MitigationError>
    where
        H: ProcessHandle + ?Sized,
    {
        let original = handle.affinity()?;

        let Some(narrowed) = original.without_index(self.policy.index(&original)) else {
            log::debug!(
                "{} (pid {}) has {} eligible unit(s), skipping",
                handle.name(),
                handle.pid(),
                original.len()
            );
            return Ok(MitigationOutcome::Skipped {
                units: original.len(),
            });
        };

        handle.set_affinity(&narrowed)?;
        log::info!(
            "Affinity of {} (pid {}) set to {}",
            handle.name(),
            handle.pid(),
            narrowed
        );

        if !shutdown.sleep(self.dwell) {
            log::info!("Shutdown requested during dwell, restoring early");
        }

        handle
            .set_affinity(&original)
            .map_err(|e| MitigationError::RestoreFailed {
                pid: handle.pid(),
                original: original.clone(),
                source: Box::new(e),
            })?;
        log::info!(
            "Affinity of {} (pid {}) restored to {}",
            handle.name(),
            handle.pid(),
            original
        );

        Ok(MitigationOutcome::Restored { original, narrowed })
    }
}

impl Default for AffinityMitigator {
    fn default() -> Self {
        Self::new()
    }
}
