//! Test utilities shared across modules.
//!
//! Provides in-memory process fakes so the locator, mitigator and monitor
//! loop can be exercised without touching real processes.

use std::sync::{Arc, Mutex};

use crate::error::{EnumerationError, MitigationError};
use crate::process::{AffinitySet, ProcessHandle, ProcessSource};

#[derive(Debug)]
struct FakeState {
    current: AffinitySet,
    history: Vec<AffinitySet>,
    /// Number of successful `set_affinity` calls before the process "exits".
    exit_after_sets: Option<usize>,
    access_denied: bool,
    exited: bool,
}

/// A fake process handle that records every affinity change.
///
/// Clones share state, so a test can keep one copy while another is handed
/// to the code under test.
#[derive(Debug, Clone)]
pub struct FakeProcess {
    pid: u32,
    name: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcess {
    pub fn new(pid: u32, name: &str, units: &[usize]) -> Self {
        Self {
            pid,
            name: name.to_string(),
            state: Arc::new(Mutex::new(FakeState {
                current: AffinitySet::from(units.to_vec()),
                history: Vec::new(),
                exit_after_sets: None,
                access_denied: false,
                exited: false,
            })),
        }
    }

    /// The process exits once `n` affinity writes have succeeded.
    pub fn exit_after_sets(self, n: usize) -> Self {
        self.state.lock().unwrap().exit_after_sets = Some(n);
        self
    }

    /// Every affinity call is rejected with `AccessDenied`.
    pub fn deny_access(self) -> Self {
        self.state.lock().unwrap().access_denied = true;
        self
    }

    pub fn current(&self) -> AffinitySet {
        self.state.lock().unwrap().current.clone()
    }

    /// Every set successfully applied, in order.
    pub fn history(&self) -> Vec<AffinitySet> {
        self.state.lock().unwrap().history.clone()
    }

    pub fn has_exited(&self) -> bool {
        self.state.lock().unwrap().exited
    }

    fn check(&self, state: &FakeState) -> Result<(), MitigationError> {
        if state.exited {
            return Err(MitigationError::ProcessExited { pid: self.pid });
        }
        if state.access_denied {
            return Err(MitigationError::AccessDenied { pid: self.pid });
        }
        Ok(())
    }
}

impl ProcessHandle for FakeProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn affinity(&self) -> Result<AffinitySet, MitigationError> {
        let state = self.state.lock().unwrap();
        self.check(&state)?;
        Ok(state.current.clone())
    }

    fn set_affinity(&self, set: &AffinitySet) -> Result<(), MitigationError> {
        let mut state = self.state.lock().unwrap();
        if state.exit_after_sets == Some(state.history.len()) {
            state.exited = true;
        }
        self.check(&state)?;
        state.current = set.clone();
        state.history.push(set.clone());
        Ok(())
    }
}

/// A process source returning a fixed list of entries on every scan.
#[derive(Debug, Clone)]
pub struct FakeSource {
    entries: Arc<Mutex<Vec<Result<FakeProcess, EnumerationError>>>>,
    scans: Arc<Mutex<usize>>,
}

impl FakeSource {
    pub fn new(entries: Vec<Result<FakeProcess, EnumerationError>>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            scans: Arc::new(Mutex::new(0)),
        }
    }

    /// Replace the process list seen by subsequent scans.
    pub fn set_entries(&self, entries: Vec<Result<FakeProcess, EnumerationError>>) {
        *self.entries.lock().unwrap() = entries;
    }

    pub fn scans(&self) -> usize {
        *self.scans.lock().unwrap()
    }
}

impl ProcessSource for FakeSource {
    type Handle = FakeProcess;

    fn enumerate(&mut self) -> Vec<Result<FakeProcess, EnumerationError>> {
        *self.scans.lock().unwrap() += 1;
        self.entries.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_process_records_history() {
        let fake = FakeProcess::new(1, "p", &[0, 1]);
        fake.set_affinity(&AffinitySet::from(vec![0])).unwrap();

        assert_eq!(fake.current().units(), &[0]);
        assert_eq!(fake.history().len(), 1);
    }

    #[test]
    fn test_fake_process_exits_after_configured_sets() {
        let fake = FakeProcess::new(1, "p", &[0, 1]).exit_after_sets(1);
        fake.set_affinity(&AffinitySet::from(vec![0])).unwrap();

        let err = fake.set_affinity(&AffinitySet::from(vec![0, 1])).unwrap_err();
        assert!(err.is_process_exited());
        assert!(fake.has_exited());
        assert_eq!(fake.current().units(), &[0]);
    }

    #[test]
    fn test_fake_source_counts_scans() {
        let mut source = FakeSource::new(vec![]);
        let observer = source.clone();
        source.enumerate();
        source.enumerate();
        assert_eq!(observer.scans(), 2);
    }
}
