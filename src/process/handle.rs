//! Process handles and affinity sets.

use std::fmt;

use super::affinity;
use crate::error::MitigationError;

/// The execution units a process may be scheduled on, in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AffinitySet {
    units: Vec<usize>,
}

impl AffinitySet {
    pub fn new(units: Vec<usize>) -> Self {
        Self { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[usize] {
        &self.units
    }

    pub fn contains(&self, unit: usize) -> bool {
        self.units.contains(&unit)
    }

    /// Returns a copy of this set with the unit at `index` removed.
    ///
    /// Returns `None` if `index` is out of range or removing it would leave
    /// the set empty.
    pub fn without_index(&self, index: usize) -> Option<AffinitySet> {
        if index >= self.units.len() || self.units.len() < 2 {
            return None;
        }
        let mut units = self.units.clone();
        units.remove(index);
        Some(AffinitySet { units })
    }
}

impl From<Vec<usize>> for AffinitySet {
    fn from(units: Vec<usize>) -> Self {
        Self::new(units)
    }
}

impl FromIterator<usize> for AffinitySet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for AffinitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.units)
    }
}

/// A live OS process whose affinity can be queried and replaced.
///
/// Handles are only valid for the cycle that produced them; the monitor
/// re-acquires them on every scan.
pub trait ProcessHandle {
    fn pid(&self) -> u32;

    fn name(&self) -> &str;

    /// Exact, case-sensitive comparison against the process's image name.
    fn matches_name(&self, name: &str) -> bool {
        self.name() == name
    }

    fn affinity(&self) -> Result<AffinitySet, MitigationError>;

    fn set_affinity(&self, set: &AffinitySet) -> Result<(), MitigationError>;
}

/// Handle to a real OS process, backed by the platform affinity calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsProcess {
    pid: u32,
    name: String,
    /// Other names the image is known by, e.g. the file name of argv[0].
    aliases: Vec<String>,
}

impl OsProcess {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        if alias != self.name && !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
        self
    }
}

impl ProcessHandle for OsProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }

    fn affinity(&self) -> Result<AffinitySet, MitigationError> {
        affinity::get_affinity(self.pid)
            .map(AffinitySet::new)
            .map_err(|e| MitigationError::from_io(self.pid, e))
    }

    fn set_affinity(&self, set: &AffinitySet) -> Result<(), MitigationError> {
        affinity::set_affinity(self.pid, set.units())
            .map_err(|e| MitigationError::from_io(self.pid, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_index_drops_exactly_one_unit() {
        let set = AffinitySet::from(vec![0, 1, 2, 3]);
        let narrowed = set.without_index(3).unwrap();

        assert_eq!(narrowed.units(), &[0, 1, 2]);
        assert_eq!(set.len(), 4, "original must be untouched");
    }

    #[test]
    fn test_without_index_refuses_to_empty_the_set() {
        let set = AffinitySet::from(vec![5]);
        assert!(set.without_index(0).is_none());
        assert!(AffinitySet::default().without_index(0).is_none());
    }

    #[test]
    fn test_without_index_out_of_range() {
        let set = AffinitySet::from(vec![0, 1]);
        assert!(set.without_index(2).is_none());
    }

    #[test]
    fn test_display_lists_units() {
        let set: AffinitySet = [0, 2, 4].into_iter().collect();
        assert_eq!(set.to_string(), "[0, 2, 4]");
        assert!(set.contains(2));
        assert!(!set.contains(1));
    }

    #[test]
    fn test_os_process_matches_name_or_alias_exactly() {
        let proc = OsProcess::new(10, "wine64-preload").with_alias("Game.exe");

        assert!(proc.matches_name("wine64-preload"));
        assert!(proc.matches_name("Game.exe"));
        assert!(!proc.matches_name("game.exe"));
        assert!(!proc.matches_name("Game"));
    }

    #[test]
    fn test_with_alias_ignores_duplicates() {
        let proc = OsProcess::new(1, "a").with_alias("a").with_alias("b").with_alias("b");
        assert_eq!(proc.aliases, vec!["b".to_string()]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_os_process_reads_own_affinity() {
        let me = OsProcess::new(std::process::id(), "self");
        let set = me.affinity().unwrap();
        assert!(!set.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_os_process_nonexistent_pid_reports_exited() {
        // Above the kernel's pid_max ceiling, so it can never be live
        let ghost = OsProcess::new(i32::MAX as u32 - 1, "ghost");
        let err = ghost.affinity().unwrap_err();
        assert!(err.is_process_exited(), "unexpected error: {err}");
    }
}
