//! Finding processes by image name using sysinfo.

use std::ffi::OsStr;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use super::handle::{OsProcess, ProcessHandle};
use crate::error::EnumerationError;

/// Something that can list the processes currently running.
///
/// Each entry is either a usable handle or an error describing an entry
/// that could not be read. The locator skips errors.
pub trait ProcessSource {
    type Handle: ProcessHandle;

    fn enumerate(&mut self) -> Vec<Result<Self::Handle, EnumerationError>>;
}

/// Process source backed by a `sysinfo::System` snapshot.
///
/// The `System` is kept between scans so repeated refreshes only pay for
/// processes that are new since the last one.
pub struct SysinfoSource {
    system: System,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoSource {
    type Handle = OsProcess;

    fn enumerate(&mut self) -> Vec<Result<OsProcess, EnumerationError>> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true, // drop processes that have exited
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::OnlyIfNotSet),
        );

        self.system
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| {
                let pid = pid.as_u32();
                let name = process.name().to_string_lossy();
                if name.is_empty() {
                    return Err(EnumerationError::Unnamed { pid });
                }

                let mut handle = OsProcess::new(pid, name.into_owned());
                if let Some(alias) = process.cmd().first().and_then(|arg0| image_name(arg0)) {
                    handle = handle.with_alias(alias);
                }
                Ok(handle)
            })
            .collect()
    }
}

/// File name component of an argv[0], accepting both `/` and `\` separators.
fn image_name(arg0: &OsStr) -> Option<String> {
    let arg0 = arg0.to_string_lossy();
    let name = arg0.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Looks up running processes by name.
pub struct ProcessLocator<S> {
    source: S,
}

impl<S: ProcessSource> ProcessLocator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns every running process whose image name is exactly `name`.
    ///
    /// The iterator is lazy over a single snapshot; call `find` again to
    /// observe processes started since.
    pub fn find(&mut self, name: &str) -> impl Iterator<Item = S::Handle> {
        let name = name.to_string();
        self.source
            .enumerate()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::debug!("Skipping process entry: {}", e);
                    None
                }
            })
            .filter(move |handle| handle.matches_name(&name))
    }

    /// Whether at least one process named `name` is running right now.
    pub fn is_running(&mut self, name: &str) -> bool {
        self.find(name).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeProcess, FakeSource};

    #[test]
    fn test_find_returns_all_exact_matches() {
        let source = FakeSource::new(vec![
            Ok(FakeProcess::new(1, "game.exe", &[0, 1])),
            Ok(FakeProcess::new(2, "other", &[0, 1])),
            Ok(FakeProcess::new(3, "game.exe", &[0, 1])),
        ]);
        let mut locator = ProcessLocator::new(source);

        let pids: Vec<u32> = locator.find("game.exe").map(|p| p.pid()).collect();
        assert_eq!(pids, vec![1, 3]);
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let source = FakeSource::new(vec![Ok(FakeProcess::new(1, "Game.exe", &[0]))]);
        let mut locator = ProcessLocator::new(source);

        assert_eq!(locator.find("game.exe").count(), 0);
        assert_eq!(locator.find("Game.exe").count(), 1);
    }

    #[test]
    fn test_find_skips_unreadable_entries() {
        let source = FakeSource::new(vec![
            Err(EnumerationError::Unnamed { pid: 4 }),
            Ok(FakeProcess::new(5, "game.exe", &[0, 1])),
            Err(EnumerationError::Unnamed { pid: 6 }),
        ]);
        let mut locator = ProcessLocator::new(source);

        let pids: Vec<u32> = locator.find("game.exe").map(|p| p.pid()).collect();
        assert_eq!(pids, vec![5]);
    }

    #[test]
    fn test_find_with_no_matches_is_empty() {
        let mut locator = ProcessLocator::new(FakeSource::new(vec![]));
        assert_eq!(locator.find("game.exe").count(), 0);
        assert!(!locator.is_running("game.exe"));
    }

    #[test]
    fn test_is_running_true_when_present() {
        let source = FakeSource::new(vec![Ok(FakeProcess::new(1, "game.exe", &[0]))]);
        let mut locator = ProcessLocator::new(source);
        assert!(locator.is_running("game.exe"));
    }

    #[test]
    fn test_image_name_handles_both_separators() {
        assert_eq!(
            image_name(OsStr::new("C:\\Games\\R6\\Game.exe")).as_deref(),
            Some("Game.exe")
        );
        assert_eq!(image_name(OsStr::new("/usr/bin/game")).as_deref(), Some("game"));
        assert_eq!(image_name(OsStr::new("game")).as_deref(), Some("game"));
        assert_eq!(image_name(OsStr::new("/usr/bin/")), None);
    }

    #[test]
    fn test_sysinfo_source_finds_current_process() {
        let mut source = SysinfoSource::new();
        let me = std::process::id();

        let found = source
            .enumerate()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .any(|p| p.pid() == me);
        assert!(found, "current process should be listed");
    }

    #[test]
    fn test_sysinfo_locator_misses_unknown_name() {
        let mut locator = ProcessLocator::new(SysinfoSource::new());
        assert!(!locator.is_running("definitely-not-a-real-process-name.exe"));
    }
}
