use std::io;
use thiserror::Error;

use crate::process::AffinitySet;

/// A single process entry that could not be read during a scan.
///
/// These never abort a scan; the locator skips the entry and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumerationError {
    #[error("process {pid} has no readable name")]
    Unnamed { pid: u32 },
}

/// Failure while narrowing or restoring a process's affinity set.
#[derive(Error, Debug)]
pub enum MitigationError {
    #[error("process {pid} exited")]
    ProcessExited { pid: u32 },

    #[error("access denied to process {pid}")]
    AccessDenied { pid: u32 },

    #[error("OS error on process {pid}: {source}")]
    Os {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("affinity control is not supported on this platform")]
    Unsupported,

    #[error("failed to restore affinity {original} on process {pid}: {source}")]
    RestoreFailed {
        pid: u32,
        original: AffinitySet,
        #[source]
        source: Box<MitigationError>,
    },
}

impl MitigationError {
    /// Classify a raw OS error returned while touching `pid`.
    pub fn from_io(pid: u32, err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) if os_codes::EXITED.contains(&code) => MitigationError::ProcessExited { pid },
            Some(code) if os_codes::DENIED.contains(&code) => MitigationError::AccessDenied { pid },
            _ if err.kind() == io::ErrorKind::Unsupported => MitigationError::Unsupported,
            _ => MitigationError::Os { pid, source: err },
        }
    }

    /// True when the target is no longer running.
    pub fn is_process_exited(&self) -> bool {
        match self {
            MitigationError::ProcessExited { .. } => true,
            MitigationError::RestoreFailed { source, .. } => source.is_process_exited(),
            _ => false,
        }
    }
}

#[cfg(unix)]
mod os_codes {
    pub const EXITED: &[i32] = &[libc::ESRCH];
    pub const DENIED: &[i32] = &[libc::EPERM, libc::EACCES];
}

// OpenProcess reports a pid that no longer exists as an invalid parameter
#[cfg(windows)]
mod os_codes {
    use windows_sys::Win32::Foundation::{ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER};

    pub const EXITED: &[i32] = &[ERROR_INVALID_PARAMETER as i32];
    pub const DENIED: &[i32] = &[ERROR_ACCESS_DENIED as i32];
}

#[cfg(not(any(unix, windows)))]
mod os_codes {
    pub const EXITED: &[i32] = &[];
    pub const DENIED: &[i32] = &[];
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to write config file at {path:?}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

#[derive(Error, Debug)]
pub enum RegistrarError {
    #[error("Autostart is not supported on this platform")]
    Unsupported,

    #[error("Insufficient privilege to modify autostart entry: {0}")]
    AccessDenied(String),

    #[error("Autostart command failed: {0}")]
    CommandFailed(String),

    #[error("Autostart IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum CpuPulseError {
    #[error(transparent)]
    Mitigation(#[from] MitigationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registrar(#[from] RegistrarError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to install signal handler: {0}")]
    SignalHandler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CpuPulseError>;
