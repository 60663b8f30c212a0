pub mod autostart;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod mitigator;
pub mod output;
pub mod process;
pub mod runner;
pub mod signal;
pub mod state;
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;

pub use autostart::{AutostartRegistrar, APP_ID};
pub use config::{Config, ConfigStore, FileConfigStore, MemoryConfigStore};
pub use error::{CpuPulseError, Result};
pub use mitigator::{AffinityMitigator, DropPolicy, MitigationOutcome};
pub use process::{AffinitySet, ProcessHandle, ProcessLocator, ProcessSource};
pub use runner::MonitorLoop;
pub use signal::ShutdownToken;
pub use state::{CycleReport, MonitorState, MonitorSummary};
