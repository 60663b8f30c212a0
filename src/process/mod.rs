//! Process discovery and affinity control.
//!
//! This module provides the building blocks the monitor loop drives each
//! cycle: a locator that finds processes by image name, and handles that
//! can read and replace a process's affinity set.

mod affinity;
mod handle;
mod locator;

pub use handle::{AffinitySet, OsProcess, ProcessHandle};
pub use locator::{ProcessLocator, ProcessSource, SysinfoSource};
