//! Status command handler.
//!
//! Reports the configured target, whether it is running right now, and
//! whether autostart is registered.

use std::sync::Arc;

use crate::autostart::{platform_registrar, APP_ID};
use crate::config::{ConfigStore, FileConfigStore};
use crate::error::Result;
use crate::output::{print_header, print_status};
use crate::process::SysinfoSource;
use crate::runner::MonitorLoop;

pub fn status_command() -> Result<()> {
    let store = Arc::new(FileConfigStore::new()?);
    let config = store.load();

    let mut monitor = MonitorLoop::new(SysinfoSource::new(), store);
    let target_running = monitor.is_target_running();
    let autostart_registered = platform_registrar().is_registered(APP_ID);

    print_header();
    print_status(&config, target_running, autostart_registered);
    Ok(())
}
