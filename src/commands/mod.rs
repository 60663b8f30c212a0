//! CLI command handlers for cpupulse.
//!
//! # Commands
//!
//! - [`run`] - Start monitoring until interrupted
//! - [`status`] - Show whether the target is running
//! - [`config`] - Show, change, or reset configuration

mod config;
mod run;
mod status;

pub use config::{
    apply_config, config_display_command, config_reset_command, config_set_command,
    ConfigSubcommand,
};
pub use run::{run_command, RunOptions};
pub use status::status_command;
