//! Terminal output formatting for cpupulse.
//!
//! - [`messages`] - Error, warning, info and success messages
//! - [`status`] - Configuration and target status display

pub mod messages;
pub mod status;

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

pub use colors::*;

pub use messages::{print_error, print_info, print_success, print_warning};
pub use status::{print_config, print_header, print_monitor_started, print_status, print_summary};
