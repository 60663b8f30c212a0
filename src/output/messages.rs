//! Basic message output functions.

use super::colors::*;

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{RED}{BOLD}Error:{RESET} {}", msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{YELLOW}Warning:{RESET} {}", msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{CYAN}Info:{RESET} {}", msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{GREEN}Done:{RESET} {}", msg);
}
