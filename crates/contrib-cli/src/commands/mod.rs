//! Command implementations

mod check_config;
mod watch;

pub use check_config::run_check_config;
pub use watch::run_watch;
