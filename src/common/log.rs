//! Logging utilities
//!
//! This module provides helper functions for the logging system.

/// Initialize the logging system
///
/// # Parameters
///
/// * `level` - Log level used when `RUST_LOG` is unset
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env).try_init();
}
