//! Common utilities and types
//!
//! This module contains utilities and types shared across the crate.

mod error;
mod log;

pub use self::error::{ProxyError, Result};
pub use self::log::init_logger;
