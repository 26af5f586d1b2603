//! Proxy module
//!
//! This module implements the proxy core: the controller that owns the
//! configuration and lifecycle, and the background worker that binds the
//! endpoints and runs the forwarding loop.

mod controller;
mod worker;

pub use controller::Proxy;
