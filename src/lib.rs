//! mqproxy: managed message-forwarding proxy with capture tee
//!
//! This library implements a broker-style intermediary: a controller
//! configures and launches a background worker that relays multi-frame
//! messages between a frontend and a backend endpoint, mirroring all
//! traffic to a third capture endpoint for observation.
//!
//! Three fixed proxy modes select the endpoint role pairing:
//!
//! | Mode      | Frontend | Backend |
//! |-----------|----------|---------|
//! | Queue     | ROUTER   | DEALER  |
//! | Forwarder | XSUB     | XPUB    |
//! | Streamer  | PULL     | PUSH    |
//!
//! The capture endpoint is always PUB, regardless of mode.
//!
//! # Example
//!
//! ```no_run
//! use mqproxy::{Proxy, ProxyMode, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut proxy = Proxy::new(ProxyMode::Streamer);
//!
//!     // Blocks until the worker has bound all three endpoints.
//!     proxy
//!         .start(
//!             "inproc://proxy-frontend",
//!             "inproc://proxy-backend",
//!             "inproc://proxy-capture",
//!         )
//!         .await?;
//!
//!     // ... producers and consumers exchange messages through the proxy ...
//!
//!     proxy.stop().await;
//!     Ok(())
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod control;
pub mod proxy;
pub mod transport;

// Re-export commonly used structures for convenience
pub use common::{init_logger, ProxyError, Result};
pub use config::{ProxyConfig, ProxyMode, RoleBinding, SocketRole};
pub use proxy::Proxy;
pub use transport::{Endpoint, Message};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
