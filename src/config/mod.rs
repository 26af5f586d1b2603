//! Configuration module
//!
//! This module defines the proxy mode, the endpoint role pairing derived
//! from it, and the proxy configuration with its three bind addresses.
//! Configuration can be loaded from a JSON file and merged with values
//! supplied on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::common::{ProxyError, Result};

/// Maximum stored length of a bind address, in characters.
///
/// Longer values are silently clamped to this length.
pub const ADDR_MAX_LEN: usize = 255;

/// Proxy mode
///
/// The mode is fixed at construction and selects the frontend/backend
/// role pairing. The set is deliberately closed; invalid modes are
/// unrepresentable and only surface as errors on the string-parsing
/// boundary (CLI, config files).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ProxyMode {
    /// Request distribution: addressable frontend, load-balancing backend
    Queue,
    /// Topic relay: subscribe-side frontend, publish-side backend
    Forwarder,
    /// Pipeline: fan-in frontend, fan-out backend
    Streamer,
}

// Custom deserialization implementation to make it case-insensitive
impl<'de> Deserialize<'de> for ProxyMode {
    #[inline]
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ProxyMode::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ProxyMode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue => write!(f, "queue"),
            Self::Forwarder => write!(f, "forwarder"),
            Self::Streamer => write!(f, "streamer"),
        }
    }
}

impl FromStr for ProxyMode {
    type Err = ProxyError;

    #[inline]
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queue" => Ok(Self::Queue),
            "forwarder" => Ok(Self::Forwarder),
            "streamer" => Ok(Self::Streamer),
            _ => Err(ProxyError::Config(format!(
                "Invalid proxy mode: {}. Valid values are: queue, forwarder, streamer",
                s
            ))),
        }
    }
}

/// Behavioral role of an endpoint, independent of transport.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SocketRole {
    /// Many-to-one addressable: receive prepends a peer identity frame,
    /// send routes by the first frame
    Router,
    /// Load-balancing send, fair-queued receive
    Dealer,
    /// Extended subscribe: receives relayed traffic, sends subscriptions
    XSub,
    /// Extended publish: broadcasts relayed traffic, receives subscriptions
    XPub,
    /// Fan-in receive only
    Pull,
    /// Fan-out send only
    Push,
    /// Broadcast send only
    Pub,
    /// Broadcast receive only
    Sub,
}

impl SocketRole {
    /// Whether endpoints of this role can send messages.
    pub fn can_send(self) -> bool {
        !matches!(self, Self::Pull | Self::Sub)
    }

    /// Whether endpoints of this role can receive messages.
    pub fn can_receive(self) -> bool {
        !matches!(self, Self::Push | Self::Pub)
    }
}

impl fmt::Display for SocketRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Router => "ROUTER",
            Self::Dealer => "DEALER",
            Self::XSub => "XSUB",
            Self::XPub => "XPUB",
            Self::Pull => "PULL",
            Self::Push => "PUSH",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
        };
        write!(f, "{}", name)
    }
}

/// Endpoint role pairing derived from a proxy mode.
///
/// Immutable once constructed. The capture role is always broadcast,
/// regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleBinding {
    /// Role of the frontend endpoint
    pub frontend: SocketRole,
    /// Role of the backend endpoint
    pub backend: SocketRole,
    /// Role of the capture endpoint (always `Pub`)
    pub capture: SocketRole,
}

impl RoleBinding {
    /// Derive the role pairing for a proxy mode.
    pub fn for_mode(mode: ProxyMode) -> Self {
        let (frontend, backend) = match mode {
            ProxyMode::Queue => (SocketRole::Router, SocketRole::Dealer),
            ProxyMode::Forwarder => (SocketRole::XSub, SocketRole::XPub),
            ProxyMode::Streamer => (SocketRole::Pull, SocketRole::Push),
        };
        Self {
            frontend,
            backend,
            capture: SocketRole::Pub,
        }
    }
}

/// Proxy configuration
///
/// Contains the proxy mode and the three bind addresses. Addresses are
/// opaque strings interpreted by the transport; they are recorded at
/// start time and never mutated after the worker is spawned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy mode (queue, forwarder, streamer)
    pub mode: ProxyMode,

    /// Frontend bind address
    pub frontend_addr: String,

    /// Backend bind address
    pub backend_addr: String,

    /// Capture bind address
    pub capture_addr: String,
}

impl Default for ProxyConfig {
    #[inline]
    fn default() -> Self {
        Self {
            mode: ProxyMode::Streamer,
            frontend_addr: String::new(),
            backend_addr: String::new(),
            capture_addr: String::new(),
        }
    }
}

impl ProxyConfig {
    /// Create a configuration for the given mode with unset addresses.
    pub fn new(mode: ProxyMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Record the three bind addresses.
    ///
    /// Each address is clamped to [`ADDR_MAX_LEN`] characters; a clamp is
    /// logged but is not an error.
    pub fn set_addresses(&mut self, frontend: &str, backend: &str, capture: &str) {
        self.frontend_addr = clamp_addr(frontend);
        self.backend_addr = clamp_addr(backend);
        self.capture_addr = clamp_addr(capture);
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::Config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ProxyError::Config(format!(
                "Failed to parse configuration file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Merge another configuration into this one.
    ///
    /// Set (non-empty) address fields of `other` take precedence; the mode
    /// of `other` always takes precedence.
    pub fn merge(mut self, other: ProxyConfig) -> Self {
        self.mode = other.mode;
        if !other.frontend_addr.is_empty() {
            self.frontend_addr = other.frontend_addr;
        }
        if !other.backend_addr.is_empty() {
            self.backend_addr = other.backend_addr;
        }
        if !other.capture_addr.is_empty() {
            self.capture_addr = other.capture_addr;
        }
        self
    }

    /// Validate the configuration.
    ///
    /// All three addresses must be set before the proxy can start.
    pub fn validate(&self) -> Result<()> {
        if self.frontend_addr.is_empty() {
            return Err(ProxyError::Config("Frontend address is not set".to_string()));
        }
        if self.backend_addr.is_empty() {
            return Err(ProxyError::Config("Backend address is not set".to_string()));
        }
        if self.capture_addr.is_empty() {
            return Err(ProxyError::Config("Capture address is not set".to_string()));
        }
        Ok(())
    }
}

/// Clamp an address string to [`ADDR_MAX_LEN`] characters.
fn clamp_addr(addr: &str) -> String {
    if addr.chars().count() <= ADDR_MAX_LEN {
        return addr.to_string();
    }

    log::warn!(
        "Address exceeds {} characters and was truncated: {}...",
        ADDR_MAX_LEN,
        &addr[..addr.char_indices().nth(32).map(|(i, _)| i).unwrap_or(addr.len())]
    );
    addr.chars().take(ADDR_MAX_LEN).collect()
}
