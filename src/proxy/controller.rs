//! Proxy controller
//!
//! The user-facing handle: owns the configuration, spawns and supervises
//! the forwarding worker, and exposes the start/stop lifecycle and
//! read-only accessors.

use std::time::Duration;

use log::{error, info};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::common::{ProxyError, Result};
use crate::config::{ProxyConfig, ProxyMode, RoleBinding, SocketRole};
use crate::control::{self, Command, ControllerEnd, Reply};

use super::worker;

/// How long `start` waits for the worker's ready acknowledgement.
const START_TIMEOUT: Duration = Duration::from_secs(5);

/// Managed message-forwarding proxy.
///
/// A controller is single-use: it is created with a fixed mode, started at
/// most once, and cannot be restarted after [`stop`](Proxy::stop). The
/// three endpoints live entirely inside the worker task; the controller
/// never touches them.
pub struct Proxy {
    config: ProxyConfig,
    roles: RoleBinding,
    control: Option<ControllerEnd>,
    worker: Option<JoinHandle<()>>,
    started: bool,
}

impl Proxy {
    /// Create a proxy for the given mode.
    ///
    /// Derives the frontend/backend role pairing from the mode; the
    /// capture role is always broadcast. No I/O happens until
    /// [`start`](Proxy::start).
    pub fn new(mode: ProxyMode) -> Self {
        Self {
            config: ProxyConfig::new(mode),
            roles: RoleBinding::for_mode(mode),
            control: None,
            worker: None,
            started: false,
        }
    }

    /// Start the proxy.
    ///
    /// Records the three bind addresses (clamped to the address length
    /// limit), spawns the forwarding worker, and blocks until the worker
    /// has bound all three endpoints and acknowledged the start handshake.
    /// On return with `Ok`, the endpoints are live and reachable.
    ///
    /// # Errors
    ///
    /// * [`ProxyError::AlreadyStarted`] on a second start
    /// * [`ProxyError::Bind`] if the worker failed to bind an endpoint
    /// * [`ProxyError::Handshake`] if the control channel closed before
    ///   the ready acknowledgement
    /// * [`ProxyError::StartTimeout`] if the worker never answered
    pub async fn start(
        &mut self,
        frontend_addr: &str,
        backend_addr: &str,
        capture_addr: &str,
    ) -> Result<()> {
        if self.started {
            return Err(ProxyError::AlreadyStarted);
        }
        self.started = true;

        self.config
            .set_addresses(frontend_addr, backend_addr, capture_addr);

        let (mut controller_end, worker_end) = control::channel();
        let worker_config = self.config.clone();
        let roles = self.roles;
        let handle = tokio::spawn(worker::run(worker_config, roles, worker_end));

        controller_end.send(Command::Start);

        let reply = match timeout(START_TIMEOUT, controller_end.recv()).await {
            Ok(reply) => reply,
            Err(_) => {
                error!("Worker did not acknowledge start within {:?}", START_TIMEOUT);
                controller_end.send(Command::Stop);
                handle.abort();
                return Err(ProxyError::StartTimeout);
            }
        };

        match reply {
            Some(Reply::Ready) => {
                info!(
                    "Proxy started in {} mode ({} frontend, {} backend)",
                    self.config.mode, self.roles.frontend, self.roles.backend
                );
                self.control = Some(controller_end);
                self.worker = Some(handle);
                Ok(())
            }
            Some(Reply::Failed(cause)) => {
                // The worker has already exited; surface its cause.
                let _ = handle.await;
                Err(ProxyError::Bind(cause))
            }
            None => {
                let _ = handle.await;
                Err(ProxyError::Handshake(
                    "control channel closed before ready acknowledgement".to_string(),
                ))
            }
        }
    }

    /// Stop the proxy and wait for the worker to exit.
    ///
    /// The stop signal is observed by the forwarding loop between relays
    /// (and during a send parked on a peerless endpoint); the bound
    /// endpoints are released when the worker exits. Idempotent:
    /// stopping a never-started or already-stopped proxy is a no-op.
    pub async fn stop(&mut self) {
        if let Some(control) = self.control.take() {
            control.send(Command::Stop);
        }
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    error!("Worker task failed during shutdown: {}", e);
                }
            }
        }
    }

    /// Whether the proxy has a live worker.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// The proxy mode.
    pub fn mode(&self) -> ProxyMode {
        self.config.mode
    }

    /// The frontend bind address (empty before start).
    pub fn frontend_addr(&self) -> &str {
        &self.config.frontend_addr
    }

    /// The frontend endpoint role.
    pub fn frontend_role(&self) -> SocketRole {
        self.roles.frontend
    }

    /// The backend bind address (empty before start).
    pub fn backend_addr(&self) -> &str {
        &self.config.backend_addr
    }

    /// The backend endpoint role.
    pub fn backend_role(&self) -> SocketRole {
        self.roles.backend
    }

    /// The capture bind address (empty before start).
    pub fn capture_addr(&self) -> &str {
        &self.config.capture_addr
    }

    /// The capture endpoint role.
    pub fn capture_role(&self) -> SocketRole {
        self.roles.capture
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        // Deliver the stop signal without blocking so the worker and its
        // bound endpoints never outlive the controller unobserved.
        if let Some(control) = self.control.take() {
            control.send(Command::Stop);
        }
    }
}
