//! Forwarding worker
//!
//! The background execution unit of a proxy: binds the three endpoints,
//! completes the start handshake over the control channel, then relays
//! messages between frontend and backend until told to stop, teeing every
//! relayed message to the capture endpoint.

use log::{debug, error, info};

use crate::config::{ProxyConfig, RoleBinding};
use crate::control::{Command, Reply, WorkerEnd};
use crate::transport::{Endpoint, Message};

/// Worker entry point.
///
/// Binding failure is fatal: the worker reports the cause over the control
/// channel instead of acknowledging readiness, and exits.
pub(crate) async fn run(config: ProxyConfig, roles: RoleBinding, mut control: WorkerEnd) {
    let (frontend, backend, capture) = match bind_endpoints(&config, roles) {
        Ok(endpoints) => endpoints,
        Err(cause) => {
            error!("Worker failed to come up: {}", cause);
            control.send(Reply::Failed(cause));
            return;
        }
    };

    // Consume the start token; its presence is the signal.
    match control.recv().await {
        Some(Command::Start) => {}
        Some(Command::Stop) | None => {
            debug!("Worker stopped before entering the forwarding loop");
            return;
        }
    }
    control.send(Reply::Ready);

    info!(
        "Forwarding worker ready: {} <-> {} (capture on {})",
        config.frontend_addr, config.backend_addr, config.capture_addr
    );

    if let Err(e) = relay_loop(frontend, backend, capture, &mut control).await {
        error!("Forwarding loop terminated: {}", e);
    }
}

/// Bind the three endpoints in frontend, backend, capture order.
fn bind_endpoints(
    config: &ProxyConfig,
    roles: RoleBinding,
) -> Result<(Endpoint, Endpoint, Endpoint), String> {
    let frontend = Endpoint::bind(roles.frontend, &config.frontend_addr)
        .map_err(|e| format!("frontend endpoint at {}: {}", config.frontend_addr, e))?;
    let backend = Endpoint::bind(roles.backend, &config.backend_addr)
        .map_err(|e| format!("backend endpoint at {}: {}", config.backend_addr, e))?;
    let capture = Endpoint::bind(roles.capture, &config.capture_addr)
        .map_err(|e| format!("capture endpoint at {}: {}", config.capture_addr, e))?;
    Ok((frontend, backend, capture))
}

/// The forwarding loop.
///
/// Waits on readiness of either data endpoint and relays one complete
/// message per iteration, frame boundaries intact. A primary-path error is
/// fatal; capture errors are absorbed. The stop command is observed
/// between relays and while a send is parked waiting for a peer.
async fn relay_loop(
    mut frontend: Endpoint,
    mut backend: Endpoint,
    mut capture: Endpoint,
    control: &mut WorkerEnd,
) -> crate::common::Result<()> {
    // One-way modes (Streamer) have a write-only backend; its select arm
    // is disabled rather than polled.
    let frontend_readable = frontend.role().can_receive();
    let backend_readable = backend.role().can_receive();

    loop {
        tokio::select! {
            _ = wait_for_stop(control) => {
                info!("Forwarding worker stopping");
                return Ok(());
            }
            msg = frontend.recv(), if frontend_readable => {
                let msg = msg?;
                tee(&mut capture, &msg).await;
                if send_or_stop(&mut backend, msg, control).await? {
                    info!("Forwarding worker stopping");
                    return Ok(());
                }
            }
            msg = backend.recv(), if backend_readable => {
                let msg = msg?;
                tee(&mut capture, &msg).await;
                if send_or_stop(&mut frontend, msg, control).await? {
                    info!("Forwarding worker stopping");
                    return Ok(());
                }
            }
        }
    }
}

/// Resolve once the controller asks for a stop (or drops its end).
async fn wait_for_stop(control: &mut WorkerEnd) {
    loop {
        match control.recv().await {
            Some(Command::Stop) | None => return,
            Some(Command::Start) => debug!("Ignoring duplicate start token"),
        }
    }
}

/// Relay one message, staying responsive to the stop signal.
///
/// A send can park waiting for its first peer (a load-balancing endpoint
/// with nobody connected yet); the stop command must still get through.
/// Returns `true` if a stop was requested, abandoning the in-flight
/// message.
async fn send_or_stop(
    dest: &mut Endpoint,
    msg: Message,
    control: &mut WorkerEnd,
) -> crate::common::Result<bool> {
    tokio::select! {
        result = dest.send(msg) => {
            result?;
            Ok(false)
        }
        _ = wait_for_stop(control) => Ok(true),
    }
}

/// Fire-and-forget copy to the capture endpoint.
async fn tee(capture: &mut Endpoint, msg: &Message) {
    if let Err(e) = capture.send(msg.clone()).await {
        debug!("Capture write dropped: {}", e);
    }
}
