//! Control channel
//!
//! A private, in-process, bidirectional channel between the controller and
//! its forwarding worker. It carries the one-shot start handshake and,
//! later, the stop signal; no data-plane traffic ever flows here.

use tokio::sync::mpsc;

/// Commands sent from the controller to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin serving; the worker acknowledges with [`Reply::Ready`]
    Start,
    /// Leave the forwarding loop and exit
    Stop,
}

/// Replies sent from the worker to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// All three endpoints are bound and the loop is about to run
    Ready,
    /// The worker could not come up; carries the cause
    Failed(String),
}

/// Controller-side end of the control channel.
#[derive(Debug)]
pub struct ControllerEnd {
    pub(crate) tx: mpsc::UnboundedSender<Command>,
    pub(crate) rx: mpsc::UnboundedReceiver<Reply>,
}

/// Worker-side end of the control channel.
#[derive(Debug)]
pub struct WorkerEnd {
    pub(crate) tx: mpsc::UnboundedSender<Reply>,
    pub(crate) rx: mpsc::UnboundedReceiver<Command>,
}

/// Create a connected control channel pair.
pub fn channel() -> (ControllerEnd, WorkerEnd) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();

    let controller = ControllerEnd {
        tx: cmd_tx,
        rx: reply_rx,
    };
    let worker = WorkerEnd {
        tx: reply_tx,
        rx: cmd_rx,
    };
    (controller, worker)
}

impl ControllerEnd {
    /// Send a command to the worker. Lost commands (worker already gone)
    /// are not an error at this layer.
    pub fn send(&self, cmd: Command) {
        let _ = self.tx.send(cmd);
    }

    /// Receive the next reply from the worker.
    ///
    /// Returns `None` if the worker dropped its end without replying.
    pub async fn recv(&mut self) -> Option<Reply> {
        self.rx.recv().await
    }
}

impl WorkerEnd {
    /// Send a reply to the controller.
    pub fn send(&self, reply: Reply) {
        let _ = self.tx.send(reply);
    }

    /// Receive the next command from the controller.
    ///
    /// Returns `None` if the controller dropped its end.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }
}
