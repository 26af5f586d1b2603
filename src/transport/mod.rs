//! In-process message transport
//!
//! This module implements the transport contract the proxy core consumes:
//! role-typed endpoints bound to opaque address strings, exchanging
//! discrete multi-frame messages. Addresses are process-local; the
//! registry releases an address when its bound endpoint is dropped.

mod endpoint;
mod message;

pub use self::endpoint::{Endpoint, PeerId};
pub use self::message::Message;
