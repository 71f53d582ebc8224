#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `osdc_transport` is a stand-in for the message transport the client core
//! treats as an external collaborator (§1, §6): reliable, ordered
//! point-to-point delivery of framed messages with peer-keyed connections.
//!
//! # Design
//!
//! - [`Transport`] is the contract `osdc-core` consumes: `connect`, `send`,
//!   `close`, plus the callback edge (`on_reply`, `on_reset`,
//!   `on_prepare_pages`) delivered through [`TransportCallbacks`].
//! - [`Message`] is the reference-counted request/reply handle (§9,
//!   "Reference-counted messages map to a shared-ownership handle"); its
//!   page vector is governed by a per-message mutex so `abort` can revoke
//!   pages out from under a racing send (§4.9).
//! - [`mock::MockTransport`] is a test double recording every send, used by
//!   `osdc-core`'s integration tests in place of a real network transport.
//!
//! # Invariants
//!
//! - `Message::revoke_pages` and `Message::attach_pages` are mutually
//!   exclusive under the same per-message mutex; a revoke always wins a
//!   race with a concurrent attach.
//!
//! # Errors
//!
//! Connection and send failures are reported through [`TransportError`].

/// Errors produced by a [`Transport`] implementation.
pub mod error;
/// The reference-counted message handle and its page-vector revocation.
pub mod message;
/// A recording, in-process [`Transport`] used by tests.
pub mod mock;

pub use error::TransportError;
pub use message::{Message, PageVec};

use std::fmt;
use std::sync::Arc;

/// An established connection to one daemon, opaque beyond equality and
/// display (its address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    addr: String,
}

impl Connection {
    /// Builds a connection handle for `addr`. Transport implementations
    /// return these from [`Transport::connect`]; tests may construct one
    /// directly.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// The peer address this connection targets.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Reliable, ordered point-to-point delivery of framed messages, keyed by
/// peer connection (§6, "Transport contract consumed").
pub trait Transport: Send + Sync {
    /// Opens a connection to `addr`.
    fn connect(&self, addr: &str) -> Result<Connection, TransportError>;

    /// Sends `msg` over `conn`, best-effort reliable and ordered.
    ///
    /// Consumes one reference on `msg`: on success the transport owns the
    /// reference it was handed and will drop it once the message has been
    /// pushed out; on failure the caller retains ownership.
    fn send(&self, conn: &Connection, msg: Message) -> Result<(), TransportError>;

    /// Closes `conn`, releasing any transport-side resources.
    fn close(&self, conn: &Connection);

    /// Sends a liveness probe to `conn`, used by the timeout worker to
    /// verify a silent daemon's transport is still alive.
    fn ping(&self, conn: &Connection) -> Result<(), TransportError>;

    /// Registers the sink this transport delivers inbound replies and reset
    /// notifications into (§1, §5). A real transport calls back into
    /// `callbacks` from its own I/O thread; `osdc-core` registers itself
    /// here during `Client::init`.
    fn set_callbacks(&self, callbacks: Arc<dyn TransportCallbacks>);
}

/// Callbacks a [`Transport`] implementation delivers into the client core.
pub trait TransportCallbacks: Send + Sync {
    /// A reply message has arrived.
    fn on_reply(&self, msg: Message);

    /// The connection to `addr` was reset; the core should mass-resubmit.
    fn on_reset(&self, addr: &str);

    /// The transport is about to deliver `want` bytes into `msg` and asks
    /// the core to prepare page storage for them.
    fn on_prepare_pages(&self, msg: &Message, want: usize) -> Result<(), TransportError>;
}
