use std::sync::{Arc, Mutex};

use crate::error::TransportError;
use crate::message::Message;
use crate::{Connection, Transport, TransportCallbacks};

/// A recording, in-process [`Transport`] used by tests in place of a real
/// network transport.
///
/// Every successful `send` is appended to [`MockTransport::sent`]; a set of
/// addresses can be marked to fail `connect` or `send`, exercising the
/// error-taxonomy paths in §7 without a real daemon. [`MockTransport::simulate_reset`]
/// drives the same `on_reset` callback path a real transport would use to
/// report a dropped connection (§1, §5).
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(Connection, Message)>>,
    pings: Mutex<Vec<Connection>>,
    closed: Mutex<Vec<Connection>>,
    fail_connect: Mutex<Vec<String>>,
    fail_send: Mutex<Vec<String>>,
    callbacks: Mutex<Option<Arc<dyn TransportCallbacks>>>,
}

impl MockTransport {
    /// Builds an empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `addr` so the next `connect` against it fails.
    pub fn fail_connect_to(&self, addr: impl Into<String>) {
        self.fail_connect.lock().unwrap().push(addr.into());
    }

    /// Marks `addr` so every `send` to it fails.
    pub fn fail_send_to(&self, addr: impl Into<String>) {
        self.fail_send.lock().unwrap().push(addr.into());
    }

    /// Snapshot of every message sent so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<(Connection, Message)> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of messages sent to `addr`.
    #[must_use]
    pub fn sent_count_to(&self, addr: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(conn, _)| conn.addr() == addr)
            .count()
    }

    /// Snapshot of every connection pinged so far.
    #[must_use]
    pub fn pings(&self) -> Vec<Connection> {
        self.pings.lock().unwrap().clone()
    }

    /// Snapshot of every connection closed so far.
    #[must_use]
    pub fn closed(&self) -> Vec<Connection> {
        self.closed.lock().unwrap().clone()
    }

    /// Fault injection: delivers an `on_reset` callback for `addr`, as a
    /// real transport would after losing a connection. A no-op (with a
    /// warning) if nothing has registered callbacks yet.
    pub fn simulate_reset(&self, addr: &str) {
        match self.callbacks.lock().unwrap().as_ref() {
            Some(callbacks) => callbacks.on_reset(addr),
            None => tracing::warn!(addr, "simulate_reset called before any callbacks were registered"),
        }
    }
}

impl Transport for MockTransport {
    fn connect(&self, addr: &str) -> Result<Connection, TransportError> {
        if self.fail_connect.lock().unwrap().iter().any(|a| a == addr) {
            return Err(TransportError::ConnectFailed {
                addr: addr.to_string(),
            });
        }
        Ok(Connection::new(addr))
    }

    fn send(&self, conn: &Connection, msg: Message) -> Result<(), TransportError> {
        if self
            .fail_send
            .lock()
            .unwrap()
            .iter()
            .any(|a| a == conn.addr())
        {
            return Err(TransportError::SendFailed {
                addr: conn.addr().to_string(),
            });
        }
        self.sent.lock().unwrap().push((conn.clone(), msg));
        Ok(())
    }

    fn close(&self, conn: &Connection) {
        self.closed.lock().unwrap().push(conn.clone());
    }

    fn ping(&self, conn: &Connection) -> Result<(), TransportError> {
        self.pings.lock().unwrap().push(conn.clone());
        Ok(())
    }

    fn set_callbacks(&self, callbacks: Arc<dyn TransportCallbacks>) {
        *self.callbacks.lock().unwrap() = Some(callbacks);
    }
}
