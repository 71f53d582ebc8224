use thiserror::Error;

/// Errors produced by a [`crate::Transport`] implementation.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum TransportError {
    /// `connect` could not reach the given address.
    #[error("failed to connect to {addr}")]
    ConnectFailed {
        /// Address that could not be reached.
        addr: String,
    },
    /// `send` failed after the connection was established.
    #[error("send failed on {addr}")]
    SendFailed {
        /// Address the send was attempted against.
        addr: String,
    },
    /// The page-vector callback declined to prepare storage.
    #[error("callback declined to prepare {want} bytes of page storage")]
    PreparePagesFailed {
        /// Bytes the transport asked the core to prepare.
        want: usize,
    },
}
