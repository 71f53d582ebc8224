use thiserror::Error;

/// Errors surfaced by the client facade and its internals, one variant per
/// row of the error taxonomy in §7.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ClientError {
    /// Allocation failure building a request or creating a daemon session.
    #[error("allocation failure while building the request")]
    Allocation,
    /// `send` failed for a caller that did not ask for `nofail` handling.
    #[error("send failed for tid {tid}")]
    SendFailed {
        /// Transaction id of the request that failed to send.
        tid: u64,
    },
    /// The caller's wait was interrupted; the request has been aborted.
    #[error("wait on tid {tid} was interrupted")]
    Interrupted {
        /// Transaction id of the request that was aborted.
        tid: u64,
    },
    /// The daemon reported a negative result for the operation.
    #[error("daemon reported error {errno} for tid {tid}")]
    Daemon {
        /// Transaction id the error was reported against.
        tid: u64,
        /// Negative errno reported by the daemon.
        errno: i32,
    },
    /// A write was attempted against a non-head snapshot context.
    #[error("writepages requires vino.snap == NOSNAP")]
    NotHead,
    /// The client was asked to operate after `stop`.
    #[error("client is stopped")]
    Stopped,
    /// The underlying transport rejected the operation.
    #[error(transparent)]
    Transport(#[from] osdc_transport::TransportError),
    /// The placement engine could not compute a layout.
    #[error(transparent)]
    Placement(#[from] osdc_placement::PlacementError),
}
