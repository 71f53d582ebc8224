use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// The monitor client the dispatcher and timeout worker ask for newer
/// topology snapshots (§1, "the monitor client"). Genuinely external to
/// this client, same as the transport; this trait is the seam.
pub trait MonitorClient: Send + Sync {
    /// Requests a newer osd map. Implementations throttle this themselves
    /// (§4.8: "bounded by monitor client's own throttling").
    fn request_newer_map(&self);

    /// Informs the monitor of the epoch the client has just adopted.
    fn notify_epoch(&self, epoch: u32);
}

/// A [`MonitorClient`] that does nothing, for client configurations with no
/// real monitor to talk to (e.g. a fixed, never-changing map in tests).
#[derive(Debug, Default)]
pub struct NullMonitorClient;

impl MonitorClient for NullMonitorClient {
    fn request_newer_map(&self) {}
    fn notify_epoch(&self, _epoch: u32) {}
}

/// A [`MonitorClient`] that counts calls, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingMonitorClient {
    requests: AtomicU64,
    last_notified_epoch: AtomicU32,
}

impl RecordingMonitorClient {
    /// Builds a fresh recording monitor client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times [`MonitorClient::request_newer_map`] was called.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Acquire)
    }

    /// The last epoch reported via [`MonitorClient::notify_epoch`].
    #[must_use]
    pub fn last_notified_epoch(&self) -> u32 {
        self.last_notified_epoch.load(Ordering::Acquire)
    }
}

impl MonitorClient for RecordingMonitorClient {
    fn request_newer_map(&self) {
        self.requests.fetch_add(1, Ordering::AcqRel);
    }

    fn notify_epoch(&self, epoch: u32) {
        self.last_notified_epoch.store(epoch, Ordering::Release);
    }
}
