use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

/// A contiguous page vector attached to a message, standing in for the
/// externally owned page-cache buffers (§1, "page-vector libraries").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageVec {
    pages: Vec<Bytes>,
}

impl PageVec {
    /// Builds a page vector from already-populated pages.
    #[must_use]
    pub const fn new(pages: Vec<Bytes>) -> Self {
        Self { pages }
    }

    /// Number of pages held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether this page vector holds no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Total byte length across all pages.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.pages.iter().map(Bytes::len).sum()
    }

    /// Borrows the underlying pages.
    #[must_use]
    pub fn pages(&self) -> &[Bytes] {
        &self.pages
    }
}

struct MessageState {
    tid: AtomicU64,
    body: Bytes,
    pages: Mutex<Option<PageVec>>,
}

/// A reference-counted request or reply message handle (§9).
///
/// Cloning shares the underlying state; this is the "shared-ownership
/// handle" the design notes map reference-counted messages onto. The page
/// vector lives behind its own mutex (the spec's per-message `page_mutex`)
/// so abort can revoke it independently of whatever else touches the
/// message.
#[derive(Clone)]
pub struct Message {
    inner: Arc<MessageState>,
}

impl Message {
    /// Builds a message carrying `body`, with no pages attached yet.
    #[must_use]
    pub fn new(tid: u64, body: Bytes) -> Self {
        Self {
            inner: Arc::new(MessageState {
                tid: AtomicU64::new(tid),
                body,
                pages: Mutex::new(None),
            }),
        }
    }

    /// The transaction id stamped into this message.
    #[must_use]
    pub fn tid(&self) -> u64 {
        self.inner.tid.load(Ordering::Acquire)
    }

    /// Restamps the transaction id, used when a request is re-registered.
    pub fn set_tid(&self, tid: u64) {
        self.inner.tid.store(tid, Ordering::Release);
    }

    /// The encoded message body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Attaches a page vector, under the page mutex.
    ///
    /// A page vector previously revoked by [`Self::revoke_pages`] is not
    /// re-attached implicitly; the caller must attach a fresh one.
    pub fn attach_pages(&self, pages: PageVec) {
        *self.inner.pages.lock().unwrap() = Some(pages);
    }

    /// Revokes (removes) the attached page vector, under the page mutex.
    ///
    /// Called by `abort` before any send can observe the message again;
    /// the ordering guarantee in §4.9 relies on this running under the
    /// same mutex a concurrent attach or read would use.
    pub fn revoke_pages(&self) -> Option<PageVec> {
        self.inner.pages.lock().unwrap().take()
    }

    /// Whether a page vector is currently attached.
    #[must_use]
    pub fn has_pages(&self) -> bool {
        self.inner.pages.lock().unwrap().is_some()
    }

    /// Number of live references to this message's shared state.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}
