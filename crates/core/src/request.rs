use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use osdc_placement::ObjectLayout;
use osdc_protocol::request::{OsdRequestMessage, RequestHeader};
use osdc_protocol::{OsdOp, PgId, ReassertVersion, RequestFlags, Timespec};
use osdc_transport::{Message, PageVec};

/// A one-shot completion signal, matching the `done`/`safe` pair carried by
/// every request (§3): a caller blocks on [`Self::wait`] under no lock and
/// [`Self::fire`] wakes every waiter exactly once.
#[derive(Default)]
pub(crate) struct CompletionSignal {
    fired: Mutex<bool>,
    condvar: Condvar,
}

impl CompletionSignal {
    pub(crate) fn fire(&self) {
        let mut fired = self.fired.lock().unwrap();
        if !*fired {
            *fired = true;
            self.condvar.notify_all();
        }
    }

    pub(crate) fn wait(&self) {
        let guard = self.fired.lock().unwrap();
        drop(self.condvar.wait_while(guard, |fired| !*fired).unwrap());
    }

    pub(crate) fn is_fired(&self) -> bool {
        *self.fired.lock().unwrap()
    }
}

/// Per-request callback invoked by the reply handler in place of signalling
/// completion directly (§4.6 step 7-8). Must not block.
pub type ReplyCallback = Box<dyn FnOnce(i32) + Send>;
/// Per-request callback invoked once the durable (`ONDISK`) commit lands.
pub type SafeCallback = Box<dyn FnOnce() + Send>;

/// The encode-relevant shape of a request, held unchanged for the whole
/// lifetime of the record. The dispatcher re-derives the wire bytes from
/// this plus the mutable fields (flags, `reassert_version`, epoch) on every
/// send, since those change across a resend.
pub(crate) struct RequestTemplate {
    pub client_inc: u32,
    pub snapid: u64,
    pub snap_seq: u64,
    pub ops: Vec<OsdOp>,
    pub oid: String,
    pub ticket: Vec<u8>,
    pub snaps: Vec<u64>,
    pub mtime: Timespec,
}

impl RequestTemplate {
    /// Encodes the full wire message for one (re)send.
    fn encode(
        &self,
        tid: u64,
        pg_id: PgId,
        osdmap_epoch: u32,
        flags: RequestFlags,
        reassert_version: ReassertVersion,
    ) -> bytes::Bytes {
        let message = OsdRequestMessage {
            header: RequestHeader {
                client_inc: self.client_inc,
                tid,
                layout: pg_id,
                snapid: self.snapid,
                snap_seq: self.snap_seq,
                num_snaps: self.snaps.len() as u32,
                object_len: self.oid.len() as u32,
                ticket_len: self.ticket.len() as u32,
                osdmap_epoch,
                flags,
                mtime: self.mtime,
                reassert_version,
                num_ops: self.ops.len() as u16,
            },
            ops: self.ops.clone(),
            oid: self.oid.clone(),
            ticket: self.ticket.clone(),
            snaps: self.snaps.clone(),
        };
        message.encode()
    }
}

/// Mutable fields guarded by the shared `request_mutex` (§5) rather than a
/// per-field lock, since they are always read or written together while
/// that mutex is held.
pub(crate) struct RequestMutable {
    pub flags: RequestFlags,
    pub outbound: Message,
    pub reply_msg: Option<Message>,
    pub result: i32,
    pub reassert_version: ReassertVersion,
    pub timeout_stamp: Instant,
    pub routed_daemon: Option<i32>,
    pub got_reply: bool,
    pub aborted: bool,
    pub resend: bool,
    pub on_reply: Option<ReplyCallback>,
    pub on_safe: Option<SafeCallback>,
}

struct RequestInner {
    tid: u64,
    oid: String,
    object_offset: u64,
    object_length: u64,
    pg_id: PgId,
    is_read: bool,
    template: RequestTemplate,
    mutable: Mutex<RequestMutable>,
    done: CompletionSignal,
    safe: CompletionSignal,
}

/// One in-flight operation (§3, §4.1).
///
/// Cloning shares the underlying state (the refcount the spec describes);
/// the request index holds one clone on behalf of the registration, the
/// daemon registry's session list holds another while routed, and callers
/// hold whatever they were handed by `build`.
#[derive(Clone)]
pub struct Request(Arc<RequestInner>);

impl Request {
    /// Assembles a request record from a computed layout and op set, with
    /// `tid` left at `0` until `start_request` assigns it (§4.5 step 2).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        layout: &ObjectLayout,
        is_read: bool,
        flags: RequestFlags,
        client_inc: u32,
        snapid: u64,
        snap_seq: u64,
        ops: Vec<OsdOp>,
        ticket: Vec<u8>,
        snaps: Vec<u64>,
        mtime: Timespec,
    ) -> Self {
        let template = RequestTemplate {
            client_inc,
            snapid,
            snap_seq,
            ops,
            oid: layout.oid.clone(),
            ticket,
            snaps,
            mtime,
        };
        let outbound = Message::new(0, template.encode(0, layout.pg_id, 0, flags, ReassertVersion::default()));

        Self(Arc::new(RequestInner {
            tid: 0,
            oid: layout.oid.clone(),
            object_offset: layout.object_offset,
            object_length: layout.object_length,
            pg_id: layout.pg_id,
            is_read,
            template,
            mutable: Mutex::new(RequestMutable {
                flags,
                outbound,
                reply_msg: None,
                result: 0,
                reassert_version: ReassertVersion::default(),
                timeout_stamp: Instant::now(),
                routed_daemon: None,
                got_reply: false,
                aborted: false,
                resend: false,
                on_reply: None,
                on_safe: None,
            }),
            done: CompletionSignal::default(),
            safe: CompletionSignal::default(),
        }))
    }

    /// The object this request targets.
    #[must_use]
    pub fn oid(&self) -> &str {
        &self.0.oid
    }

    /// Byte offset within the object.
    #[must_use]
    pub const fn object_offset(&self) -> u64 {
        self.0.object_offset
    }

    /// Byte length within the object (already shortened to the object
    /// boundary by the placement engine).
    #[must_use]
    pub const fn object_length(&self) -> u64 {
        self.0.object_length
    }

    /// The placement group this request routes to.
    #[must_use]
    pub const fn pg_id(&self) -> PgId {
        self.0.pg_id
    }

    /// Whether this request is a read (completes on a single response, no
    /// safe phase).
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.0.is_read
    }

    /// The transaction id, `0` until assigned by `start_request`.
    #[must_use]
    pub const fn tid(&self) -> u64 {
        self.0.tid
    }

    pub(crate) fn with_mutable<R>(&self, f: impl FnOnce(&mut RequestMutable) -> R) -> R {
        let mut guard = self.0.mutable.lock().unwrap();
        f(&mut guard)
    }

    /// Re-encodes the outbound message for `tid`/`osdmap_epoch` with the
    /// currently-set flags and `reassert_version`, replacing
    /// `mutable.outbound` and moving over any attached page vector.
    pub(crate) fn restamp_outbound(&self, osdmap_epoch: u32) {
        self.with_mutable(|m| {
            let body = self
                .0
                .template
                .encode(self.0.tid, self.0.pg_id, osdmap_epoch, m.flags, m.reassert_version);
            let fresh = Message::new(self.0.tid, body);
            if let Some(pages) = m.outbound.revoke_pages() {
                fresh.attach_pages(pages);
            }
            m.outbound = fresh;
        });
    }

    /// Attaches the caller's page vector to the outbound message.
    pub(crate) fn attach_pages(&self, pages: PageVec) {
        self.with_mutable(|m| m.outbound.attach_pages(pages));
    }

    /// Revokes the page vector from both the outbound and (if present)
    /// inbound messages, per `abort`'s ordering requirement (§4.9).
    pub(crate) fn revoke_pages(&self) {
        self.with_mutable(|m| {
            m.outbound.revoke_pages();
            if let Some(reply) = &m.reply_msg {
                reply.revoke_pages();
            }
        });
    }

    /// Live reference count (index + session + caller holds).
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub(crate) fn fire_done(&self) {
        self.0.done.fire();
    }

    pub(crate) fn fire_safe(&self) {
        self.0.safe.fire();
    }

    /// Blocks until the first response arrives (or the request is aborted
    /// and the signal is fired anyway, per `abort`).
    pub fn wait_done(&self) {
        self.0.done.wait();
    }

    /// Blocks until the durable commit lands.
    pub fn wait_safe(&self) {
        self.0.safe.wait();
    }

    /// Whether the first-response signal has fired.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.0.done.is_fired()
    }

    /// Whether the safe/commit signal has fired.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.0.safe.is_fired()
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("tid", &self.tid())
            .field("oid", &self.oid())
            .finish_non_exhaustive()
    }
}

impl Request {
    /// `tid` has no interior mutability by design (§3: "tid values are
    /// strictly increasing in allocation order"); `start_request` calls
    /// this exactly once, before the record is shared beyond its own
    /// construction, to fold the freshly assigned tid in.
    pub(crate) fn assign_tid(self, tid: u64, osdmap_epoch: u32) -> Self {
        let RequestInner {
            oid,
            object_offset,
            object_length,
            pg_id,
            is_read,
            template,
            mutable,
            done,
            safe,
            ..
        } = Arc::try_unwrap(self.0)
            .unwrap_or_else(|_| panic!("assign_tid called after the request record was shared"));

        let mut mutable = mutable.into_inner().unwrap();
        let body = template.encode(tid, pg_id, osdmap_epoch, mutable.flags, mutable.reassert_version);
        let fresh = Message::new(tid, body);
        if let Some(existing_pages) = mutable.outbound.revoke_pages() {
            fresh.attach_pages(existing_pages);
        }
        mutable.outbound = fresh;

        Self(Arc::new(RequestInner {
            tid,
            oid,
            object_offset,
            object_length,
            pg_id,
            is_read,
            template,
            mutable: Mutex::new(mutable),
            done,
            safe,
        }))
    }
}

/// Builds a minimal read request at a given `tid`, for tests in sibling
/// modules that only need a request identity to exercise index/registry
/// bookkeeping.
#[cfg(test)]
pub(crate) fn test_request(tid: u64) -> Request {
    use osdc_protocol::opcode::OpCode;

    let layout = ObjectLayout {
        oid: format!("{tid}.00000000"),
        object_offset: 0,
        object_length: 4096,
        pg_id: PgId { pool: 1, seed: 0 },
        primary: Some(0),
    };
    Request::new(
        &layout,
        true,
        RequestFlags::READ,
        1,
        0,
        0,
        vec![OsdOp::primary(OpCode::Read, 0, 4096, 0)],
        Vec::new(),
        Vec::new(),
        Timespec::default(),
    )
    .assign_tid(tid, 0)
}

/// Builds a minimal write request at a given `tid`, for tests exercising
/// the ack-then-commit two-phase reply flow.
#[cfg(test)]
pub(crate) fn test_write_request(tid: u64) -> Request {
    use osdc_protocol::opcode::OpCode;

    let layout = ObjectLayout {
        oid: format!("{tid}.00000000"),
        object_offset: 0,
        object_length: 4096,
        pg_id: PgId { pool: 1, seed: 0 },
        primary: Some(0),
    };
    Request::new(
        &layout,
        false,
        RequestFlags::WRITE | RequestFlags::ONDISK,
        1,
        0,
        0,
        vec![OsdOp::primary(OpCode::Write, 0, 4096, 4096)],
        Vec::new(),
        Vec::new(),
        Timespec::default(),
    )
    .assign_tid(tid, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osdc_protocol::opcode::OpCode;

    fn sample_request() -> Request {
        let layout = ObjectLayout {
            oid: "1.00000000".to_string(),
            object_offset: 0,
            object_length: 4096,
            pg_id: PgId { pool: 1, seed: 0 },
            primary: Some(3),
        };
        Request::new(
            &layout,
            true,
            RequestFlags::READ,
            1,
            0,
            0,
            vec![OsdOp::primary(OpCode::Read, 0, 4096, 0)],
            Vec::new(),
            Vec::new(),
            Timespec::default(),
        )
    }

    #[test]
    fn assign_tid_sets_tid_and_preserves_fields() {
        let request = sample_request().assign_tid(42, 7);
        assert_eq!(request.tid(), 42);
        assert_eq!(request.oid(), "1.00000000");
    }

    #[test]
    fn completion_signals_fire_at_most_once_and_are_observable() {
        let request = sample_request();
        assert!(!request.is_done());
        request.fire_done();
        request.fire_done();
        assert!(request.is_done());
        request.wait_done();
    }

    #[test]
    fn clone_shares_state() {
        let request = sample_request().assign_tid(1, 0);
        let clone = request.clone();
        assert_eq!(request.ref_count(), 2);
        request.with_mutable(|m| m.resend = true);
        assert!(clone.with_mutable(|m| m.resend));
    }

    #[test]
    fn restamp_outbound_preserves_attached_pages() {
        let request = sample_request().assign_tid(1, 0);
        request.attach_pages(PageVec::new(vec![bytes::Bytes::from_static(b"page")]));
        request.restamp_outbound(3);
        let has_pages = request.with_mutable(|m| m.outbound.has_pages());
        assert!(has_pages);
    }
}
