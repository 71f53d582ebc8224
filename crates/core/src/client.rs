use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use osdc_placement::{FileLayout, OsdMap, Vino, NOSNAP};
use osdc_protocol::{OpCode, RequestFlags, Timespec};
use osdc_transport::{Message, PageVec, Transport};

use crate::builder::{build, BuildArgs};
use crate::callbacks::CoreCallbacks;
use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ClientError;
use crate::inner::SharedState;
use crate::map::{MapHandler, MapUpdate};
use crate::monitor::MonitorClient;
use crate::reply::ReplyHandler;
use crate::request::Request;
use crate::timeout::TimeoutWorker;

/// Top-level facade (§4.9): `readpages`, `writepages`, `sync`, `abort`,
/// `wait`, and the `init`/`stop` lifecycle.
pub struct Client {
    config: ClientConfig,
    state: Arc<SharedState>,
    dispatcher: Arc<Dispatcher>,
    reply_handler: ReplyHandler,
    map_handler: MapHandler,
    timeout_worker: Option<TimeoutWorker>,
    stopped: AtomicBool,
}

impl Client {
    /// Builds a fresh client session over `transport`/`monitor`, starting
    /// from `initial_map`, and starts the timeout worker (§4.9 `init`).
    ///
    /// The request pool itself is not a separate preallocated arena here:
    /// `Request` records are ordinary heap allocations, and
    /// `config.request_pool_size()` is retained purely as a documented
    /// lower bound a caller may use to size its own page-vector pool, since
    /// Rust's allocator already guarantees forward progress under memory
    /// pressure the way the teacher's fixed-size pool was built to survive.
    #[must_use]
    pub fn init(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        monitor: Arc<dyn MonitorClient>,
        initial_map: OsdMap,
        expected_fsid: u64,
    ) -> Self {
        let state = Arc::new(SharedState::new(initial_map));
        let dispatcher = Arc::new(Dispatcher::new(
            state.clone(),
            transport.clone(),
            monitor.clone(),
            config.osd_timeout(),
        ));
        let reply_handler = ReplyHandler::new(state.clone(), transport.clone());
        let map_handler = MapHandler::new(state.clone(), dispatcher.clone(), monitor.clone(), expected_fsid);
        let timeout_worker = TimeoutWorker::start(
            state.clone(),
            transport.clone(),
            monitor,
            dispatcher.clone(),
            config.osd_timeout(),
        );

        transport.set_callbacks(Arc::new(CoreCallbacks::new(reply_handler.clone(), dispatcher.clone())));

        Self {
            config,
            state,
            dispatcher,
            reply_handler,
            map_handler,
            timeout_worker: Some(timeout_worker),
            stopped: AtomicBool::new(false),
        }
    }

    /// Stops the timeout worker and marks the client stopped. Does not
    /// force-fail requests still in flight (§4.9).
    pub fn stop(mut self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(worker) = self.timeout_worker.take() {
            worker.stop();
        }
    }

    fn ensure_running(&self) -> Result<(), ClientError> {
        if self.stopped.load(Ordering::Acquire) {
            Err(ClientError::Stopped)
        } else {
            Ok(())
        }
    }

    /// Entry point for a decoded reply message arriving from the transport.
    pub fn handle_reply(&self, msg: &Message) {
        self.reply_handler.handle_reply(msg);
    }

    /// Entry point for a decoded map update arriving from the transport or
    /// monitor client.
    pub fn handle_map_update(&self, update: &MapUpdate) {
        self.map_handler.handle_map_update(update);
    }

    /// Entry point for a transport-reported reset of the connection to
    /// `addr`: mass-resubmits every request currently routed there via the
    /// kick protocol (§2 item 5, §5, §7's "transport reset" row).
    pub fn handle_reset(&self, addr: &str) {
        self.dispatcher.kick_requests(Some(addr));
    }

    /// Read-only diagnostic snapshot of active daemon sessions
    /// (`(osd_ordinal, in_flight_count)`), mirroring Ceph's
    /// `dump_active_requests` (SPEC_FULL.md "Supplemented features").
    #[must_use]
    pub fn session_summary(&self) -> Vec<crate::daemon_registry::SessionSummary> {
        self.state.locked.lock().unwrap().registry.session_summary()
    }

    /// `readpages(vino, layout, off, plen, trunc_seq, trunc_size, pages)`
    /// (§4.9): builds a `READ` request, attaches `pages`, starts it, waits
    /// for completion, and returns the daemon's result.
    #[allow(clippy::too_many_arguments)]
    pub fn readpages(
        &self,
        vino: Vino,
        layout: &FileLayout,
        off: u64,
        plen: u64,
        trunc_seq: u32,
        trunc_size: u64,
        pages: PageVec,
    ) -> Result<i32, ClientError> {
        self.ensure_running()?;

        let (request, _layout) = {
            let map = self.state.map.read().unwrap();
            build(
                BuildArgs {
                    layout,
                    vino,
                    off,
                    plen,
                    opcode: OpCode::Read,
                    flags: RequestFlags::READ,
                    client_inc: self.config.client_inc(),
                    snap_seq: 0,
                    snaps: Vec::new(),
                    trunc_seq,
                    trunc_size,
                    do_sync: false,
                    mtime: Timespec::default(),
                },
                &map,
            )?
        };

        request.attach_pages(pages);
        let request = self.dispatcher.start_request(request, false)?;
        request.wait_done();

        if request.with_mutable(|m| m.aborted) {
            return Err(ClientError::Interrupted { tid: request.tid() });
        }
        Ok(request.with_mutable(|m| m.result))
    }

    /// `writepages(vino, layout, snapc, off, len, trunc_seq, trunc_size,
    /// mtime, pages, flags, do_sync, nofail)` (§4.9): requires
    /// `vino.snap == NOSNAP`, builds a `WRITE` request with
    /// `flags | ONDISK | WRITE`, starts with `nofail`, and waits for the
    /// first (ack) completion, not the safe one.
    #[allow(clippy::too_many_arguments)]
    pub fn writepages(
        &self,
        vino: Vino,
        layout: &FileLayout,
        snap_seq: u64,
        snaps: Vec<u64>,
        off: u64,
        len: u64,
        trunc_seq: u32,
        trunc_size: u64,
        mtime: Timespec,
        pages: PageVec,
        flags: RequestFlags,
        do_sync: bool,
        nofail: bool,
    ) -> Result<u64, ClientError> {
        self.ensure_running()?;
        if vino.snap != NOSNAP {
            return Err(ClientError::NotHead);
        }

        let (request, object_layout) = {
            let map = self.state.map.read().unwrap();
            build(
                BuildArgs {
                    layout,
                    vino,
                    off,
                    plen: len,
                    opcode: OpCode::Write,
                    flags: flags.union(RequestFlags::ONDISK).union(RequestFlags::WRITE),
                    client_inc: self.config.client_inc(),
                    snap_seq,
                    snaps,
                    trunc_seq,
                    trunc_size,
                    do_sync,
                    mtime,
                },
                &map,
            )?
        };

        request.attach_pages(pages);
        let request = self.dispatcher.start_request(request, nofail)?;
        request.wait_done();

        if request.with_mutable(|m| m.aborted) {
            return Err(ClientError::Interrupted { tid: request.tid() });
        }
        let result = request.with_mutable(|m| m.result);
        if result < 0 {
            return Err(ClientError::Daemon {
                tid: request.tid(),
                errno: result,
            });
        }
        Ok(object_layout.object_length)
    }

    /// `sync` (§4.9): snapshots `last_tid`, then walks writes with
    /// `tid <= last_tid` via `lowest_ge` scans, releasing the request mutex
    /// before waiting on each one's safe completion and reacquiring
    /// afterward, so new writes (which always get higher tids) cannot
    /// starve it.
    pub fn sync(&self) -> Result<(), ClientError> {
        self.ensure_running()?;

        let last_tid = {
            let locked = self.state.locked.lock().unwrap();
            locked.next_tid.saturating_sub(1)
        };

        let mut cursor = 0u64;
        loop {
            let next = {
                let locked = self.state.locked.lock().unwrap();
                locked.index.lowest_ge(cursor)
            };
            let Some(request) = next else {
                break;
            };
            if request.tid() > last_tid {
                break;
            }
            cursor = request.tid() + 1;

            if request.is_read() {
                continue;
            }
            request.wait_safe();
        }

        Ok(())
    }

    /// `abort` (§4.9): marks `request` aborted, revokes its pages, and
    /// fires both completion signals so any waiter unblocks immediately.
    pub fn abort(&self, request: &Request) {
        self.dispatcher.abort(request);
    }

    /// `wait` (§4.9): blocks until the first-response signal fires.
    ///
    /// Rust has no POSIX-style interruptible blocking wait; the
    /// `abort`-races-`wait` case from the spec is translated by checking
    /// `aborted` after the (uninterruptible) wait returns, rather than
    /// interrupting the wait itself, and reporting
    /// [`ClientError::Interrupted`] in that case.
    pub fn wait(&self, request: &Request) -> Result<i32, ClientError> {
        request.wait_done();
        if request.with_mutable(|m| m.aborted) {
            return Err(ClientError::Interrupted { tid: request.tid() });
        }
        Ok(request.with_mutable(|m| m.result))
    }
}
