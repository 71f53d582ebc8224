use std::sync::Arc;
use std::time::{Duration, Instant};

use osdc_placement::calc_pg_primary;
use osdc_protocol::RequestFlags;
use osdc_transport::Transport;

use crate::error::ClientError;
use crate::inner::SharedState;
use crate::monitor::MonitorClient;
use crate::request::Request;

/// Outcome of re-deriving a request's routing against the current map
/// (§4.5 `map_osds`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MapOsdsOutcome {
    /// The computed primary matches the currently routed daemon.
    Unchanged,
    /// The request moved to a new (or first) daemon session.
    Changed,
    /// The placement group currently has no up primary.
    NoPrimary,
    /// Creating the new daemon session failed (the spec's `ENOMEM` case).
    SessionCreateFailed,
}

/// Implements `start`, `send`, `map_osds` and the kick protocol (§4.5).
pub(crate) struct Dispatcher {
    state: Arc<SharedState>,
    transport: Arc<dyn Transport>,
    monitor: Arc<dyn MonitorClient>,
    osd_timeout: Duration,
}

impl Dispatcher {
    pub(crate) fn new(
        state: Arc<SharedState>,
        transport: Arc<dyn Transport>,
        monitor: Arc<dyn MonitorClient>,
        osd_timeout: Duration,
    ) -> Self {
        Self {
            state,
            transport,
            monitor,
            osd_timeout,
        }
    }

    /// `start_request(req, nofail)` (§4.5).
    pub(crate) fn start_request(&self, request: Request, nofail: bool) -> Result<Request, ClientError> {
        let epoch = self.state.map.read().unwrap().epoch();

        let tid = {
            let mut locked = self.state.locked.lock().unwrap();
            let tid = locked.alloc_tid();
            locked.live_count += 1;
            tid
        };

        let request = request.assign_tid(tid, epoch);

        {
            let mut locked = self.state.locked.lock().unwrap();
            locked.index.insert(tid, request.clone());
        }

        match self.send(&request) {
            Ok(()) => Ok(request),
            Err(err) => {
                if nofail {
                    request.with_mutable(|m| m.resend = true);
                    Ok(request)
                } else {
                    let mut locked = self.state.locked.lock().unwrap();
                    locked.index.remove(tid);
                    locked.live_count = locked.live_count.saturating_sub(1);
                    Err(err)
                }
            }
        }
    }

    /// `map_osds(req)` (§4.5).
    pub(crate) fn map_osds(&self, request: &Request) -> MapOsdsOutcome {
        let map = self.state.map.read().unwrap();
        let primary = calc_pg_primary(request.pg_id(), &map);

        let current = request.with_mutable(|m| m.routed_daemon);
        if primary == current {
            return MapOsdsOutcome::Unchanged;
        }

        let mut locked = self.state.locked.lock().unwrap();

        if let Some(old_ordinal) = current {
            if let Some(conn) = locked.registry.unroute(old_ordinal, request.tid()) {
                self.transport.close(&conn);
            }
        }

        let Some(new_ordinal) = primary else {
            request.with_mutable(|m| m.routed_daemon = None);
            return MapOsdsOutcome::NoPrimary;
        };

        let Some(addr) = map.osd_addr(new_ordinal) else {
            request.with_mutable(|m| m.routed_daemon = None);
            return MapOsdsOutcome::NoPrimary;
        };
        let addr = addr.to_string();

        let transport = &self.transport;
        match locked
            .registry
            .route(new_ordinal, request.clone(), || transport.connect(&addr))
        {
            Ok(()) => {
                request.with_mutable(|m| m.routed_daemon = Some(new_ordinal));
                MapOsdsOutcome::Changed
            }
            Err(_) => {
                request.with_mutable(|m| m.routed_daemon = None);
                MapOsdsOutcome::SessionCreateFailed
            }
        }
    }

    /// `send(req)` (§4.5).
    pub(crate) fn send(&self, request: &Request) -> Result<(), ClientError> {
        if request.with_mutable(|m| m.aborted) {
            return Ok(());
        }

        match self.map_osds(request) {
            MapOsdsOutcome::SessionCreateFailed => Err(ClientError::Allocation),
            MapOsdsOutcome::NoPrimary => {
                self.monitor.request_newer_map();
                Ok(())
            }
            MapOsdsOutcome::Changed | MapOsdsOutcome::Unchanged => {
                let epoch = self.state.map.read().unwrap().epoch();
                let deadline = Instant::now() + self.osd_timeout;
                request.with_mutable(|m| m.timeout_stamp = deadline);
                request.restamp_outbound(epoch);

                let ordinal = request
                    .with_mutable(|m| m.routed_daemon)
                    .expect("map_osds left the request routed on Changed/Unchanged");
                let connection = {
                    let locked = self.state.locked.lock().unwrap();
                    locked.registry.connection(ordinal).cloned()
                }
                .expect("a routed ordinal always has an open session");

                let outbound = request.with_mutable(|m| m.outbound.clone());
                self.transport
                    .send(&connection, outbound)
                    .map_err(ClientError::from)
            }
        }
    }

    /// `kick_requests(addr_or_null)` (§4.5).
    pub(crate) fn kick_requests(&self, addr: Option<&str>) {
        let requests = {
            let locked = self.state.locked.lock().unwrap();
            locked.index.in_order()
        };

        for request in requests {
            if request.with_mutable(|m| m.aborted) {
                continue;
            }

            let resend_flag = request.with_mutable(|m| m.resend);
            let last_addr = request.with_mutable(|m| m.routed_daemon).and_then(|ordinal| {
                let locked = self.state.locked.lock().unwrap();
                locked
                    .registry
                    .connection(ordinal)
                    .map(|conn| conn.addr().to_string())
            });

            let force = resend_flag || addr.is_some_and(|a| last_addr.as_deref() == Some(a));

            if force {
                match self.send(&request) {
                    Ok(()) => request.with_mutable(|m| m.resend = false),
                    Err(_) => request.with_mutable(|m| m.resend = true),
                }
                continue;
            }

            match self.map_osds(&request) {
                MapOsdsOutcome::Unchanged => {}
                MapOsdsOutcome::NoPrimary => self.monitor.request_newer_map(),
                MapOsdsOutcome::SessionCreateFailed => {
                    request.with_mutable(|m| m.resend = true);
                }
                MapOsdsOutcome::Changed => {
                    request.with_mutable(|m| m.flags.insert(RequestFlags::RETRY));
                    if self.send(&request).is_err() {
                        request.with_mutable(|m| m.resend = true);
                    }
                }
            }
        }
    }

    /// Sets `aborted`, revokes the request's page vectors, and fires both
    /// completion signals so any waiter unblocks (§4.9 `abort`).
    ///
    /// The `aborted` flag is set before pages are revoked: a kicker that
    /// read the request just before this call but sends after it will
    /// observe `aborted` inside [`Self::send`] and skip the transport call.
    pub(crate) fn abort(&self, request: &Request) {
        request.with_mutable(|m| m.aborted = true);
        request.revoke_pages();
        request.fire_done();
        request.fire_safe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::RecordingMonitorClient;
    use crate::request::test_request;
    use osdc_placement::{OsdMap, OsdMapSnapshot, PgId};
    use osdc_transport::mock::MockTransport;
    use std::collections::BTreeMap;

    fn single_primary_map(pg: PgId, ordinal: i32) -> OsdMap {
        OsdMap::decode_full(OsdMapSnapshot {
            epoch: 1,
            pg_num: 8,
            osd_addr: BTreeMap::from([(ordinal, format!("10.0.0.{ordinal}:6800"))]),
            pg_primary: BTreeMap::from([(pg, ordinal)]),
        })
    }

    fn dispatcher_with_map(map: OsdMap) -> (Dispatcher, Arc<MockTransport>, Arc<RecordingMonitorClient>) {
        let state = Arc::new(SharedState::new(map));
        let transport = Arc::new(MockTransport::new());
        let monitor = Arc::new(RecordingMonitorClient::new());
        let dispatcher = Dispatcher::new(
            state,
            transport.clone() as Arc<dyn Transport>,
            monitor.clone() as Arc<dyn MonitorClient>,
            Duration::from_secs(30),
        );
        (dispatcher, transport, monitor)
    }

    #[test]
    fn start_request_registers_and_sends() {
        let pg = PgId { pool: 1, seed: 0 };
        let map = single_primary_map(pg, 3);
        let (dispatcher, transport, _monitor) = dispatcher_with_map(map);

        let request = test_request(0);
        let request = dispatcher.start_request(request, false).unwrap();

        assert_eq!(transport.sent_count_to("10.0.0.3:6800"), 1);
        assert_eq!(request.with_mutable(|m| m.routed_daemon), Some(3));
    }

    #[test]
    fn send_with_no_primary_requests_a_newer_map_and_succeeds() {
        let map = OsdMap::empty(8);
        let (dispatcher, transport, monitor) = dispatcher_with_map(map);

        let request = test_request(1);
        let result = dispatcher.send(&request);

        assert!(result.is_ok());
        assert_eq!(monitor.request_count(), 1);
        assert_eq!(transport.sent().len(), 0);
    }

    #[test]
    fn kick_requests_reroutes_after_map_change() {
        let pg = PgId { pool: 1, seed: 0 };
        let map = single_primary_map(pg, 3);
        let (dispatcher, transport, _monitor) = dispatcher_with_map(map);

        let request = test_request(2);
        let request = dispatcher.start_request(request, false).unwrap();
        assert_eq!(request.with_mutable(|m| m.routed_daemon), Some(3));

        let new_map = OsdMap::decode_full(OsdMapSnapshot {
            epoch: 2,
            pg_num: 8,
            osd_addr: BTreeMap::from([
                (3, "10.0.0.3:6800".to_string()),
                (5, "10.0.0.5:6800".to_string()),
            ]),
            pg_primary: BTreeMap::from([(pg, 5)]),
        });
        *dispatcher.state.map.write().unwrap() = new_map;

        dispatcher.kick_requests(None);

        assert_eq!(request.with_mutable(|m| m.routed_daemon), Some(5));
        assert!(request.with_mutable(|m| m.flags.contains(RequestFlags::RETRY)));
        assert_eq!(transport.sent_count_to("10.0.0.5:6800"), 1);
    }

    #[test]
    fn aborted_request_is_never_sent() {
        let pg = PgId { pool: 1, seed: 0 };
        let map = single_primary_map(pg, 3);
        let (dispatcher, transport, _monitor) = dispatcher_with_map(map);

        let request = test_request(3);
        dispatcher.abort(&request);

        let result = dispatcher.send(&request);
        assert!(result.is_ok());
        assert_eq!(transport.sent().len(), 0);
        assert!(request.is_done());
        assert!(request.is_safe());
    }
}
