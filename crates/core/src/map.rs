use std::sync::Arc;

use osdc_placement::{OsdMap, OsdMapIncremental, OsdMapSnapshot};

use crate::dispatcher::Dispatcher;
use crate::inner::SharedState;
use crate::monitor::MonitorClient;

/// A decoded `MDS_MAP`/`OSD_MAP` payload: zero or more incrementals followed
/// by zero or more full maps (§4.7). Decoding the wire bytes themselves is
/// delegated to the external map decoder (§1); this is its already-decoded
/// shape, the same boundary `osdc-placement`'s `decode_full` draws.
#[derive(Debug, Clone, Default)]
pub struct MapUpdate {
    /// This client's cluster-unique filesystem identifier, as stamped by
    /// whoever built the update (matched against `expected_fsid` in
    /// [`MapHandler::handle_map_update`]).
    pub fsid: u64,
    /// Incremental updates, in epoch order.
    pub incrementals: Vec<OsdMapIncremental>,
    /// Full map snapshots; only the last, highest-epoch one is ever used.
    pub full_maps: Vec<OsdMapSnapshot>,
}

/// Applies incremental and full map updates, triggering mass resubmission
/// on a change (§4.7).
pub(crate) struct MapHandler {
    state: Arc<SharedState>,
    dispatcher: Arc<Dispatcher>,
    monitor: Arc<dyn MonitorClient>,
    expected_fsid: u64,
}

impl MapHandler {
    pub(crate) fn new(
        state: Arc<SharedState>,
        dispatcher: Arc<Dispatcher>,
        monitor: Arc<dyn MonitorClient>,
        expected_fsid: u64,
    ) -> Self {
        Self {
            state,
            dispatcher,
            monitor,
            expected_fsid,
        }
    }

    /// Entry point for a transport message carrying one or more map updates
    /// (§4.7).
    pub(crate) fn handle_map_update(&self, update: &MapUpdate) {
        if update.fsid != self.expected_fsid {
            tracing::warn!(
                fsid = update.fsid,
                expected = self.expected_fsid,
                "filesystem identifier mismatch, dropping map message"
            );
            return;
        }

        let mut map = self.state.map.write().unwrap();
        let mut changed = false;

        for incremental in &update.incrementals {
            match map.apply_incremental(incremental) {
                Some(next) => {
                    *map = next;
                    changed = true;
                }
                None => {
                    tracing::debug!(
                        epoch = incremental.epoch,
                        current = map.epoch(),
                        "ignoring non-contiguous incremental"
                    );
                }
            }
        }

        if !changed {
            if let Some(full) = update.full_maps.last() {
                if full.epoch > map.epoch() {
                    *map = OsdMap::decode_full(full.clone());
                    changed = true;
                }
            }
        }

        let epoch = map.epoch();
        drop(map);

        self.monitor.notify_epoch(epoch);
        if changed {
            tracing::info!(epoch, "osd map changed, kicking all requests");
            self.dispatcher.kick_requests(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::RecordingMonitorClient;
    use crate::request::test_request;
    use osdc_placement::PgId;
    use osdc_transport::mock::MockTransport;
    use osdc_transport::Transport;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn setup() -> (Arc<SharedState>, Arc<Dispatcher>, Arc<RecordingMonitorClient>) {
        let map = OsdMap::empty(8);
        let state = Arc::new(SharedState::new(map));
        let transport = Arc::new(MockTransport::new());
        let monitor = Arc::new(RecordingMonitorClient::new());
        let dispatcher = Arc::new(Dispatcher::new(
            state.clone(),
            transport as Arc<dyn Transport>,
            monitor.clone() as Arc<dyn MonitorClient>,
            Duration::from_secs(30),
        ));
        (state, dispatcher, monitor)
    }

    #[test]
    fn mismatched_fsid_is_dropped_without_changing_the_map() {
        let (state, dispatcher, monitor) = setup();
        let handler = MapHandler::new(state.clone(), dispatcher, monitor, 0xfeed);

        handler.handle_map_update(&MapUpdate {
            fsid: 0xbad,
            incrementals: vec![OsdMapIncremental {
                epoch: 1,
                ..Default::default()
            }],
            full_maps: vec![],
        });

        assert_eq!(state.map.read().unwrap().epoch(), 0);
    }

    #[test]
    fn contiguous_incremental_advances_the_map_and_kicks() {
        let (state, dispatcher, _monitor) = setup();
        let request = test_request(1);
        {
            let mut locked = state.locked.lock().unwrap();
            locked.index.insert(1, request.clone());
        }
        let handler = MapHandler::new(state.clone(), dispatcher, Arc::new(RecordingMonitorClient::new()), 0);

        handler.handle_map_update(&MapUpdate {
            fsid: 0,
            incrementals: vec![OsdMapIncremental {
                epoch: 1,
                osd_addr_up: BTreeMap::from([(0, "10.0.0.1:6800".to_string())]),
                pg_primary_set: BTreeMap::from([(PgId { pool: 1, seed: 0 }, 0)]),
                ..Default::default()
            }],
            full_maps: vec![],
        });

        assert_eq!(state.map.read().unwrap().epoch(), 1);
        assert_eq!(request.with_mutable(|m| m.routed_daemon), Some(0));
    }

    #[test]
    fn non_contiguous_incremental_is_ignored() {
        let (state, dispatcher, monitor) = setup();
        let handler = MapHandler::new(state.clone(), dispatcher, monitor, 0);

        handler.handle_map_update(&MapUpdate {
            fsid: 0,
            incrementals: vec![OsdMapIncremental {
                epoch: 5,
                ..Default::default()
            }],
            full_maps: vec![],
        });

        assert_eq!(state.map.read().unwrap().epoch(), 0);
    }

    #[test]
    fn full_map_is_used_only_when_no_incremental_applied_and_epoch_is_newer() {
        let (state, dispatcher, monitor) = setup();
        let handler = MapHandler::new(state.clone(), dispatcher, monitor, 0);

        handler.handle_map_update(&MapUpdate {
            fsid: 0,
            incrementals: vec![],
            full_maps: vec![
                OsdMapSnapshot {
                    epoch: 0,
                    ..Default::default()
                },
                OsdMapSnapshot {
                    epoch: 3,
                    pg_num: 8,
                    ..Default::default()
                },
            ],
        });

        assert_eq!(state.map.read().unwrap().epoch(), 3);
    }
}
