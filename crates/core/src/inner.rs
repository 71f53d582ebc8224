use std::sync::{Mutex, RwLock};

use osdc_placement::OsdMap;

use crate::daemon_registry::DaemonRegistry;
use crate::request_index::RequestIndex;

/// Everything guarded by the shared `request_mutex` (§5): the request
/// index, the daemon registry, the tid counter, the live-count and the
/// timeout anchor. Bundled into one struct behind one `Mutex` because the
/// spec treats them as a single critical section throughout §4.5-§4.8.
pub(crate) struct Locked {
    pub index: RequestIndex,
    pub registry: DaemonRegistry,
    pub next_tid: u64,
    pub live_count: u64,
}

impl Locked {
    fn new() -> Self {
        Self {
            index: RequestIndex::new(),
            registry: DaemonRegistry::new(),
            next_tid: 1,
            live_count: 0,
        }
    }

    pub(crate) fn alloc_tid(&mut self) -> u64 {
        let tid = self.next_tid;
        self.next_tid += 1;
        tid
    }
}

/// Shared client state. `map` is the `map_lock` (multi-reader/single-writer,
/// §5); `locked` is the `request_mutex`. Lock order is always `map` before
/// `locked`, matching the spec's total order `map_lock` → `request_mutex`.
pub(crate) struct SharedState {
    pub map: RwLock<OsdMap>,
    pub locked: Mutex<Locked>,
}

impl SharedState {
    pub(crate) fn new(initial_map: OsdMap) -> Self {
        Self {
            map: RwLock::new(initial_map),
            locked: Mutex::new(Locked::new()),
        }
    }
}
