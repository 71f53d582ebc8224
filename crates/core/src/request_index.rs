use std::collections::BTreeMap;

use crate::request::Request;

/// Key-ordered map from `tid` to request record (§4.2).
///
/// `BTreeMap` gives the `O(log n)` `lookup`/`lowest_ge`/`first` the spec
/// requires, plus in-order traversal for the kick protocol, with no
/// separate balancing logic to maintain.
#[derive(Default)]
pub(crate) struct RequestIndex {
    by_tid: BTreeMap<u64, Request>,
}

impl RequestIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts `request` under `tid`. A colliding `tid` is a bug: `tid`
    /// assignment is serialized and strictly increasing (§3), so a
    /// collision means the caller mis-assigned one.
    pub(crate) fn insert(&mut self, tid: u64, request: Request) {
        let previous = self.by_tid.insert(tid, request);
        assert!(previous.is_none(), "duplicate tid {tid} inserted into request index");
    }

    pub(crate) fn lookup(&self, tid: u64) -> Option<Request> {
        self.by_tid.get(&tid).cloned()
    }

    pub(crate) fn remove(&mut self, tid: u64) -> Option<Request> {
        self.by_tid.remove(&tid)
    }

    pub(crate) fn first(&self) -> Option<Request> {
        self.by_tid.values().next().cloned()
    }

    pub(crate) fn lowest_ge(&self, tid: u64) -> Option<Request> {
        self.by_tid.range(tid..).next().map(|(_, r)| r.clone())
    }

    /// All requests with `tid` in `[lo, hi)`, in tid order.
    pub(crate) fn range(&self, lo: u64, hi: u64) -> Vec<Request> {
        self.by_tid.range(lo..hi).map(|(_, r)| r.clone()).collect()
    }

    /// Every request, in tid order (the kick protocol's iteration order).
    pub(crate) fn in_order(&self) -> Vec<Request> {
        self.by_tid.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_tid.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_tid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{test_request, Request};

    fn request_with_tid(tid: u64) -> Request {
        test_request(tid)
    }

    #[test]
    #[should_panic(expected = "duplicate tid")]
    fn insert_panics_on_tid_collision() {
        let mut index = RequestIndex::new();
        index.insert(1, request_with_tid(1));
        index.insert(1, request_with_tid(1));
    }

    #[test]
    fn lowest_ge_returns_the_smallest_tid_not_below() {
        let mut index = RequestIndex::new();
        index.insert(10, request_with_tid(10));
        index.insert(12, request_with_tid(12));
        index.insert(20, request_with_tid(20));

        assert_eq!(index.lowest_ge(11).unwrap().tid(), 12);
        assert_eq!(index.lowest_ge(12).unwrap().tid(), 12);
        assert!(index.lowest_ge(21).is_none());
    }

    #[test]
    fn in_order_traversal_is_tid_ordered() {
        let mut index = RequestIndex::new();
        for tid in [30, 10, 20] {
            index.insert(tid, request_with_tid(tid));
        }
        let tids: Vec<u64> = index.in_order().iter().map(Request::tid).collect();
        assert_eq!(tids, vec![10, 20, 30]);
    }

    #[test]
    fn remove_drops_it_from_first_and_lookup() {
        let mut index = RequestIndex::new();
        index.insert(1, request_with_tid(1));
        assert!(index.remove(1).is_some());
        assert!(index.lookup(1).is_none());
        assert!(index.first().is_none());
    }
}
