use std::collections::BTreeMap;

use osdc_protocol::PgId;

/// Versioned snapshot of cluster membership and placement-group primaries.
///
/// Opaque to the client core beyond `epoch`, `osd_addr`, and the two
/// placement primitives; replaced atomically under the map lock, never
/// mutated in place by anything outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdMap {
    epoch: u32,
    pg_num: u32,
    osd_addr: BTreeMap<i32, String>,
    pg_primary: BTreeMap<PgId, i32>,
}

/// A full map snapshot as handed to [`OsdMap::decode_full`].
///
/// Stands in for the byte-level decode this crate's real counterpart would
/// perform; the wire format itself is out of scope (§1), so this is the
/// already-decoded shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OsdMapSnapshot {
    /// Epoch of this snapshot.
    pub epoch: u32,
    /// Placement groups per pool.
    pub pg_num: u32,
    /// Daemon addresses keyed by ordinal.
    pub osd_addr: BTreeMap<i32, String>,
    /// Placement-group primaries.
    pub pg_primary: BTreeMap<PgId, i32>,
}

/// A single incremental map update.
///
/// `epoch` must equal the current map's `epoch + 1` to apply; anything else
/// is ignored by [`OsdMap::apply_incremental`], matching the map handler's
/// contract in §4.7.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OsdMapIncremental {
    /// Epoch this increment advances the map to.
    pub epoch: u32,
    /// Daemon addresses that were added or changed in this epoch.
    pub osd_addr_up: BTreeMap<i32, String>,
    /// Daemon ordinals removed in this epoch.
    pub osd_addr_down: Vec<i32>,
    /// Placement-group primaries that were set or changed in this epoch.
    pub pg_primary_set: BTreeMap<PgId, i32>,
    /// Placement groups that lost a primary in this epoch.
    pub pg_primary_cleared: Vec<PgId>,
}

impl OsdMap {
    /// Builds an empty map at epoch 0, with no members and no routes.
    #[must_use]
    pub fn empty(pg_num: u32) -> Self {
        Self {
            epoch: 0,
            pg_num,
            osd_addr: BTreeMap::new(),
            pg_primary: BTreeMap::new(),
        }
    }

    /// Replaces the map wholesale with a decoded full snapshot.
    #[must_use]
    pub fn decode_full(snapshot: OsdMapSnapshot) -> Self {
        Self {
            epoch: snapshot.epoch,
            pg_num: snapshot.pg_num,
            osd_addr: snapshot.osd_addr,
            pg_primary: snapshot.pg_primary,
        }
    }

    /// The map's epoch.
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Number of placement groups configured for this map.
    #[must_use]
    pub const fn pg_num(&self) -> u32 {
        self.pg_num
    }

    /// Address of a daemon ordinal, if it is currently a member.
    #[must_use]
    pub fn osd_addr(&self, ordinal: i32) -> Option<&str> {
        self.osd_addr.get(&ordinal).map(String::as_str)
    }

    /// Current primary ordinal for a placement group, if any member is up.
    #[must_use]
    pub fn pg_primary(&self, pg: PgId) -> Option<i32> {
        self.pg_primary.get(&pg).copied()
    }

    /// Applies one incremental update.
    ///
    /// Per §4.7 step 3: applies only if `inc.epoch == self.epoch + 1`;
    /// otherwise the increment is ignored and `None` is returned (the map
    /// handler treats "ignored" as non-fatal, not an error).
    #[must_use]
    pub fn apply_incremental(&self, inc: &OsdMapIncremental) -> Option<Self> {
        if inc.epoch != self.epoch + 1 {
            return None;
        }

        let mut next = self.clone();
        next.epoch = inc.epoch;
        for ordinal in &inc.osd_addr_down {
            next.osd_addr.remove(ordinal);
        }
        for (ordinal, addr) in &inc.osd_addr_up {
            next.osd_addr.insert(*ordinal, addr.clone());
        }
        for pg in &inc.pg_primary_cleared {
            next.pg_primary.remove(pg);
        }
        for (pg, primary) in &inc.pg_primary_set {
            next.pg_primary.insert(*pg, *primary);
        }

        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg(seed: u32) -> PgId {
        PgId { pool: 1, seed }
    }

    #[test]
    fn apply_incremental_rejects_non_contiguous_epoch() {
        let map = OsdMap::empty(8);
        let inc = OsdMapIncremental {
            epoch: 5,
            ..Default::default()
        };
        assert!(map.apply_incremental(&inc).is_none());
    }

    #[test]
    fn apply_incremental_advances_membership_and_routing() {
        let map = OsdMap::empty(8);
        let inc = OsdMapIncremental {
            epoch: 1,
            osd_addr_up: BTreeMap::from([(3, "10.0.0.3:6800".to_string())]),
            pg_primary_set: BTreeMap::from([(pg(2), 3)]),
            ..Default::default()
        };
        let next = map.apply_incremental(&inc).unwrap();
        assert_eq!(next.epoch(), 1);
        assert_eq!(next.osd_addr(3), Some("10.0.0.3:6800"));
        assert_eq!(next.pg_primary(pg(2)), Some(3));
    }

    #[test]
    fn incremental_sequence_matches_equivalent_full_map() {
        let base = OsdMap::empty(8);
        let inc1 = OsdMapIncremental {
            epoch: 1,
            osd_addr_up: BTreeMap::from([(3, "10.0.0.3:6800".to_string())]),
            pg_primary_set: BTreeMap::from([(pg(2), 3)]),
            ..Default::default()
        };
        let inc2 = OsdMapIncremental {
            epoch: 2,
            osd_addr_up: BTreeMap::from([(5, "10.0.0.5:6800".to_string())]),
            pg_primary_set: BTreeMap::from([(pg(2), 5)]),
            ..Default::default()
        };

        let via_incrementals = base
            .apply_incremental(&inc1)
            .unwrap()
            .apply_incremental(&inc2)
            .unwrap();

        let via_full = OsdMap::decode_full(OsdMapSnapshot {
            epoch: 2,
            pg_num: 8,
            osd_addr: BTreeMap::from([
                (3, "10.0.0.3:6800".to_string()),
                (5, "10.0.0.5:6800".to_string()),
            ]),
            pg_primary: BTreeMap::from([(pg(2), 5)]),
        });

        assert_eq!(via_incrementals, via_full);
    }

    #[test]
    fn removing_a_daemon_clears_its_address() {
        let map = OsdMap::decode_full(OsdMapSnapshot {
            epoch: 1,
            pg_num: 8,
            osd_addr: BTreeMap::from([(3, "10.0.0.3:6800".to_string())]),
            pg_primary: BTreeMap::new(),
        });
        let inc = OsdMapIncremental {
            epoch: 2,
            osd_addr_down: vec![3],
            pg_primary_cleared: vec![pg(2)],
            ..Default::default()
        };
        let next = map.apply_incremental(&inc).unwrap();
        assert_eq!(next.osd_addr(3), None);
        assert_eq!(next.pg_primary(pg(2)), None);
    }
}
