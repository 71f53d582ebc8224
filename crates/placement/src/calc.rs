use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use osdc_protocol::oid::format_oid;
use osdc_protocol::PgId;

use crate::error::PlacementError;
use crate::layout::{FileLayout, Vino};
use crate::map::OsdMap;

/// Result of composing a file extent against a layout and the current map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLayout {
    /// Formatted object name (`"<inode-hex>.<blockno-hex08>"`).
    pub oid: String,
    /// Byte offset of the extent within the object.
    pub object_offset: u64,
    /// Length of the extent within the object; shortened to the object
    /// boundary if the caller's `plen` would have crossed it.
    pub object_length: u64,
    /// Placement group the object routes to.
    pub pg_id: PgId,
    /// Primary daemon ordinal, or `None` if the placement group currently
    /// has no up member ("no route yet").
    pub primary: Option<i32>,
}

/// Deterministic placement-group seed for an object name within a pool.
///
/// The real cluster's seed function is an external collaborator (§1); this
/// is a stand-in that only needs to be internally consistent, as the
/// round-trip and scenario tests in §8 depend on self-consistency, not on
/// matching any published algorithm.
fn pg_seed(oid: &str, pg_num: u32) -> u32 {
    if pg_num == 0 {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    oid.hash(&mut hasher);
    (hasher.finish() % u64::from(pg_num)) as u32
}

/// Composes `(file_layout, vino, off, plen, osd_map)` into a routed
/// [`ObjectLayout`], per §4.4.
///
/// `plen` is shortened to the end of the containing object when the
/// requested extent would otherwise cross an object boundary.
pub fn calc_object_layout(
    layout: &FileLayout,
    vino: Vino,
    off: u64,
    plen: u64,
    map: &OsdMap,
) -> Result<ObjectLayout, PlacementError> {
    if layout.object_size == 0 {
        return Err(PlacementError::ZeroObjectSize);
    }
    if plen == 0 {
        return Err(PlacementError::ZeroLength);
    }

    let block_no = layout.block_no(off);
    let object_offset = layout.object_offset(off);
    let room_in_object = layout.object_size - object_offset;
    let object_length = plen.min(room_in_object);

    let oid = format_oid(vino.ino, block_no);
    let seed = pg_seed(&oid, map.pg_num());
    let pg_id = PgId {
        pool: layout.pool,
        seed,
    };
    let primary = calc_pg_primary(pg_id, map);

    Ok(ObjectLayout {
        oid,
        object_offset,
        object_length,
        pg_id,
        primary,
    })
}

/// Looks up the current primary for a placement group, per §4.4.
///
/// Returns `None` (the spec's "-1, no route yet") when no member is up for
/// that placement group.
#[must_use]
pub fn calc_pg_primary(pg_id: PgId, map: &OsdMap) -> Option<i32> {
    map.pg_primary(pg_id)
}
