#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `osdc_placement` stands in for the two externally owned collaborators the
//! client core treats as out of scope: the osd-map decoder and the placement
//! function (`calc_object_layout`, `calc_pg_primary`, `apply_incremental`,
//! `decode_full`).
//!
//! # Design
//!
//! - [`layout::FileLayout`] and [`layout::Vino`] describe what a caller asks
//!   to read or write; [`calc::calc_object_layout`] turns that, plus the
//!   current [`map::OsdMap`], into a routed [`calc::ObjectLayout`].
//! - [`map::OsdMap`] is replaced wholesale by [`map::OsdMap::decode_full`] or
//!   advanced one epoch at a time by [`map::OsdMap::apply_incremental`];
//!   both are the only ways a map changes.
//!
//! # Invariants
//!
//! - An [`map::OsdMap`]'s epoch only ever increases.
//! - Applying a contiguous run of incrementals produces the same map as
//!   decoding the equivalent full snapshot (exercised in
//!   `osdc-core`'s integration tests).
//!
//! # Errors
//!
//! Layout failures are reported through [`error::PlacementError`].

/// Pure placement-group routing, composed from [`layout`] and [`map`].
pub mod calc;
/// Errors produced while computing a layout or applying a map update.
pub mod error;
/// File-layout and volume-inode identity types a caller supplies.
pub mod layout;
/// The osd map: membership and placement-group primaries.
pub mod map;

pub use calc::{calc_object_layout, calc_pg_primary, ObjectLayout};
pub use error::PlacementError;
pub use layout::{FileLayout, Vino, NOSNAP};
pub use map::{OsdMap, OsdMapIncremental, OsdMapSnapshot};
pub use osdc_protocol::PgId;
