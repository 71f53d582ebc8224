#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `osdc_core` is the object-storage-device client itself: the request
//! record, the tid-keyed request index, the daemon session registry, the
//! dispatcher, the reply handler, the map handler, the timeout worker, and
//! the top-level [`client::Client`] facade (§2-§4 of the governing
//! specification).
//!
//! # Design
//!
//! - [`request::Request`] is a reference-counted record shared between the
//!   request index, the daemon registry's session list, and whatever caller
//!   is waiting on it; [`builder::build`] composes one from a
//!   [`osdc_placement::FileLayout`]/[`osdc_placement::Vino`] pair.
//! - [`inner::SharedState`] bundles the map lock and the request mutex
//!   behind the total lock order the spec requires: `map` is always
//!   acquired before `locked`.
//! - [`dispatcher::Dispatcher`] owns `start_request`/`send`/`map_osds`/
//!   `kick_requests`/`abort`; [`reply::ReplyHandler`] and [`map::MapHandler`]
//!   are the two inbound-event entry points; [`timeout::TimeoutWorker`] is
//!   the background sweep.
//! - [`client::Client`] is the only type most callers need: `init`,
//!   `readpages`, `writepages`, `sync`, `abort`, `wait`, `stop`.
//!
//! # Invariants
//!
//! - Lock order is always `map` before `locked` (§5); nothing in this
//!   crate acquires them in the opposite order.
//! - A request's completion signals (`done`, `safe`) fire at most once each
//!   and are safe to wait on without holding any lock.
//!
//! # Errors
//!
//! Facade-level failures are reported through [`error::ClientError`], one
//! variant per row of the error taxonomy.

/// Composes a layout, op list and flag set into a [`request::Request`].
mod builder;
/// Wires the transport callback edge (replies and resets) into the core.
mod callbacks;
/// The daemon session registry (§4.3).
mod daemon_registry;
/// Dispatcher: `start_request`, `send`, `map_osds`, `kick_requests`, `abort` (§4.5).
mod dispatcher;
/// Client-facing error type (§7).
pub mod error;
/// Shared state bundling the map lock and the request mutex (§5).
mod inner;
/// Map handler: applies incremental and full map updates (§4.7).
mod map;
/// The external monitor-client seam (§1).
pub mod monitor;
/// Reply handler: applies one decoded inbound reply (§4.6).
mod reply;
/// The request record and its completion signals (§3, §4.1).
mod request;
/// The tid-keyed request index (§4.2).
mod request_index;
/// Background timeout sweep (§4.8).
mod timeout;

/// Client-session configuration (`osd_timeout`, pool sizing, session identity).
pub mod config;
/// The top-level client facade (§4.9).
pub mod client;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use daemon_registry::SessionSummary;
pub use error::ClientError;
pub use map::MapUpdate;
pub use monitor::{MonitorClient, NullMonitorClient, RecordingMonitorClient};
pub use request::Request;

/// Re-exported so a consumer wiring this client into an application does
/// not need a separate direct dependency just to call `logging::init`.
pub use osdc_logging as logging;
