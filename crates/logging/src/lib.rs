#![deny(unsafe_code)]
#![deny(missing_docs)]

//! # Overview
//!
//! `osdc_logging` is a thin `tracing` bridge: it owns process-wide
//! subscriber initialization and a `Verbosity` level the rest of the
//! workspace maps its log calls onto, mirroring the teacher's `logging`
//! crate ("Logging and verbosity flag system for info and debug output
//! control").
//!
//! # Design
//!
//! Every thread of control in `osdc-core` (caller, dispatcher, reply
//! handler, map handler, timeout worker) logs through `tracing`
//! spans/events directly; this crate only owns turning a configured
//! [`Verbosity`] into an installed subscriber via [`init`].
//!
//! # Examples
//!
//! ```
//! use osdc_logging::Verbosity;
//!
//! let verbosity = Verbosity::from_occurrences(2);
//! assert_eq!(verbosity, Verbosity::Debug);
//! ```

use tracing_subscriber::EnvFilter;

/// Logging verbosity, coarser than `tracing`'s own level but easier for a
/// caller to set from a single count of `-v` flags or a config tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Warnings and errors only.
    #[default]
    Quiet,
    /// Adds informational state transitions (map swaps, session lifecycle).
    Info,
    /// Adds per-request tracing (registration, routing, completion).
    Debug,
}

impl Verbosity {
    /// Maps a repeated-flag count (as in `-v`, `-vv`) onto a verbosity level.
    #[must_use]
    pub const fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Self::Quiet,
            1 => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Returns the `tracing_subscriber` filter directive for this level.
    #[must_use]
    pub const fn filter_directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// Installs a process-wide `tracing` subscriber at the given verbosity.
///
/// Safe to call more than once; later calls are no-ops (mirrors
/// `tracing_subscriber::fmt().try_init()`'s idempotence).
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_occurrences_maps_flag_counts() {
        assert_eq!(Verbosity::from_occurrences(0), Verbosity::Quiet);
        assert_eq!(Verbosity::from_occurrences(1), Verbosity::Info);
        assert_eq!(Verbosity::from_occurrences(2), Verbosity::Debug);
        assert_eq!(Verbosity::from_occurrences(9), Verbosity::Debug);
    }

    #[test]
    fn verbosity_orders_quiet_below_debug() {
        assert!(Verbosity::Quiet < Verbosity::Info);
        assert!(Verbosity::Info < Verbosity::Debug);
    }

    #[test]
    fn filter_directive_matches_level() {
        assert_eq!(Verbosity::Quiet.filter_directive(), "warn");
        assert_eq!(Verbosity::Info.filter_directive(), "info");
        assert_eq!(Verbosity::Debug.filter_directive(), "debug");
    }
}
