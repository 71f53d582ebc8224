use bytes::{Buf, BufMut};

use crate::error::ProtocolError;

/// Placement-group identifier, as routed into a request header.
///
/// This is the wire shape only; computing one from a file layout and offset
/// is `osdc-placement`'s job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PgId {
    /// Pool the object lives in.
    pub pool: i64,
    /// Placement seed within the pool.
    pub seed: u32,
}

impl PgId {
    /// Wire size of a [`PgId`].
    pub const WIRE_SIZE: usize = 8 + 4;

    pub(crate) fn encode(self, buf: &mut impl BufMut) {
        buf.put_i64_le(self.pool);
        buf.put_u32_le(self.seed);
    }

    pub(crate) fn decode(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < Self::WIRE_SIZE {
            return Err(ProtocolError::Truncated {
                needed: Self::WIRE_SIZE,
                available: buf.remaining(),
            });
        }
        Ok(Self {
            pool: buf.get_i64_le(),
            seed: buf.get_u32_le(),
        })
    }
}

/// Wall-clock timestamp carried in a request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timespec {
    /// Seconds since the epoch.
    pub sec: i64,
    /// Nanoseconds within the second.
    pub nsec: i32,
}

impl Timespec {
    /// Wire size of a [`Timespec`].
    pub const WIRE_SIZE: usize = 8 + 4;

    pub(crate) fn encode(self, buf: &mut impl BufMut) {
        buf.put_i64_le(self.sec);
        buf.put_i32_le(self.nsec);
    }

    pub(crate) fn decode(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < Self::WIRE_SIZE {
            return Err(ProtocolError::Truncated {
                needed: Self::WIRE_SIZE,
                available: buf.remaining(),
            });
        }
        Ok(Self {
            sec: buf.get_i64_le(),
            nsec: buf.get_i32_le(),
        })
    }
}

/// Opaque server-echoed token that makes a write idempotent at the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReassertVersion {
    /// Monotonic version assigned by the daemon on the previous attempt.
    pub version: u64,
    /// Map epoch the version was assigned under.
    pub epoch: u32,
}

impl ReassertVersion {
    /// Wire size of a [`ReassertVersion`].
    pub const WIRE_SIZE: usize = 8 + 4;

    pub(crate) fn encode(self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.version);
        buf.put_u32_le(self.epoch);
    }

    pub(crate) fn decode(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        if buf.remaining() < Self::WIRE_SIZE {
            return Err(ProtocolError::Truncated {
                needed: Self::WIRE_SIZE,
                available: buf.remaining(),
            });
        }
        Ok(Self {
            version: buf.get_u64_le(),
            epoch: buf.get_u32_le(),
        })
    }
}
