/// Request/reply flag bitset.
///
/// Stored as a plain `u32` newtype (rather than pulling in a bitflags crate)
/// because the value is transmitted on the wire verbatim and the workspace
/// only ever needs set/contains/union, not a derive-heavy flag type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct RequestFlags(u32);

impl RequestFlags {
    /// The request is a read.
    pub const READ: Self = Self(1 << 0);
    /// The request is a write.
    pub const WRITE: Self = Self(1 << 1);
    /// The response should not be sent until the write is durable.
    pub const ONDISK: Self = Self(1 << 2);
    /// The request is being resent after a reroute or send failure.
    pub const RETRY: Self = Self(1 << 3);
    /// Fast acknowledgement requested (set implicitly on the initial write response).
    pub const ACK: Self = Self(1 << 4);

    /// The empty flag set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a flag set from its raw wire representation.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw wire representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit set in `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of `self` and `other`.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Sets `other`'s bits in `self`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears `other`'s bits in `self`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for RequestFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
