/// Snapshot id meaning "the live, unsnapshotted head of the file".
pub const NOSNAP: u64 = u64::MAX;

/// Identity of the volume-inode a layout is being computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vino {
    /// Inode number.
    pub ino: u64,
    /// Snapshot id, or [`NOSNAP`] for the live head.
    pub snap: u64,
}

impl Vino {
    /// Returns `true` if this vino refers to the live head of the file.
    #[must_use]
    pub const fn is_head(self) -> bool {
        self.snap == NOSNAP
    }
}

/// A file's striping layout, snapshot-copied at request-build time.
///
/// Only the flat, one-object-per-stripe-unit case from the scenarios in
/// the testable-properties section is modelled: `object_size` is both the
/// size of an object and the stripe unit, so a byte offset maps to exactly
/// one object with no interleaving across multiple pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileLayout {
    /// Size in bytes of one object in the layout.
    pub object_size: u64,
    /// Pool the file's objects live in.
    pub pool: i64,
}

impl FileLayout {
    /// Returns the zero-based index of the object containing byte `off`.
    #[must_use]
    pub const fn block_no(&self, off: u64) -> u64 {
        off / self.object_size
    }

    /// Returns the byte offset of `off` within its containing object.
    #[must_use]
    pub const fn object_offset(&self, off: u64) -> u64 {
        off % self.object_size
    }
}
