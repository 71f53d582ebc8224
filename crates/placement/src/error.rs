use thiserror::Error;

/// Errors produced while computing an object layout or applying a map update.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum PlacementError {
    /// A [`crate::layout::FileLayout`] had an object size of zero.
    #[error("file layout has a zero object size")]
    ZeroObjectSize,
    /// A read or write extent had zero length.
    #[error("requested extent has zero length")]
    ZeroLength,
}
