use thiserror::Error;

/// Rejected [`ResizePolicy`](crate::ResizePolicy) settings.
#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum PolicyError {
    #[error("initial capacity must be at least one bucket")]
    ZeroCapacity,
    #[error("load factors must be non-zero")]
    ZeroLoadFactor,
    #[error("tombstone ratio must be non-zero")]
    ZeroTombstoneRatio,
}
