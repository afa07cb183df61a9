use thiserror::Error;

/// Errors returned by [`crate::BucketedCuckooSet`] construction and insertion.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuckooSetError {
    /// Allocating (or reallocating, during a widen/grow) the bucket array failed.
    #[error("allocation failed while building or resizing the set")]
    OutOfMemory,

    /// `logsize` was rejected because it exceeds the supported maximum.
    #[error("logsize {0} exceeds the maximum of 32")]
    TooBig(u32),

    /// A fingerprint could not be placed even after widening/growing the set.
    /// The set is left with the fingerprint's eviction victim lost; the caller
    /// should rebuild the set from the source data with a different hash seed.
    #[error("fingerprint could not be placed; rebuild the set with a new hash seed")]
    Unplaceable,
}

/// Construction-time hint for the membership-probe kernel.
///
/// The core only ships a portable scalar branchless probe today; this hint is
/// threaded through so a future SIMD kernel can be selected without breaking
/// the public API. CPU-feature detection itself stays an external concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimdPreference {
    /// Use the fastest probe available (currently always scalar).
    #[default]
    Auto,
    /// Force the portable scalar probe.
    ForceScalar,
}
