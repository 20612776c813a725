use shared::TimeUnit;
use std::time::Duration;

/// What the store knows about a key's time-to-live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyTtl {
    Missing,
    Persistent,
    Expires(Duration),
}

impl KeyTtl {
    pub const MISSING: i64 = -2;
    pub const PERSISTENT: i64 = 0;

    /// Remaining lifetime in `unit`, using the store-native sentinels:
    /// `0` for no expiration and `-2` for a missing key.
    pub fn in_unit(self, unit: TimeUnit) -> i64 {
        match self {
            KeyTtl::Missing => Self::MISSING,
            KeyTtl::Persistent => Self::PERSISTENT,
            KeyTtl::Expires(remaining) => unit.from_duration_ceil(remaining),
        }
    }
}

/// Typed sentinel for a store interaction that failed and was suppressed.
///
/// The cause is logged where the failure is caught; callers only learn which
/// operation did not complete.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("cache operation '{op}' failed")]
pub struct SoftFailure {
    pub op: &'static str,
}

impl SoftFailure {
    pub fn new(op: &'static str) -> Self {
        Self { op }
    }
}

/// Result of a facade operation whose failures are suppressed.
pub type Soft<T> = std::result::Result<T, SoftFailure>;
