//! Dot Timestamps
//!
//! Timestamps are raw milliseconds from an arbitrary epoch. Dots coming from
//! a recording carry the driver's own stamps; live dots use `Timestamp::now()`,
//! which measures from the first call in this process.

use std::sync::OnceLock;
use std::time::Instant;

/// Process-wide epoch for `Timestamp::now()`
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// A point in time, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from raw milliseconds.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Capture the current time relative to the process epoch.
    #[inline]
    pub fn now() -> Self {
        let epoch = EPOCH.get_or_init(Instant::now);
        Self(epoch.elapsed().as_millis() as u64)
    }

    /// Raw millisecond value.
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed since an earlier timestamp. Saturates at zero when
    /// `earlier` is actually later (out-of-order driver stamps).
    #[inline]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Check if this timestamp is after another.
    #[inline]
    pub fn is_after(&self, other: Timestamp) -> bool {
        self.0 > other.0
    }
}

impl serde::Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Timestamp(millis))
    }
}

/// A span of time, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(u64);

impl Duration {
    /// Create a duration from milliseconds.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Convert to milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Convert to a std duration.
    #[inline]
    pub fn to_std(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.0)
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs.0))
    }
}
