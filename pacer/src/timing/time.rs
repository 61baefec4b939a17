//! Logical time coordinates for the event queue.
//!
//! The scheduler's clock is a count of milliseconds since an arbitrary epoch
//! shared by every event in the queue (in practice the Unix epoch, since the
//! clock is fed from the wall clock). `Tick` is a point on that clock and
//! `Span` a signed distance between two points. Both are plain `i64` counts;
//! the types only keep the dimensional roles apart.

use core::fmt;
use core::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A point on the logical millisecond clock.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Tick(i64);

impl Tick {
    /// The clock epoch.
    pub const ZERO: Self = Self(0);

    /// Creates a tick from a raw millisecond count.
    #[inline]
    #[must_use]
    pub const fn new(ms: i64) -> Self {
        Self(ms)
    }

    /// Returns the underlying millisecond count.
    #[inline]
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

/// A signed span of logical milliseconds.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Span(i64);

impl Span {
    /// An empty span.
    pub const ZERO: Self = Self(0);

    /// Creates a span from a raw millisecond count.
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    /// Returns the underlying millisecond count.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Clamps negative spans to zero.
    #[inline]
    #[must_use]
    pub fn non_negative(self) -> Self {
        Self(self.0.max(0))
    }
}

impl Add<Span> for Tick {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Span) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub<Span> for Tick {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Span) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sub for Tick {
    type Output = Span;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Span(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
