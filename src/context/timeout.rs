//! Bounded or unbounded time budgets.

use std::fmt;
use std::time::Duration;

/// A time budget.
///
/// `Unbounded` orders after every `Bounded` value, so `min` picks the
/// tighter budget without special cases. Variant order matters for the
/// derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Timeout {
    /// Finite budget. A zero duration means already expired.
    Bounded(Duration),
    /// Never expires.
    Unbounded,
}

impl Timeout {
    /// An already-expired budget.
    pub const ZERO: Timeout = Timeout::Bounded(Duration::ZERO);

    /// Build from milliseconds; any negative value means unbounded.
    pub fn from_millis(millis: i64) -> Self {
        match u64::try_from(millis) {
            Ok(millis) => Timeout::Bounded(Duration::from_millis(millis)),
            Err(_) => Timeout::Unbounded,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Timeout::Unbounded)
    }

    /// Whether nothing is left of this budget.
    pub fn is_expired(&self) -> bool {
        matches!(self, Timeout::Bounded(d) if d.is_zero())
    }

    /// The finite duration, if any.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Timeout::Bounded(d) => Some(*d),
            Timeout::Unbounded => None,
        }
    }

    /// Budget left after `elapsed`; bottoms out at zero.
    pub fn saturating_sub(self, elapsed: Duration) -> Self {
        match self {
            Timeout::Bounded(d) => Timeout::Bounded(d.saturating_sub(elapsed)),
            Timeout::Unbounded => Timeout::Unbounded,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::Bounded(duration)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Bounded(d) => write!(f, "{}ms", d.as_millis()),
            Timeout::Unbounded => write!(f, "infinite"),
        }
    }
}
