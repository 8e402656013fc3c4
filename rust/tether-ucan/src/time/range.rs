use super::timestamp::Timestamp;
use std::{
    fmt,
    ops::{Bound, RangeBounds},
};

/// The validity window of a token or of a whole delegation chain.
///
/// The lower bound is the latest `nbf` seen so far and the upper bound the
/// earliest `exp`; intersecting the windows of every link yields the window
/// in which the chain as a whole is usable. Token fields only ever produce
/// [`Bound::Included`] or [`Bound::Unbounded`] ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Lower bound, from `nbf` fields.
    pub not_before: Bound<Timestamp>,

    /// Upper bound, from `exp` fields.
    pub expiration: Bound<Timestamp>,
}

/// Pick the tighter of two bounds, treating `Unbounded` as loosest.
fn tighter(a: Bound<Timestamp>, b: Bound<Timestamp>, pick: fn(Timestamp, Timestamp) -> Timestamp) -> Bound<Timestamp> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other,
        (Bound::Included(a), Bound::Included(b)) => Bound::Included(pick(a, b)),
        // Exclusive ends never come off the wire; fold them in conservatively.
        (Bound::Excluded(a), Bound::Excluded(b)) => Bound::Excluded(pick(a, b)),
        (Bound::Excluded(a), Bound::Included(b)) | (Bound::Included(b), Bound::Excluded(a)) => {
            if pick(a, b) == a {
                Bound::Excluded(a)
            } else {
                Bound::Included(b)
            }
        }
    }
}

impl TimeRange {
    /// A window with no constraints.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            not_before: Bound::Unbounded,
            expiration: Bound::Unbounded,
        }
    }

    /// A window from optional `nbf` and `exp` fields.
    #[must_use]
    pub const fn new(not_before: Option<Timestamp>, expiration: Option<Timestamp>) -> Self {
        Self {
            not_before: match not_before {
                Some(t) => Bound::Included(t),
                None => Bound::Unbounded,
            },
            expiration: match expiration {
                Some(t) => Bound::Included(t),
                None => Bound::Unbounded,
            },
        }
    }

    /// Whether any instant falls inside the window.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match (self.not_before, self.expiration) {
            (Bound::Included(nbf), Bound::Included(exp)) => nbf <= exp,
            _ => true,
        }
    }

    /// The overlap of two windows: the later lower bound, the earlier
    /// upper bound.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self {
            not_before: tighter(self.not_before, other.not_before, Timestamp::max),
            expiration: tighter(self.expiration, other.expiration, Timestamp::min),
        }
    }
}

impl RangeBounds<Timestamp> for TimeRange {
    fn start_bound(&self) -> Bound<&Timestamp> {
        match &self.not_before {
            Bound::Included(t) => Bound::Included(t),
            Bound::Excluded(t) => Bound::Excluded(t),
            Bound::Unbounded => Bound::Unbounded,
        }
    }

    fn end_bound(&self) -> Bound<&Timestamp> {
        match &self.expiration {
            Bound::Included(t) => Bound::Included(t),
            Bound::Excluded(t) => Bound::Excluded(t),
            Bound::Unbounded => Bound::Unbounded,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.not_before {
            Bound::Included(nbf) | Bound::Excluded(nbf) => write!(f, "{}", nbf.to_unix())?,
            Bound::Unbounded => {}
        }
        write!(f, "..")?;
        match self.expiration {
            Bound::Included(exp) => write!(f, "={}", exp.to_unix()),
            Bound::Excluded(exp) => write!(f, "{}", exp.to_unix()),
            Bound::Unbounded => Ok(()),
        }
    }
}
