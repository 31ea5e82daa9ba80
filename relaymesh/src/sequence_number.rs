//! Dedicated logic for message sequence numbers and the advertised neighbour
//! sequence number (ANSN), [as defined in the OLSR
//! rfc](https://datatracker.ietf.org/doc/html/rfc3626#section-18.4).

use core::fmt;
use core::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// This value is compared against when deciding if a `SeqNo` is larger or
/// smaller, per the wraparound rule of the OLSR rfc.
const SEQNO_COMPARE_TRESHOLD: u16 = 32_768;

/// A 16 bit wrapping sequence number.
///
/// Used both for the per-node message sequence counter stamped on every
/// generated HELLO and TC, and for the ANSN carried in TC messages.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeqNo(u16);

impl SeqNo {
    /// Create a new `SeqNo` with the default value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom ordering as defined by the rfc's wraparound rule. Note that we
    /// don't implement the [`PartialOrd`](std::cmp::PartialOrd) trait, as the
    /// contract on that trait specifically defines that it is transitive,
    /// which is clearly not the case here.
    pub fn lt(&self, other: &Self) -> bool {
        if self.0 == other.0 {
            false
        } else {
            other.0.wrapping_sub(self.0) < SEQNO_COMPARE_TRESHOLD
        }
    }

    /// Inverse comparison of [`SeqNo::lt`], with the same wraparound
    /// semantics and the same quirk for values exactly 32_768 apart.
    pub fn gt(&self, other: &Self) -> bool {
        if self.0 == other.0 {
            false
        } else {
            other.0.wrapping_sub(self.0) > SEQNO_COMPARE_TRESHOLD
        }
    }

    /// Advance the counter by one, wrapping on overflow, and return the new
    /// value. Generators call this once per emitted message.
    pub fn bump(&mut self) -> SeqNo {
        self.0 = self.0.wrapping_add(1);
        *self
    }
}

impl fmt::Display for SeqNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}", self.0))
    }
}

impl From<u16> for SeqNo {
    fn from(value: u16) -> Self {
        SeqNo(value)
    }
}

impl From<SeqNo> for u16 {
    fn from(value: SeqNo) -> Self {
        value.0
    }
}

impl Add<u16> for SeqNo {
    type Output = Self;

    fn add(self, rhs: u16) -> Self::Output {
        SeqNo(self.0.wrapping_add(rhs))
    }
}

impl AddAssign<u16> for SeqNo {
    fn add_assign(&mut self, rhs: u16) {
        *self = SeqNo(self.0.wrapping_add(rhs))
    }
}
