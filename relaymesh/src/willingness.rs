//! A node's willingness to carry traffic on behalf of other nodes, [as
//! defined in the OLSR rfc](https://datatracker.ietf.org/doc/html/rfc3626#section-18.8).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Willingness of a node to act as a multipoint relay.
///
/// The value is an integer in 0..=7. [`Willingness::NEVER`] excludes a node
/// from MPR selection entirely, [`Willingness::ALWAYS`] forces selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Willingness(u8);

impl Willingness {
    /// The node must never be selected as MPR.
    pub const NEVER: Willingness = Willingness(0);
    /// The node has little spare capacity.
    pub const LOW: Willingness = Willingness(1);
    /// Default willingness for nodes without specific constraints.
    pub const DEFAULT: Willingness = Willingness(3);
    /// The node has spare capacity, prefer it when breaking ties.
    pub const HIGH: Willingness = Willingness(6);
    /// The node must always be selected as MPR.
    pub const ALWAYS: Willingness = Willingness(7);

    /// Highest encodable willingness value.
    const MAX_RAW: u8 = 7;

    /// Create a `Willingness` from a raw value, clamping to the valid range.
    pub const fn new(value: u8) -> Self {
        if value > Self::MAX_RAW {
            Willingness(Self::MAX_RAW)
        } else {
            Willingness(value)
        }
    }
}

impl Default for Willingness {
    fn default() -> Self {
        Willingness::DEFAULT
    }
}

impl fmt::Display for Willingness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Willingness::NEVER => f.pad("never"),
            Willingness::ALWAYS => f.pad("always"),
            Willingness(v) => f.write_fmt(format_args!("{v}")),
        }
    }
}

impl From<u8> for Willingness {
    fn from(value: u8) -> Self {
        Willingness::new(value)
    }
}

impl From<Willingness> for u8 {
    fn from(value: Willingness) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::Willingness;

    #[test]
    fn ordering_follows_raw_value() {
        assert!(Willingness::NEVER < Willingness::LOW);
        assert!(Willingness::LOW < Willingness::DEFAULT);
        assert!(Willingness::DEFAULT < Willingness::HIGH);
        assert!(Willingness::HIGH < Willingness::ALWAYS);
    }

    #[test]
    fn out_of_range_values_clamp() {
        assert_eq!(Willingness::new(200), Willingness::ALWAYS);
    }
}
