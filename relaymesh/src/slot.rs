//! TDMA slot values as coordinated through HELLO piggy-backs.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A TDMA slot reservation, either a concrete slot index or no reservation.
///
/// The radio layer historically encoded "no reservation" as `-1`; that
/// sentinel only exists at the transport boundary ([`Slot::from_raw`] /
/// [`Slot::to_raw`]), inside the engine absence is carried by the type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Slot {
    /// No slot reserved.
    #[default]
    None,
    /// A reserved slot index.
    Reserved(u32),
}

impl Slot {
    /// Decode a raw transport value, mapping any negative value to
    /// [`Slot::None`].
    pub const fn from_raw(value: i32) -> Self {
        if value < 0 {
            Slot::None
        } else {
            Slot::Reserved(value as u32)
        }
    }

    /// Encode for the transport, using `-1` for [`Slot::None`].
    pub const fn to_raw(self) -> i32 {
        match self {
            Slot::None => -1,
            Slot::Reserved(v) => v as i32,
        }
    }

    /// Whether a slot is actually reserved.
    pub const fn is_reserved(&self) -> bool {
        matches!(self, Slot::Reserved(_))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::None => f.pad("-"),
            Slot::Reserved(v) => f.write_fmt(format_args!("{v}")),
        }
    }
}

impl From<i32> for Slot {
    fn from(value: i32) -> Self {
        Slot::from_raw(value)
    }
}

impl From<Slot> for i32 {
    fn from(value: Slot) -> Self {
        value.to_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::Slot;

    #[test]
    fn negative_raw_values_mean_no_reservation() {
        assert_eq!(Slot::from_raw(-1), Slot::None);
        assert_eq!(Slot::from_raw(-17), Slot::None);
        assert_eq!(Slot::from_raw(0), Slot::Reserved(0));
        assert_eq!(Slot::from_raw(5), Slot::Reserved(5));
    }

    #[test]
    fn raw_roundtrip() {
        assert_eq!(Slot::None.to_raw(), -1);
        assert_eq!(Slot::Reserved(12).to_raw(), 12);
        assert_eq!(Slot::from_raw(Slot::Reserved(12).to_raw()), Slot::Reserved(12));
    }
}
