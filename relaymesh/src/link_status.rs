//! Link codes exchanged in HELLO messages and tracked per neighbour.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Status of the link towards a neighbour, as sensed through HELLO exchange.
///
/// The discriminants match the on-air link codes, so conversion to and from
/// the transport representation is a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum LinkStatus {
    /// No information about the link yet.
    Unspecified = 0,
    /// We hear the neighbour but it has not yet confirmed hearing us.
    Asymmetric = 1,
    /// Both directions verified.
    Symmetric = 2,
    /// The link was lost.
    Lost = 3,
    /// Symmetric link to a neighbour this node selected as MPR.
    MprNeighbour = 4,
}

impl LinkStatus {
    /// Whether this status counts as a verified bidirectional link. MPR
    /// neighbours are symmetric by construction.
    pub const fn is_symmetric(&self) -> bool {
        matches!(self, LinkStatus::Symmetric | LinkStatus::MprNeighbour)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Unspecified => f.pad("unspec"),
            LinkStatus::Asymmetric => f.pad("asym"),
            LinkStatus::Symmetric => f.pad("sym"),
            LinkStatus::Lost => f.pad("lost"),
            LinkStatus::MprNeighbour => f.pad("mpr"),
        }
    }
}

/// Error returned when decoding an unknown link code from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLinkCode(pub u8);

impl fmt::Display for InvalidLinkCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("invalid link code {}", self.0))
    }
}

impl std::error::Error for InvalidLinkCode {}

impl TryFrom<u8> for LinkStatus {
    type Error = InvalidLinkCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LinkStatus::Unspecified),
            1 => Ok(LinkStatus::Asymmetric),
            2 => Ok(LinkStatus::Symmetric),
            3 => Ok(LinkStatus::Lost),
            4 => Ok(LinkStatus::MprNeighbour),
            other => Err(InvalidLinkCode(other)),
        }
    }
}

impl From<LinkStatus> for u8 {
    fn from(value: LinkStatus) -> Self {
        value as u8
    }
}

#[cfg(test)]
mod tests {
    use super::LinkStatus;

    #[test]
    fn symmetric_statuses() {
        assert!(LinkStatus::Symmetric.is_symmetric());
        assert!(LinkStatus::MprNeighbour.is_symmetric());
        assert!(!LinkStatus::Asymmetric.is_symmetric());
        assert!(!LinkStatus::Lost.is_symmetric());
        assert!(!LinkStatus::Unspecified.is_symmetric());
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert!(LinkStatus::try_from(2).is_ok());
        assert!(LinkStatus::try_from(5).is_err());
    }
}
