//! The Topology Control message
//! ([rfc3626 §9](https://datatracker.ietf.org/doc/html/rfc3626#section-9)).

use serde::{Deserialize, Serialize};

use crate::{node_id::NodeId, sequence_number::SeqNo};

/// Seconds a receiver should treat a TC's advertised links as valid.
pub const TC_VALIDITY_TIME: u16 = 15;

/// TC's flood the whole network.
pub const TC_TTL: u8 = 255;

/// A topology control message: the originator's MPR selector set, stamped
/// with the advertised neighbour sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tc {
    pub ansn: SeqNo,
    pub mpr_selectors: Vec<NodeId>,
}

impl Tc {
    /// Number of advertised selectors.
    pub fn selector_count(&self) -> usize {
        self.mpr_selectors.len()
    }
}
