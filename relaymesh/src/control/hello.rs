//! The HELLO beacon ([rfc3626 §6](https://datatracker.ietf.org/doc/html/rfc3626#section-6)),
//! extended with the TDMA slot piggy-back.

use serde::{Deserialize, Serialize};

use crate::{link_status::LinkStatus, node_id::NodeId, slot::Slot, willingness::Willingness};

/// Seconds a receiver should treat a HELLO's content as valid.
pub const HELLO_VALIDITY_TIME: u16 = 6;

/// HELLO's never travel further than the direct neighbourhood.
pub const HELLO_TTL: u8 = 1;

/// One advertised neighbour in a [`Hello`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HelloNeighbour {
    pub id: NodeId,
    pub link_code: LinkStatus,
}

/// One advertised two-hop neighbour in a [`Hello`], with the slot the sender
/// believes it has reserved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HelloTwoHop {
    pub two_hop_id: NodeId,
    pub via_id: NodeId,
    pub reserved_slot: Slot,
}

/// A HELLO beacon: snapshot of the sender's neighbourhood, willingness and
/// TDMA reservation at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hello {
    /// The sender's beacon period in seconds.
    pub interval: u16,
    pub willingness: Willingness,
    /// The sender's own slot reservation.
    pub reserved_slot: Slot,
    pub neighbours: Vec<HelloNeighbour>,
    pub two_hop_neighbours: Vec<HelloTwoHop>,
}

impl Hello {
    /// Whether the sender lists the given node in its neighbour set. This is
    /// the link symmetry test: hearing ourselves in a HELLO proves the
    /// reverse direction works.
    pub fn lists(&self, id: NodeId) -> bool {
        self.neighbours.iter().any(|n| n.id == id)
    }

    /// Whether the sender advertises the given node with the MPR link code,
    /// i.e. the sender selected that node as one of its multipoint relays.
    pub fn selects_as_mpr(&self, id: NodeId) -> bool {
        self.neighbours
            .iter()
            .any(|n| n.id == id && n.link_code == LinkStatus::MprNeighbour)
    }
}

#[cfg(test)]
mod tests {
    use super::{Hello, HelloNeighbour};
    use crate::{link_status::LinkStatus, node_id::NodeId, slot::Slot, willingness::Willingness};

    fn hello_with(neighbours: Vec<HelloNeighbour>) -> Hello {
        Hello {
            interval: 2,
            willingness: Willingness::DEFAULT,
            reserved_slot: Slot::None,
            neighbours,
            two_hop_neighbours: vec![],
        }
    }

    #[test]
    fn lists_checks_any_link_code() {
        let hello = hello_with(vec![
            HelloNeighbour {
                id: NodeId::new(1),
                link_code: LinkStatus::Asymmetric,
            },
            HelloNeighbour {
                id: NodeId::new(2),
                link_code: LinkStatus::MprNeighbour,
            },
        ]);

        assert!(hello.lists(NodeId::new(1)));
        assert!(hello.lists(NodeId::new(2)));
        assert!(!hello.lists(NodeId::new(3)));
    }

    #[test]
    fn mpr_selection_requires_mpr_link_code() {
        let hello = hello_with(vec![
            HelloNeighbour {
                id: NodeId::new(1),
                link_code: LinkStatus::Symmetric,
            },
            HelloNeighbour {
                id: NodeId::new(2),
                link_code: LinkStatus::MprNeighbour,
            },
        ]);

        assert!(!hello.selects_as_mpr(NodeId::new(1)));
        assert!(hello.selects_as_mpr(NodeId::new(2)));
    }
}
