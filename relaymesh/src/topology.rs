//! The topology database: advertised links learned from TC messages, each
//! stamped with the originator's ANSN and a validity deadline.

use core::fmt;

use tracing::{debug, trace};

use crate::{node_id::NodeId, sequence_number::SeqNo, shortest_path::MAX_NODES};

/// Capacity of the topology database: in the worst case every node advertises
/// a link towards every other node.
pub const MAX_TOPOLOGY_LINKS: usize = MAX_NODES * MAX_NODES;

/// Error returned when the topology database is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyTableFull;

impl fmt::Display for TopologyTableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("topology database is full")
    }
}

impl std::error::Error for TopologyTableFull {}

/// An advertised link in the network graph.
#[derive(Debug, Clone, Copy)]
pub struct TopologyLink {
    from: NodeId,
    to: NodeId,
    ansn: SeqNo,
    /// Absolute second at which this link stops being believable.
    validity: u64,
}

impl TopologyLink {
    /// The advertising endpoint of the link.
    pub fn from(&self) -> NodeId {
        self.from
    }

    /// The advertised endpoint of the link.
    pub fn to(&self) -> NodeId {
        self.to
    }

    /// The ANSN this link was last confirmed with.
    pub fn ansn(&self) -> SeqNo {
        self.ansn
    }

    /// Whether the link is still valid at time `now`.
    pub fn is_valid(&self, now: u64) -> bool {
        self.validity > now
    }
}

/// Bounded table of advertised links, keyed on the (from, to) pair.
#[derive(Debug, Default)]
pub struct TopologyTable {
    links: Vec<TopologyLink>,
}

impl TopologyTable {
    /// Create a new empty `TopologyTable`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored links, including ones past their validity which have
    /// not been swept yet.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the database holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Look up a link by its endpoints.
    pub fn get(&self, from: NodeId, to: NodeId) -> Option<&TopologyLink> {
        self.links.iter().find(|l| l.from == from && l.to == to)
    }

    /// Insert or update an advertised link.
    ///
    /// An existing (from, to) pair is only updated when the incoming ANSN is
    /// not older than the stored one; a regressed ANSN leaves the entry
    /// untouched. The stored ANSN is therefore always the newest ever
    /// observed from the originator for that pair.
    pub fn add_link(
        &mut self,
        from: NodeId,
        to: NodeId,
        ansn: SeqNo,
        validity: u64,
    ) -> Result<(), TopologyTableFull> {
        if let Some(link) = self
            .links
            .iter_mut()
            .find(|l| l.from == from && l.to == to)
        {
            if ansn.lt(&link.ansn) {
                trace!(
                    from = %from,
                    to = %to,
                    stored = %link.ansn,
                    received = %ansn,
                    "Ignoring topology update with stale ANSN"
                );
                return Ok(());
            }
            link.ansn = ansn;
            link.validity = validity;
            return Ok(());
        }

        if self.links.len() >= MAX_TOPOLOGY_LINKS {
            return Err(TopologyTableFull);
        }

        debug!(from = %from, to = %to, ansn = %ansn, "New topology link");
        self.links.push(TopologyLink {
            from,
            to,
            ansn,
            validity,
        });

        Ok(())
    }

    /// Iterate over links still valid at time `now`.
    pub fn valid_links(&self, now: u64) -> impl Iterator<Item = &TopologyLink> {
        self.links.iter().filter(move |l| l.is_valid(now))
    }

    /// Whether the node appears as an endpoint of any valid link.
    pub fn knows_node(&self, id: NodeId, now: u64) -> bool {
        self.valid_links(now).any(|l| l.from == id || l.to == id)
    }

    /// Drop links whose validity has passed. Returns the number removed; a
    /// non-zero result means the topology changed and routes must be
    /// recomputed.
    pub fn cleanup_expired(&mut self, now: u64) -> usize {
        let before = self.links.len();
        self.links.retain(|l| l.is_valid(now));
        let removed = before - self.links.len();
        if removed > 0 {
            debug!(removed, "Expired topology links");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::TopologyTable;
    use crate::{node_id::NodeId, sequence_number::SeqNo};

    #[test]
    fn newer_ansn_updates_link() {
        let mut table = TopologyTable::new();
        let (a, b) = (NodeId::new(0x0A000030), NodeId::new(0x0A000031));

        table.add_link(a, b, SeqNo::from(10), 100).unwrap();
        table.add_link(a, b, SeqNo::from(11), 200).unwrap();

        let link = table.get(a, b).unwrap();
        assert_eq!(link.ansn(), SeqNo::from(11));
        assert!(link.is_valid(150));
    }

    /// An update with a regressed ANSN leaves the entry unchanged.
    #[test]
    fn stale_ansn_is_ignored() {
        let mut table = TopologyTable::new();
        let (a, b) = (NodeId::new(0x0A000030), NodeId::new(0x0A000031));

        table.add_link(a, b, SeqNo::from(10), 100).unwrap();
        table.add_link(a, b, SeqNo::from(9), 500).unwrap();

        let link = table.get(a, b).unwrap();
        assert_eq!(link.ansn(), SeqNo::from(10));
        assert!(!link.is_valid(150));
    }

    /// Re-advertising with the same ANSN refreshes the validity.
    #[test]
    fn equal_ansn_refreshes_validity() {
        let mut table = TopologyTable::new();
        let (a, b) = (NodeId::new(1), NodeId::new(2));

        table.add_link(a, b, SeqNo::from(10), 100).unwrap();
        table.add_link(a, b, SeqNo::from(10), 300).unwrap();

        assert!(table.get(a, b).unwrap().is_valid(200));
    }

    /// After a sweep at time t every remaining link is valid past t.
    #[test]
    fn cleanup_leaves_only_valid_links() {
        let mut table = TopologyTable::new();
        table
            .add_link(NodeId::new(1), NodeId::new(2), SeqNo::from(1), 50)
            .unwrap();
        table
            .add_link(NodeId::new(1), NodeId::new(3), SeqNo::from(1), 200)
            .unwrap();

        assert_eq!(table.cleanup_expired(100), 1);
        assert_eq!(table.len(), 1);
        assert!(table.valid_links(100).all(|l| l.is_valid(100)));
        // Idempotent when nothing else expired.
        assert_eq!(table.cleanup_expired(100), 0);
    }

    #[test]
    fn knows_node_checks_both_endpoints() {
        let mut table = TopologyTable::new();
        table
            .add_link(NodeId::new(1), NodeId::new(2), SeqNo::from(1), 100)
            .unwrap();

        assert!(table.knows_node(NodeId::new(1), 0));
        assert!(table.knows_node(NodeId::new(2), 0));
        assert!(!table.knows_node(NodeId::new(3), 0));
        // Expired links don't count.
        assert!(!table.knows_node(NodeId::new(1), 100));
    }
}
