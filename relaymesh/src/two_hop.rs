//! The two-hop neighbour set: which nodes are reachable through which
//! symmetric neighbours. This is the input the MPR selection covers.

use core::fmt;

use tracing::debug;

use crate::node_id::NodeId;

/// Capacity of the two-hop neighbour table.
pub const MAX_TWO_HOP_NEIGHBOURS: usize = 100;

/// Error returned when the two-hop table is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoHopTableFull;

impl fmt::Display for TwoHopTableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("two-hop neighbour table is full")
    }
}

impl std::error::Error for TwoHopTableFull {}

/// A (two-hop node, via one-hop neighbour) association.
#[derive(Debug, Clone, Copy)]
pub struct TwoHopNeighbour {
    two_hop_id: NodeId,
    via_id: NodeId,
    last_seen: u64,
}

impl TwoHopNeighbour {
    /// The node two hops out.
    pub fn two_hop_id(&self) -> NodeId {
        self.two_hop_id
    }

    /// The one-hop neighbour providing reach.
    pub fn via_id(&self) -> NodeId {
        self.via_id
    }
}

/// Bounded table of two-hop associations, keyed on the (two-hop, via) pair.
#[derive(Debug, Default)]
pub struct TwoHopTable {
    entries: Vec<TwoHopNeighbour>,
}

impl TwoHopTable {
    /// Create a new empty `TwoHopTable`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (two-hop, via) associations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no associations are known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add or refresh an association. The (two-hop, via) pair is the key: an
    /// existing pair only gets its last-seen stamp refreshed. Returns whether
    /// a new association was created, so callers can tell actual topology
    /// growth from a refresh.
    pub fn add(
        &mut self,
        two_hop_id: NodeId,
        via_id: NodeId,
        now: u64,
    ) -> Result<bool, TwoHopTableFull> {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.two_hop_id == two_hop_id && e.via_id == via_id)
        {
            entry.last_seen = now;
            return Ok(false);
        }

        if self.entries.len() >= MAX_TWO_HOP_NEIGHBOURS {
            return Err(TwoHopTableFull);
        }

        debug!(two_hop = %two_hop_id, via = %via_id, "New two-hop neighbour");
        self.entries.push(TwoHopNeighbour {
            two_hop_id,
            via_id,
            last_seen: now,
        });

        Ok(true)
    }

    /// Drop every association routed through the given one-hop neighbour.
    /// Returns the number removed. Called when a neighbour fails.
    pub fn remove_via(&mut self, via_id: NodeId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.via_id != via_id);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(via = %via_id, removed, "Dropped two-hop neighbours of failed neighbour");
        }
        removed
    }

    /// Drop associations not refreshed within `max_age` seconds. Returns the
    /// number removed.
    pub fn cleanup_expired(&mut self, now: u64, max_age: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| now.saturating_sub(e.last_seen) <= max_age);
        before - self.entries.len()
    }

    /// Iterate over all associations.
    pub fn iter(&self) -> impl Iterator<Item = &TwoHopNeighbour> {
        self.entries.iter()
    }

    /// Deduplicated two-hop node ids.
    pub fn two_hop_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.entries.iter().map(|e| e.two_hop_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Two-hop ids reachable through the given one-hop neighbour.
    pub fn reachable_via(&self, via_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.via_id == via_id)
            .map(|e| e.two_hop_id)
    }

    /// Number of distinct one-hop neighbours providing reach to the given
    /// two-hop node.
    pub fn path_count(&self, two_hop_id: NodeId) -> usize {
        self.entries
            .iter()
            .filter(|e| e.two_hop_id == two_hop_id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::{TwoHopTable, MAX_TWO_HOP_NEIGHBOURS};
    use crate::node_id::NodeId;

    #[test]
    fn add_deduplicates_on_pair() {
        let mut table = TwoHopTable::new();
        let two_hop = NodeId::new(0x0A000003);
        let via_a = NodeId::new(0x0A000002);
        let via_b = NodeId::new(0x0A000004);

        table.add(two_hop, via_a, 0).unwrap();
        table.add(two_hop, via_a, 5).unwrap();
        table.add(two_hop, via_b, 5).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.path_count(two_hop), 2);
        assert_eq!(table.two_hop_ids(), vec![two_hop]);
    }

    #[test]
    fn remove_via_drops_all_associations() {
        let mut table = TwoHopTable::new();
        let via = NodeId::new(0x0A000002);
        table.add(NodeId::new(0x0A000003), via, 0).unwrap();
        table.add(NodeId::new(0x0A000004), via, 0).unwrap();
        table
            .add(NodeId::new(0x0A000004), NodeId::new(0x0A000005), 0)
            .unwrap();

        assert_eq!(table.remove_via(via), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.path_count(NodeId::new(0x0A000004)), 1);
    }

    #[test]
    fn capacity_limit_is_enforced() {
        let mut table = TwoHopTable::new();
        let via = NodeId::new(1);
        for i in 0..MAX_TWO_HOP_NEIGHBOURS {
            table.add(NodeId::new(1000 + i as u32), via, 0).unwrap();
        }

        assert!(table.add(NodeId::new(9999), via, 0).is_err());
        // Refreshing an existing pair still works at capacity.
        assert!(table.add(NodeId::new(1000), via, 1).is_ok());
    }

    #[test]
    fn stale_entries_age_out() {
        let mut table = TwoHopTable::new();
        table.add(NodeId::new(3), NodeId::new(2), 0).unwrap();
        table.add(NodeId::new(4), NodeId::new(2), 10).unwrap();

        assert_eq!(table.cleanup_expired(16, 10), 1);
        assert_eq!(table.two_hop_ids(), vec![NodeId::new(4)]);
    }
}
