//! The one-hop neighbour set, maintained from received HELLO's.

use core::fmt;

use tracing::{debug, info};

use crate::{link_status::LinkStatus, node_id::NodeId, willingness::Willingness};

/// Capacity of the neighbour table.
pub const MAX_NEIGHBOURS: usize = 40;

/// Seconds of HELLO silence after which a neighbour is considered lost.
pub const NEIGHBOUR_HOLD_TIME: u64 = 6;

/// Error returned when the neighbour table is at capacity. The new entry is
/// dropped, existing entries are untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighbourTableFull;

impl fmt::Display for NeighbourTableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("neighbour table is full")
    }
}

impl std::error::Error for NeighbourTableFull {}

/// A single one-hop neighbour.
#[derive(Debug, Clone)]
pub struct Neighbour {
    id: NodeId,
    link_status: LinkStatus,
    willingness: Willingness,
    /// Last time any update touched this entry.
    last_seen: u64,
    /// Last time a HELLO from this neighbour was processed. Drives the
    /// timeout scan.
    last_hello_time: u64,
    is_mpr: bool,
    is_mpr_selector: bool,
}

impl Neighbour {
    /// The neighbour's node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The sensed status of the link towards this neighbour.
    pub fn link_status(&self) -> LinkStatus {
        self.link_status
    }

    /// The neighbour's advertised willingness.
    pub fn willingness(&self) -> Willingness {
        self.willingness
    }

    /// Whether this node selected the neighbour as multipoint relay.
    pub fn is_mpr(&self) -> bool {
        self.is_mpr
    }

    pub(crate) fn set_mpr(&mut self, is_mpr: bool) {
        self.is_mpr = is_mpr;
    }

    /// Whether the neighbour selected this node as one of its relays.
    pub fn is_mpr_selector(&self) -> bool {
        self.is_mpr_selector
    }

    pub(crate) fn set_mpr_selector(&mut self, is_selector: bool) {
        self.is_mpr_selector = is_selector;
    }

    /// Whether the link is symmetric.
    pub fn is_symmetric(&self) -> bool {
        self.link_status.is_symmetric()
    }

    /// Last time any update touched this entry.
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Whether the neighbour was heard recently enough to be considered
    /// alive at time `now`.
    pub fn is_live(&self, now: u64) -> bool {
        now.saturating_sub(self.last_hello_time) <= NEIGHBOUR_HOLD_TIME
    }

    /// Record that a HELLO from this neighbour was processed at `now`.
    pub(crate) fn refresh_hello(&mut self, now: u64) {
        self.last_hello_time = now;
        self.last_seen = now;
    }
}

/// Bounded table of one-hop neighbours.
#[derive(Debug, Default)]
pub struct NeighbourTable {
    entries: Vec<Neighbour>,
}

impl NeighbourTable {
    /// Create a new empty `NeighbourTable`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked neighbours.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a neighbour by id.
    pub fn get(&self, id: NodeId) -> Option<&Neighbour> {
        self.entries.iter().find(|n| n.id == id)
    }

    /// Look up a neighbour by id, mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Neighbour> {
        self.entries.iter_mut().find(|n| n.id == id)
    }

    /// Whether the given node is a known neighbour (any link status).
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Insert or update a neighbour. Updating refreshes link status,
    /// willingness and the last-seen stamp, but preserves the MPR flags:
    /// those are owned by the MPR engine and selector tracking.
    pub fn upsert(
        &mut self,
        id: NodeId,
        link_status: LinkStatus,
        willingness: Willingness,
        now: u64,
    ) -> Result<&mut Neighbour, NeighbourTableFull> {
        if let Some(pos) = self.entries.iter().position(|n| n.id == id) {
            let entry = &mut self.entries[pos];
            entry.link_status = link_status;
            entry.willingness = willingness;
            entry.last_seen = now;
            debug!(neighbour = %id, link = %link_status, "Updated neighbour");
            return Ok(entry);
        }

        if self.entries.len() >= MAX_NEIGHBOURS {
            return Err(NeighbourTableFull);
        }

        info!(neighbour = %id, link = %link_status, willingness = %willingness, "New neighbour");
        self.entries.push(Neighbour {
            id,
            link_status,
            willingness,
            last_seen: now,
            last_hello_time: now,
            is_mpr: false,
            is_mpr_selector: false,
        });

        Ok(self
            .entries
            .last_mut()
            .expect("Entry was pushed right above; qed"))
    }

    /// Remove a neighbour, returning the removed entry if it existed.
    pub fn remove(&mut self, id: NodeId) -> Option<Neighbour> {
        let pos = self.entries.iter().position(|n| n.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Ids of neighbours whose HELLO silence exceeds
    /// [`NEIGHBOUR_HOLD_TIME`] at time `now`.
    pub fn expired(&self, now: u64) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|n| !n.is_live(now))
            .map(|n| n.id)
            .collect()
    }

    /// Iterate over all neighbours.
    pub fn iter(&self) -> impl Iterator<Item = &Neighbour> {
        self.entries.iter()
    }

    /// Iterate over all neighbours, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Neighbour> {
        self.entries.iter_mut()
    }

    /// Iterate over neighbours with a symmetric link.
    pub fn symmetric(&self) -> impl Iterator<Item = &Neighbour> {
        self.entries.iter().filter(|n| n.is_symmetric())
    }

    /// Number of neighbours which selected this node as MPR.
    pub fn mpr_selector_count(&self) -> usize {
        self.entries.iter().filter(|n| n.is_mpr_selector).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{NeighbourTable, MAX_NEIGHBOURS, NEIGHBOUR_HOLD_TIME};
    use crate::{link_status::LinkStatus, node_id::NodeId, willingness::Willingness};

    #[test]
    fn upsert_updates_in_place() {
        let mut table = NeighbourTable::new();
        let id = NodeId::new(0x0A000002);

        table
            .upsert(id, LinkStatus::Asymmetric, Willingness::DEFAULT, 0)
            .unwrap();
        table
            .upsert(id, LinkStatus::Symmetric, Willingness::HIGH, 1)
            .unwrap();

        assert_eq!(table.len(), 1);
        let entry = table.get(id).unwrap();
        assert_eq!(entry.link_status(), LinkStatus::Symmetric);
        assert_eq!(entry.willingness(), Willingness::HIGH);
    }

    /// MPR flags survive a regular upsert: they are managed by the MPR
    /// engine, not by HELLO bookkeeping.
    #[test]
    fn upsert_preserves_mpr_flags() {
        let mut table = NeighbourTable::new();
        let id = NodeId::new(0x0A000002);

        table
            .upsert(id, LinkStatus::Symmetric, Willingness::DEFAULT, 0)
            .unwrap();
        table.get_mut(id).unwrap().set_mpr(true);
        table.get_mut(id).unwrap().set_mpr_selector(true);

        table
            .upsert(id, LinkStatus::Symmetric, Willingness::DEFAULT, 5)
            .unwrap();

        let entry = table.get(id).unwrap();
        assert!(entry.is_mpr());
        assert!(entry.is_mpr_selector());
    }

    /// Filling the table to capacity and adding one more rejects the new
    /// entry and leaves the existing ones intact.
    #[test]
    fn capacity_limit_rejects_new_entries() {
        let mut table = NeighbourTable::new();
        for i in 0..MAX_NEIGHBOURS {
            table
                .upsert(
                    NodeId::new(i as u32 + 1),
                    LinkStatus::Symmetric,
                    Willingness::DEFAULT,
                    0,
                )
                .unwrap();
        }

        assert!(table
            .upsert(
                NodeId::new(0xFFFF),
                LinkStatus::Symmetric,
                Willingness::DEFAULT,
                0
            )
            .is_err());
        assert_eq!(table.len(), MAX_NEIGHBOURS);
        assert!(table.contains(NodeId::new(1)));
        assert!(table.contains(NodeId::new(MAX_NEIGHBOURS as u32)));
    }

    #[test]
    fn silence_past_hold_time_expires() {
        let mut table = NeighbourTable::new();
        let id = NodeId::new(0x0A000002);
        table
            .upsert(id, LinkStatus::Symmetric, Willingness::DEFAULT, 0)
            .unwrap();

        assert!(table.expired(NEIGHBOUR_HOLD_TIME).is_empty());
        assert_eq!(table.expired(NEIGHBOUR_HOLD_TIME + 1), vec![id]);

        // A refreshed hello resets the deadline.
        table.get_mut(id).unwrap().refresh_hello(5);
        assert!(table.expired(NEIGHBOUR_HOLD_TIME + 1).is_empty());
    }
}
