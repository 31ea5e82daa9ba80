//! TDMA slot reservations learned through HELLO piggy-backs.
//!
//! Every HELLO carries the sender's own reservation plus the reservations of
//! its neighbourhood, giving each node a two-hop view of slot usage. The
//! radio layer queries this table before claiming a slot, which is what keeps
//! hidden-terminal collisions out of the schedule.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    neighbour::MAX_NEIGHBOURS, node_id::NodeId, slot::Slot, two_hop::MAX_TWO_HOP_NEIGHBOURS,
};

/// Seconds after which a reservation that was not re-announced is dropped.
pub const SLOT_RESERVATION_TIMEOUT: u64 = 30;

/// Capacity: every one-hop and two-hop neighbour can hold one reservation.
const MAX_RESERVATIONS: usize = MAX_NEIGHBOURS + MAX_TWO_HOP_NEIGHBOURS;

/// How far away the node owning a reservation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HopDistance {
    One,
    Two,
}

/// A slot reservation of some nearby node.
#[derive(Debug, Clone, Copy)]
pub struct Reservation {
    node: NodeId,
    slot: Slot,
    hop_distance: HopDistance,
    last_updated: u64,
}

impl Reservation {
    /// The node holding the reservation.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The reserved slot.
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Distance of the owning node.
    pub fn hop_distance(&self) -> HopDistance {
        self.hop_distance
    }
}

/// Table of slot reservations in the two-hop neighbourhood, keyed by node.
#[derive(Debug, Default)]
pub struct SlotTable {
    entries: Vec<Reservation>,
}

impl SlotTable {
    /// Create a new empty `SlotTable`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked reservations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no reservations are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record what a node announced about its slot. Announcing
    /// [`Slot::None`] clears any stored reservation for that node. A table at
    /// capacity silently drops new reservations; updates to known nodes
    /// always apply.
    pub fn update(&mut self, node: NodeId, slot: Slot, hop_distance: HopDistance, now: u64) {
        let pos = self.entries.iter().position(|r| r.node == node);

        match (slot, pos) {
            (Slot::None, Some(pos)) => {
                trace!(node = %node, "Cleared slot reservation");
                self.entries.swap_remove(pos);
            }
            (Slot::None, None) => {}
            (slot, Some(pos)) => {
                let entry = &mut self.entries[pos];
                entry.slot = slot;
                entry.hop_distance = hop_distance;
                entry.last_updated = now;
            }
            (slot, None) => {
                if self.entries.len() >= MAX_RESERVATIONS {
                    debug!(node = %node, "Slot table full, dropping reservation");
                    return;
                }
                trace!(node = %node, slot = %slot, "New slot reservation");
                self.entries.push(Reservation {
                    node,
                    slot,
                    hop_distance,
                    last_updated: now,
                });
            }
        }
    }

    /// The reservation a node announced, if any.
    pub fn get(&self, node: NodeId) -> Option<&Reservation> {
        self.entries.iter().find(|r| r.node == node)
    }

    /// The slot a node announced, [`Slot::None`] when unknown.
    pub fn slot_of(&self, node: NodeId) -> Slot {
        self.get(node).map(|r| r.slot).unwrap_or(Slot::None)
    }

    /// Whether a slot is free to claim: it must not be this node's own
    /// reservation and no tracked neighbour may reference it.
    pub fn is_slot_available(&self, slot: u32, own_slot: Slot) -> bool {
        if own_slot == Slot::Reserved(slot) {
            return false;
        }
        !self
            .entries
            .iter()
            .any(|r| r.slot == Slot::Reserved(slot))
    }

    /// Deduplicated set of slots in use in the neighbourhood.
    pub fn occupied_slots(&self) -> Vec<u32> {
        let mut slots: Vec<u32> = self
            .entries
            .iter()
            .filter_map(|r| match r.slot {
                Slot::Reserved(s) => Some(s),
                Slot::None => None,
            })
            .collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    }

    /// Drop a node's reservation, if present.
    pub fn remove(&mut self, node: NodeId) {
        self.entries.retain(|r| r.node != node);
    }

    /// Drop reservations older than `max_age` seconds. Returns the number
    /// removed.
    pub fn cleanup_expired(&mut self, now: u64, max_age: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|r| now.saturating_sub(r.last_updated) <= max_age);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "Expired slot reservations");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::{HopDistance, SlotTable, SLOT_RESERVATION_TIMEOUT};
    use crate::{node_id::NodeId, slot::Slot};

    #[test]
    fn update_upserts_by_node() {
        let mut table = SlotTable::new();
        let node = NodeId::new(2);

        table.update(node, Slot::Reserved(4), HopDistance::One, 0);
        table.update(node, Slot::Reserved(7), HopDistance::One, 1);

        assert_eq!(table.len(), 1);
        assert_eq!(table.slot_of(node), Slot::Reserved(7));
    }

    #[test]
    fn announcing_no_slot_clears_reservation() {
        let mut table = SlotTable::new();
        let node = NodeId::new(2);

        table.update(node, Slot::Reserved(4), HopDistance::One, 0);
        table.update(node, Slot::None, HopDistance::One, 1);

        assert!(table.is_empty());
        assert_eq!(table.slot_of(node), Slot::None);
    }

    #[test]
    fn availability_accounts_for_own_and_tracked_slots() {
        let mut table = SlotTable::new();
        table.update(NodeId::new(2), Slot::Reserved(4), HopDistance::One, 0);
        table.update(NodeId::new(3), Slot::Reserved(5), HopDistance::Two, 0);

        assert!(!table.is_slot_available(4, Slot::None));
        assert!(!table.is_slot_available(5, Slot::None));
        assert!(!table.is_slot_available(6, Slot::Reserved(6)));
        assert!(table.is_slot_available(6, Slot::None));
    }

    #[test]
    fn occupied_slots_deduplicate() {
        let mut table = SlotTable::new();
        table.update(NodeId::new(2), Slot::Reserved(4), HopDistance::One, 0);
        table.update(NodeId::new(3), Slot::Reserved(4), HopDistance::Two, 0);
        table.update(NodeId::new(4), Slot::Reserved(9), HopDistance::Two, 0);

        assert_eq!(table.occupied_slots(), vec![4, 9]);
    }

    #[test]
    fn silent_reservations_expire() {
        let mut table = SlotTable::new();
        table.update(NodeId::new(2), Slot::Reserved(4), HopDistance::One, 0);
        table.update(NodeId::new(3), Slot::Reserved(5), HopDistance::Two, 20);

        let removed = table.cleanup_expired(SLOT_RESERVATION_TIMEOUT + 1, SLOT_RESERVATION_TIMEOUT);
        assert_eq!(removed, 1);
        assert_eq!(table.slot_of(NodeId::new(3)), Slot::Reserved(5));
    }
}
