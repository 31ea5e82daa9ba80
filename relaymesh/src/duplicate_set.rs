//! The duplicate set keeps track of flooded messages this node already
//! processed, so re-hearing a TC from another relay neither mutates state
//! again nor triggers another forward. HELLO's are exempt: they are
//! single-hop and never flooded.

use tracing::{debug, trace};

use crate::{node_id::NodeId, sequence_number::SeqNo};

/// Capacity of the duplicate set.
const MAX_DUPLICATE_ENTRIES: usize = 256;

/// Seconds an entry is retained. Must exceed the TC validity time, otherwise
/// a slow echo of a TC could be re-accepted while its links are still live.
pub const DUPLICATE_HOLD_TIME: u64 = 30;

#[derive(Debug, Clone, Copy)]
struct DuplicateEntry {
    originator: NodeId,
    seqno: SeqNo,
    timestamp: u64,
}

/// Bounded (originator, sequence number) cache with hold-time expiry.
#[derive(Debug, Default)]
pub struct DuplicateSet {
    entries: Vec<DuplicateEntry>,
}

impl DuplicateSet {
    /// Create a new empty `DuplicateSet`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remembered messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the (originator, seqno) pair was seen before.
    pub fn is_duplicate(&self, originator: NodeId, seqno: SeqNo) -> bool {
        self.entries
            .iter()
            .any(|e| e.originator == originator && e.seqno == seqno)
    }

    /// Remember a processed message. When the set is full the oldest entry is
    /// evicted; a full set must not let fresh floods loop.
    pub fn add(&mut self, originator: NodeId, seqno: SeqNo, now: u64) {
        if self.is_duplicate(originator, seqno) {
            return;
        }

        if self.entries.len() >= MAX_DUPLICATE_ENTRIES {
            if let Some(oldest) = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.timestamp)
                .map(|(i, _)| i)
            {
                self.entries.swap_remove(oldest);
            }
        }

        trace!(originator = %originator, seqno = %seqno, "Recording processed message");
        self.entries.push(DuplicateEntry {
            originator,
            seqno,
            timestamp: now,
        });
    }

    /// Drop entries older than [`DUPLICATE_HOLD_TIME`]. Returns the number
    /// removed.
    pub fn cleanup(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| now.saturating_sub(e.timestamp) <= DUPLICATE_HOLD_TIME);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "Expired duplicate set entries");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::{DuplicateSet, DUPLICATE_HOLD_TIME};
    use crate::{node_id::NodeId, sequence_number::SeqNo};

    #[test]
    fn detects_known_pairs() {
        let mut set = DuplicateSet::new();
        let originator = NodeId::new(0x0A000010);

        assert!(!set.is_duplicate(originator, SeqNo::from(7)));
        set.add(originator, SeqNo::from(7), 0);
        assert!(set.is_duplicate(originator, SeqNo::from(7)));
        // Same seqno from a different originator is a different message.
        assert!(!set.is_duplicate(NodeId::new(0x0A000011), SeqNo::from(7)));
    }

    #[test]
    fn adding_twice_keeps_one_entry() {
        let mut set = DuplicateSet::new();
        set.add(NodeId::new(1), SeqNo::from(7), 0);
        set.add(NodeId::new(1), SeqNo::from(7), 5);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn entries_age_out_after_hold_time() {
        let mut set = DuplicateSet::new();
        set.add(NodeId::new(1), SeqNo::from(7), 0);
        set.add(NodeId::new(1), SeqNo::from(8), 20);

        assert_eq!(set.cleanup(DUPLICATE_HOLD_TIME + 1), 1);
        assert!(!set.is_duplicate(NodeId::new(1), SeqNo::from(7)));
        assert!(set.is_duplicate(NodeId::new(1), SeqNo::from(8)));
    }
}
