//! The outbound control queue.
//!
//! Generators enqueue owned message snapshots, the transport drains them. The
//! queue also carries the retransmission metadata: entries pushed with retry
//! enabled have their backoff advanced by the periodic retry pass until they
//! are transmitted, exhausted, or expired.

use core::fmt;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{control::ControlMessage, node_id::NodeId};

/// Maximum messages the queue holds before rejecting new pushes.
const MAX_QUEUE_SIZE: usize = 32;

/// Seconds before a queued message is considered stale and dropped.
const QUEUE_EXPIRY: u64 = 60;

/// First retry is scheduled this many seconds after the push.
const RETRY_BASE_INTERVAL: u64 = 2;

/// Exponential backoff is capped at this interval.
const MAX_RETRY_INTERVAL: u64 = 16;

/// Retries beyond this count drop the message.
const MAX_RETRY_ATTEMPTS: u8 = 3;

/// Error returned when the queue is at capacity. Not fatal: the caller simply
/// discards the snapshot it generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

impl fmt::Display for QueueFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("control queue is full")
    }
}

impl std::error::Error for QueueFull {}

/// A message handed to the transport for transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Unicast destination, [`None`] for broadcast traffic.
    pub destination: Option<NodeId>,
    pub message: ControlMessage,
}

/// A queued message together with its retry bookkeeping.
#[derive(Debug, Clone)]
struct QueuedMessage {
    destination: Option<NodeId>,
    message: ControlMessage,
    created_at: u64,
    /// 0 means no retransmission is wanted for this entry.
    retry_count: u8,
    next_retry_at: u64,
}

/// FIFO of outbound control messages, bounded at [`MAX_QUEUE_SIZE`].
#[derive(Debug, Default)]
pub struct ControlQueue {
    entries: VecDeque<QueuedMessage>,
}

impl ControlQueue {
    /// Create a new empty `ControlQueue`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue holds no messages.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enqueue a message without retransmission tracking.
    pub fn push(&mut self, message: ControlMessage, now: u64) -> Result<(), QueueFull> {
        self.push_entry(message, None, 0, 0, now)
    }

    /// Enqueue a message with retransmission tracking towards a destination.
    /// The first retry is scheduled [`RETRY_BASE_INTERVAL`] seconds out.
    pub fn push_with_retry(
        &mut self,
        message: ControlMessage,
        destination: NodeId,
        now: u64,
    ) -> Result<(), QueueFull> {
        self.push_entry(message, Some(destination), 1, now + RETRY_BASE_INTERVAL, now)
    }

    fn push_entry(
        &mut self,
        message: ControlMessage,
        destination: Option<NodeId>,
        retry_count: u8,
        next_retry_at: u64,
        now: u64,
    ) -> Result<(), QueueFull> {
        if self.entries.len() >= MAX_QUEUE_SIZE {
            return Err(QueueFull);
        }

        trace!(kind = ?message.kind(), "Queueing outbound control message");
        self.entries.push_back(QueuedMessage {
            destination,
            message,
            created_at: now,
            retry_count,
            next_retry_at,
        });

        Ok(())
    }

    /// Dequeue the oldest message for transmission.
    pub fn pop(&mut self) -> Option<OutboundMessage> {
        self.entries.pop_front().map(|entry| OutboundMessage {
            destination: entry.destination,
            message: entry.message,
        })
    }

    /// Advance the backoff of every retry-tracked entry which is due. Entries
    /// which exceeded [`MAX_RETRY_ATTEMPTS`] are dropped. Returns the number
    /// of entries whose retry fired.
    pub fn process_retries(&mut self, now: u64) -> usize {
        let mut fired = 0;

        self.entries.retain_mut(|entry| {
            if entry.retry_count == 0 || now < entry.next_retry_at {
                return true;
            }

            if entry.retry_count > MAX_RETRY_ATTEMPTS {
                debug!(
                    destination = ?entry.destination,
                    "Dropping control message after exhausting retries"
                );
                return false;
            }

            entry.retry_count += 1;
            let backoff =
                (RETRY_BASE_INTERVAL << entry.retry_count).min(MAX_RETRY_INTERVAL);
            entry.next_retry_at = now + backoff;
            fired += 1;

            trace!(
                destination = ?entry.destination,
                attempt = entry.retry_count,
                backoff,
                "Control message retry due"
            );

            true
        });

        fired
    }

    /// Drop entries which sat in the queue longer than [`QUEUE_EXPIRY`]
    /// seconds, or which exhausted their retries. Returns the number removed.
    pub fn cleanup_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| {
            now.saturating_sub(entry.created_at) <= QUEUE_EXPIRY
                && entry.retry_count <= MAX_RETRY_ATTEMPTS
        });

        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "Cleaned up expired control messages");
        }

        removed
    }
}
