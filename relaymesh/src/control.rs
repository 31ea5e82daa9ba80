//! Structured control traffic exchanged with the transport.
//!
//! The engine never serializes anything itself: it hands these records to the
//! transport and receives them back fully structured. Wire framing is the
//! transport's business. The envelope follows the OLSR message header
//! ([rfc3626 §3.3](https://datatracker.ietf.org/doc/html/rfc3626#section-3.3)):
//! originator, sequence number, validity time, ttl and hop count travel with
//! every message so flooded TC's keep their identity across relays.

use serde::{Deserialize, Serialize};

pub use self::{hello::Hello, tc::Tc};

use crate::{node_id::NodeId, sequence_number::SeqNo};

pub mod hello;
pub mod tc;

/// Kind discriminants for control messages, matching the on-air type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    /// Single-hop neighbourhood beacon.
    Hello = 1,
    /// Network-flooded topology control message.
    Tc = 2,
}

/// The payload of a control message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Body {
    Hello(Hello),
    Tc(Tc),
}

impl Body {
    /// The [`MessageKind`] of this body.
    pub fn kind(&self) -> MessageKind {
        match self {
            Body::Hello(_) => MessageKind::Hello,
            Body::Tc(_) => MessageKind::Tc,
        }
    }
}

/// A full control message as handed to (and received from) the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Node which generated the message. For forwarded TC's this is not the
    /// node we received it from.
    pub originator: NodeId,
    /// The originator's message sequence number.
    pub seqno: SeqNo,
    /// Seconds a receiver should consider the carried information valid.
    pub vtime: u16,
    /// Remaining hops this message may travel.
    pub ttl: u8,
    /// Hops travelled so far.
    pub hop_count: u8,
    pub body: Body,
}

impl ControlMessage {
    /// The [`MessageKind`] of this message.
    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }
}

/// A control message delivered by the transport, together with the id of the
/// immediate sender (the node whose radio we heard, not necessarily the
/// originator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender: NodeId,
    pub message: ControlMessage,
}
