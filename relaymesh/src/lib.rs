//! OLSR protocol engine for TDMA radio mesh networks.
//!
//! The crate is split in two layers. [`router::Router`] is the synchronous
//! protocol engine: neighbour sensing, MPR selection, TC flooding, topology
//! tracking and shortest path routing, owned by a single caller and driven by
//! a periodic tick. [`Node`] wraps a router in a tokio task and exposes the
//! transport boundary as channels: structured control messages in and out,
//! next-hop queries, and link failure events. The radio layer owns framing
//! and transmission; this crate never touches wire bytes.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    control::InboundMessage,
    control_queue::OutboundMessage,
    metrics::Metrics,
    node_id::NodeId,
    router::{Router, RouterEvent},
    routing_table::{NextHop, RouteEntry},
    slot::Slot,
    willingness::Willingness,
};

pub mod clock;
pub mod control;
pub mod control_queue;
pub mod duplicate_set;
pub mod link_status;
pub mod metrics;
pub mod mpr;
pub mod neighbour;
pub mod node_id;
pub mod router;
pub mod routing_table;
pub mod sequence_number;
pub mod shortest_path;
pub mod slot;
pub mod tdma;
pub mod topology;
pub mod two_hop;
pub mod willingness;

/// Milliseconds between protocol loop quanta. Deadlines inside the engine
/// are whole seconds, so the quantum only bounds reaction latency.
const QUANTUM_MS: u64 = 100;

/// Capacity of the outbound channel towards the transport.
const OUTBOUND_CHANNEL_SIZE: usize = 64;

/// Capacity of the event channel towards the transport.
const EVENT_CHANNEL_SIZE: usize = 16;

/// Config for a relaymesh [`Node`].
pub struct Config<M> {
    /// This node's id.
    pub node_id: NodeId,
    /// Willingness to relay for others, advertised in every HELLO.
    pub willingness: Willingness,
    /// The TDMA slot this node has reserved, if any.
    pub tdma_slot: Slot,
    /// Implementation of the [`Metrics`] trait, used to expose information
    /// about the system internals.
    pub metrics: M,
}

/// Handles for the transport collaborator: the stream of messages to put on
/// the air, and the stream of link failure events.
pub struct TransportHandle {
    /// Control messages to transmit.
    pub outbound: mpsc::Receiver<OutboundMessage>,
    /// Router events, currently destination-loss notifications.
    pub events: mpsc::Receiver<RouterEvent>,
}

/// Commands crossing from the [`Node`] handle into the router task.
enum Command {
    NextHop {
        dest: NodeId,
        reply: oneshot::Sender<NextHop>,
    },
    Routes {
        reply: oneshot::Sender<Vec<RouteEntry>>,
    },
    SetSlot {
        slot: Slot,
    },
    SlotAvailable {
        slot: u32,
        reply: oneshot::Sender<bool>,
    },
}

/// A running mesh node: the router actor plus the channels to talk to it.
pub struct Node {
    node_id: NodeId,
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
    command_tx: mpsc::Sender<Command>,
    cancel_token: CancellationToken,
}

impl Node {
    /// Set up a new `Node` with the provided [`Config`]. Returns the node
    /// handle and the [`TransportHandle`] the radio layer drains.
    ///
    /// # Panics
    ///
    /// This will panic if not executed in the context of a tokio runtime.
    pub fn new<M>(config: Config<M>) -> (Self, TransportHandle)
    where
        M: Metrics + Send + 'static,
    {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(16);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_SIZE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let cancel_token = CancellationToken::new();

        let router = Router::new(
            config.node_id,
            config.willingness,
            config.tdma_slot,
            config.metrics,
        );

        tokio::spawn(run_router(
            router,
            inbound_rx,
            command_rx,
            outbound_tx,
            event_tx,
            cancel_token.clone(),
        ));
        info!(node = %config.node_id, "Node started");

        (
            Node {
                node_id: config.node_id,
                inbound_tx,
                command_tx,
                cancel_token,
            },
            TransportHandle {
                outbound: outbound_rx,
                events: event_rx,
            },
        )
    }

    /// This node's id.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Deliver a received control message to the engine.
    pub fn deliver(&self, msg: InboundMessage) {
        if self.inbound_tx.send(msg).is_err() {
            warn!("Dropping inbound message, router task is gone");
        }
    }

    /// Query the next hop towards a destination. Triggers reactive rerouting
    /// when the planned next hop went silent.
    pub async fn next_hop(&self, dest: NodeId) -> NextHop {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::NextHop { dest, reply })
            .await
            .expect("Router task outlives the node handle; qed");
        rx.await
            .expect("Router task answers every command; qed")
    }

    /// Snapshot of the current routing table.
    pub async fn routes(&self) -> Vec<RouteEntry> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Routes { reply })
            .await
            .expect("Router task outlives the node handle; qed");
        rx.await
            .expect("Router task answers every command; qed")
    }

    /// Announce a new TDMA reservation for this node, effective from the
    /// next HELLO.
    pub async fn set_tdma_slot(&self, slot: Slot) {
        self.command_tx
            .send(Command::SetSlot { slot })
            .await
            .expect("Router task outlives the node handle; qed");
    }

    /// Whether a TDMA slot is free to claim as far as the two-hop
    /// neighbourhood is concerned.
    pub async fn is_slot_available(&self, slot: u32) -> bool {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::SlotAvailable { slot, reply })
            .await
            .expect("Router task outlives the node handle; qed");
        rx.await
            .expect("Router task answers every command; qed")
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// The router task: drives the protocol loop quantum and multiplexes
/// ingress, commands and cancellation. The router itself stays single-owner,
/// everything crosses through channels.
async fn run_router<M>(
    mut router: Router<M>,
    mut inbound_rx: mpsc::UnboundedReceiver<InboundMessage>,
    mut command_rx: mpsc::Receiver<Command>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    event_tx: mpsc::Sender<RouterEvent>,
    cancel_token: CancellationToken,
) where
    M: Metrics,
{
    let mut quantum = tokio::time::interval(std::time::Duration::from_millis(QUANTUM_MS));
    quantum.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Router task shutting down");
                return;
            }
            Some(msg) = inbound_rx.recv() => {
                router.receive(msg);
            }
            Some(command) = command_rx.recv() => {
                handle_command(&mut router, command);
            }
            _ = quantum.tick() => {
                router.tick();
                // One transmission opportunity per quantum.
                if let Some(out) = router.drain_outbound() {
                    if outbound_tx.try_send(out).is_err() {
                        warn!("Transport is not keeping up, dropping outbound message");
                    }
                }
            }
        }

        while let Some(event) = router.poll_event() {
            if event_tx.try_send(event).is_err() {
                warn!("Event channel full, dropping router event");
            }
        }
    }
}

fn handle_command<M>(router: &mut Router<M>, command: Command)
where
    M: Metrics,
{
    match command {
        Command::NextHop { dest, reply } => {
            let _ = reply.send(router.next_hop(dest));
        }
        Command::Routes { reply } => {
            let _ = reply.send(router.routes());
        }
        Command::SetSlot { slot } => {
            router.set_own_slot(slot);
        }
        Command::SlotAvailable { slot, reply } => {
            let _ = reply.send(router.is_slot_available(slot));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Node};
    use crate::{
        control::{hello::HELLO_VALIDITY_TIME, Body, ControlMessage, Hello, InboundMessage},
        link_status::LinkStatus,
        metrics::Metrics,
        node_id::NodeId,
        routing_table::NextHop,
        sequence_number::SeqNo,
        slot::Slot,
        willingness::Willingness,
    };

    #[derive(Clone)]
    struct NoMetrics;
    impl Metrics for NoMetrics {}

    fn node() -> (Node, super::TransportHandle) {
        Node::new(Config {
            node_id: NodeId::new(0x0A000001),
            willingness: Willingness::DEFAULT,
            tdma_slot: Slot::None,
            metrics: NoMetrics,
        })
    }

    /// The node beacons a HELLO through the transport handle shortly after
    /// starting.
    #[tokio::test]
    async fn node_emits_hello_beacon() {
        let (_node, mut transport) = node();

        let out = tokio::time::timeout(std::time::Duration::from_secs(2), transport.outbound.recv())
            .await
            .expect("a beacon arrives within the HELLO interval")
            .expect("transport channel is open");

        match out.message.body {
            Body::Hello(_) => {}
            other => panic!("expected a HELLO beacon, got {other:?}"),
        }
    }

    /// Delivering a symmetric HELLO makes the sender routable.
    #[tokio::test]
    async fn delivered_hello_populates_routes() {
        let (node, _transport) = node();
        let sender = NodeId::new(0x0A000002);

        node.deliver(InboundMessage {
            sender,
            message: ControlMessage {
                originator: sender,
                seqno: SeqNo::from(1),
                vtime: HELLO_VALIDITY_TIME,
                ttl: 1,
                hop_count: 0,
                body: Body::Hello(Hello {
                    interval: 2,
                    willingness: Willingness::DEFAULT,
                    reserved_slot: Slot::None,
                    neighbours: vec![crate::control::hello::HelloNeighbour {
                        id: NodeId::new(0x0A000001),
                        link_code: LinkStatus::Symmetric,
                    }],
                    two_hop_neighbours: vec![],
                }),
            },
        });

        // Give the router task a few quanta to ingest and recompute.
        let mut answer = NextHop::NoRoute;
        for _ in 0..20 {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            answer = node.next_hop(sender).await;
            if matches!(answer, NextHop::Route { .. }) {
                break;
            }
        }

        match answer {
            NextHop::Route { next_hop, hops, .. } => {
                assert_eq!(next_hop, sender);
                assert_eq!(hops, 1);
            }
            other => panic!("expected a direct route, got {other:?}"),
        }
    }
}
