//! The protocol engine: one value owning every table, driven by a periodic
//! tick and fed received messages by the transport.
//!
//! The `Router` is deliberately synchronous and single-owner. Nothing in here
//! blocks or locks; the async plumbing lives in [`Node`](crate::Node), which
//! owns the router inside one task and crosses the transport boundary over
//! channels.

use std::collections::VecDeque;

use tracing::{debug, info, trace, warn};

use crate::{
    clock::Clock,
    control::{
        hello::{HelloNeighbour, HelloTwoHop, HELLO_TTL, HELLO_VALIDITY_TIME},
        tc::{TC_TTL, TC_VALIDITY_TIME},
        Body, ControlMessage, Hello, InboundMessage, Tc,
    },
    control_queue::{ControlQueue, OutboundMessage},
    duplicate_set::DuplicateSet,
    link_status::LinkStatus,
    metrics::Metrics,
    mpr::calculate_mpr_set,
    neighbour::{NeighbourTable, MAX_NEIGHBOURS},
    node_id::NodeId,
    routing_table::{NextHop, RouteEntry, RoutingTable},
    sequence_number::SeqNo,
    shortest_path::{build_graph, dijkstra},
    slot::Slot,
    tdma::{HopDistance, SlotTable, SLOT_RESERVATION_TIMEOUT},
    topology::TopologyTable,
    two_hop::{TwoHopTable, MAX_TWO_HOP_NEIGHBOURS},
    willingness::Willingness,
};

/// Seconds between HELLO beacons.
pub const HELLO_INTERVAL: u64 = 2;

/// Seconds between TC emissions.
pub const TC_INTERVAL: u64 = 5;

/// Seconds between neighbour timeout scans.
const TIMEOUT_SCAN_INTERVAL: u64 = 1;

/// Seconds between global maintenance passes (queue, duplicate set and
/// topology expiry).
const MAINTENANCE_INTERVAL: u64 = 30;

/// Events the router surfaces to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterEvent {
    /// A destination dropped out of the known topology. The transport uses
    /// this to fail pending traffic towards it.
    DestinationUnreachable {
        dest: NodeId,
        /// The next hop that was planned before it went dead, if the loss
        /// was discovered through a failed reroute.
        failed_next_hop: Option<NodeId>,
    },
}

/// The OLSR protocol engine for a single node.
pub struct Router<M> {
    node_id: NodeId,
    willingness: Willingness,
    /// This node's own TDMA reservation, announced in every HELLO.
    own_slot: Slot,
    clock: Clock,
    /// Message sequence counter shared by HELLO and TC generation.
    msg_seqno: SeqNo,
    /// Advertised neighbour sequence number, bumped per TC generation.
    ansn: SeqNo,
    neighbours: NeighbourTable,
    two_hop: TwoHopTable,
    tdma: SlotTable,
    duplicates: DuplicateSet,
    topology: TopologyTable,
    routes: RoutingTable,
    queue: ControlQueue,
    mpr_set: Vec<NodeId>,
    events: VecDeque<RouterEvent>,
    last_hello_at: Option<u64>,
    last_tc_at: Option<u64>,
    last_timeout_scan_at: Option<u64>,
    last_maintenance_at: Option<u64>,
    topology_changed: bool,
    metrics: M,
}

/// Whether a periodic task last run at `last` is due again at `now`.
fn due(last: Option<u64>, interval: u64, now: u64) -> bool {
    last.map_or(true, |t| now.saturating_sub(t) >= interval)
}

impl<M> Router<M>
where
    M: Metrics,
{
    /// Create a new `Router` for the given node identity.
    pub fn new(node_id: NodeId, willingness: Willingness, own_slot: Slot, metrics: M) -> Self {
        info!(node = %node_id, willingness = %willingness, "Starting OLSR engine");
        Router {
            node_id,
            willingness,
            own_slot,
            clock: Clock::new(),
            msg_seqno: SeqNo::new(),
            ansn: SeqNo::new(),
            neighbours: NeighbourTable::new(),
            two_hop: TwoHopTable::new(),
            tdma: SlotTable::new(),
            duplicates: DuplicateSet::new(),
            topology: TopologyTable::new(),
            routes: RoutingTable::new(),
            queue: ControlQueue::new(),
            mpr_set: Vec::new(),
            events: VecDeque::new(),
            last_hello_at: None,
            last_tc_at: None,
            last_timeout_scan_at: None,
            last_maintenance_at: None,
            topology_changed: false,
            metrics,
        }
    }

    /// This node's id.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The engine's clock. Exposed mutably so simulations and tests can
    /// fast-forward time.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Update this node's own TDMA reservation. Takes effect from the next
    /// generated HELLO.
    pub fn set_own_slot(&mut self, slot: Slot) {
        self.own_slot = slot;
    }

    /// Whether a TDMA slot is free to claim from this node's point of view.
    pub fn is_slot_available(&self, slot: u32) -> bool {
        self.tdma.is_slot_available(slot, self.own_slot)
    }

    /// Deduplicated slots in use in the two-hop neighbourhood.
    pub fn occupied_slots(&self) -> Vec<u32> {
        self.tdma.occupied_slots()
    }

    /// The current MPR set, in selection order.
    pub fn mpr_set(&self) -> &[NodeId] {
        &self.mpr_set
    }

    /// Read access to the neighbour table.
    pub fn neighbours(&self) -> &NeighbourTable {
        &self.neighbours
    }

    /// Read access to the two-hop table.
    pub fn two_hop(&self) -> &TwoHopTable {
        &self.two_hop
    }

    /// Read access to the topology database.
    pub fn topology(&self) -> &TopologyTable {
        &self.topology
    }

    /// Read access to the routing table.
    pub fn routing_table(&self) -> &RoutingTable {
        &self.routes
    }

    /// Read access to the TDMA slot table.
    pub fn slot_table(&self) -> &SlotTable {
        &self.tdma
    }

    /// Pop the next pending router event, if any.
    pub fn poll_event(&mut self) -> Option<RouterEvent> {
        self.events.pop_front()
    }

    /// Pop the next outbound control message for the transport.
    pub fn drain_outbound(&mut self) -> Option<OutboundMessage> {
        self.queue.pop()
    }

    /// One pass of the protocol loop. Called roughly every 100 ms; all
    /// internal deadlines are compared against the logical clock, so the
    /// call frequency only bounds the reaction latency.
    pub fn tick(&mut self) {
        let now = self.clock.now();

        // Neighbour timeout scan.
        if due(self.last_timeout_scan_at, TIMEOUT_SCAN_INTERVAL, now) {
            self.last_timeout_scan_at = Some(now);
            let failed = self.neighbours.expired(now);
            if !failed.is_empty() {
                info!(failed = failed.len(), "Neighbours exceeded HELLO timeout");
                for id in failed {
                    self.handle_failure(id);
                }
                self.mpr_set = calculate_mpr_set(&mut self.neighbours, &self.two_hop);
                self.metrics.router_mpr_selection_ran();
                self.topology_changed = true;
                self.send_hello(now);
                self.last_hello_at = Some(now);
                self.metrics.router_emergency_hello();
            }
        }

        self.queue.process_retries(now);

        if due(self.last_hello_at, HELLO_INTERVAL, now) {
            self.last_hello_at = Some(now);
            self.send_hello(now);
        }

        if due(self.last_tc_at, TC_INTERVAL, now) {
            self.last_tc_at = Some(now);
            self.send_tc(now);
        }

        // Global maintenance.
        if due(self.last_maintenance_at, MAINTENANCE_INTERVAL, now) {
            self.last_maintenance_at = Some(now);
            self.queue.cleanup_expired(now);
            self.duplicates.cleanup(now);
            if self.topology.cleanup_expired(now) > 0 {
                self.topology_changed = true;
            }
        }

        if self.topology_changed {
            self.topology_changed = false;
            self.recompute_routes(now);
        }
    }

    /// Ingress entry point: dispatch a message delivered by the transport.
    pub fn receive(&mut self, inbound: InboundMessage) {
        let now = self.clock.now();
        let msg = inbound.message;

        if inbound.sender == self.node_id || msg.ttl == 0 {
            trace!(sender = %inbound.sender, "Discarding invalid or self-sent message");
            self.metrics.router_invalid_message();
            return;
        }

        match msg.body {
            Body::Hello(hello) => {
                if hello.neighbours.len() > MAX_NEIGHBOURS
                    || hello.two_hop_neighbours.len() > MAX_TWO_HOP_NEIGHBOURS
                {
                    debug!(sender = %inbound.sender, "Discarding HELLO with implausible counts");
                    self.metrics.router_invalid_message();
                    return;
                }
                // A HELLO always originates from the immediate sender.
                self.process_hello(&hello, inbound.sender, now);
            }
            Body::Tc(tc) => {
                if tc.mpr_selectors.len() > MAX_NEIGHBOURS {
                    debug!(sender = %inbound.sender, "Discarding TC with implausible count");
                    self.metrics.router_invalid_message();
                    return;
                }
                self.process_tc(
                    tc,
                    msg.originator,
                    msg.seqno,
                    msg.vtime,
                    msg.ttl,
                    msg.hop_count,
                    inbound.sender,
                    now,
                );
            }
        }
    }

    /// Answer a next-hop query for the forwarding layer, rerouting reactively
    /// when the planned next hop went silent.
    pub fn next_hop(&mut self, dest: NodeId) -> NextHop {
        let now = self.clock.now();

        if dest == self.node_id {
            return NextHop::Local;
        }

        if let Some(entry) = self.routes.get(dest).copied() {
            if self.neighbour_is_live(entry.next_hop(), now) {
                return NextHop::Route {
                    next_hop: entry.next_hop(),
                    metric: entry.metric(),
                    hops: entry.hops(),
                };
            }

            // The planned next hop went silent. Invalidate and recompute
            // before answering.
            debug!(dest = %dest, next_hop = %entry.next_hop(), "Next hop no longer live, rerouting");
            self.metrics.router_reroute_triggered();
            self.routes.remove(dest);
            self.recompute_routes(now);

            if let Some(fresh) = self.routes.get(dest).copied() {
                if self.neighbour_is_live(fresh.next_hop(), now) {
                    return NextHop::Route {
                        next_hop: fresh.next_hop(),
                        metric: fresh.metric(),
                        hops: fresh.hops(),
                    };
                }
            }

            return self.declare_unreachable(dest, Some(entry.next_hop()));
        }

        if self.neighbours.contains(dest) || self.topology.knows_node(dest, now) {
            NextHop::NoRoute
        } else {
            self.declare_unreachable(dest, None)
        }
    }

    /// All current routes, for display surfaces.
    pub fn routes(&self) -> Vec<RouteEntry> {
        self.routes.iter().copied().collect()
    }

    fn declare_unreachable(&mut self, dest: NodeId, failed_next_hop: Option<NodeId>) -> NextHop {
        warn!(dest = %dest, "Destination unreachable");
        self.metrics.router_destination_unreachable();
        self.events.push_back(RouterEvent::DestinationUnreachable {
            dest,
            failed_next_hop,
        });
        NextHop::Unreachable
    }

    /// Process a received HELLO from a direct neighbour.
    fn process_hello(&mut self, hello: &Hello, sender: NodeId, now: u64) {
        self.metrics.router_process_hello();

        // TDMA bookkeeping first: the sender's own reservation, then the
        // reservations it relays about its neighbourhood.
        self.tdma
            .update(sender, hello.reserved_slot, HopDistance::One, now);
        for two_hop in &hello.two_hop_neighbours {
            if two_hop.two_hop_id == self.node_id {
                continue;
            }
            self.tdma.update(
                two_hop.two_hop_id,
                two_hop.reserved_slot,
                HopDistance::Two,
                now,
            );
        }

        // Hearing ourselves in the sender's neighbour list proves the link
        // works both ways.
        let link = if hello.lists(self.node_id) {
            LinkStatus::Symmetric
        } else {
            LinkStatus::Asymmetric
        };

        let was_known = self.neighbours.contains(sender);
        let previous_link = self.neighbours.get(sender).map(|n| n.link_status());
        match self
            .neighbours
            .upsert(sender, link, hello.willingness, now)
        {
            Ok(entry) => entry.refresh_hello(now),
            Err(e) => {
                warn!(sender = %sender, "Dropping HELLO: {e}");
                return;
            }
        }
        if !was_known {
            self.metrics.router_neighbour_added();
        }
        if previous_link != Some(link) {
            self.topology_changed = true;
        }

        // Two-hop derivation, only through verified symmetric links.
        if link.is_symmetric() {
            for advertised in &hello.neighbours {
                if advertised.id == self.node_id
                    || self.neighbours.contains(advertised.id)
                    || !advertised.link_code.is_symmetric()
                {
                    continue;
                }
                match self.two_hop.add(advertised.id, sender, now) {
                    Ok(true) => self.topology_changed = true,
                    Ok(false) => {}
                    Err(e) => warn!(two_hop = %advertised.id, "Dropping two-hop entry: {e}"),
                }
            }
        }

        self.mpr_set = calculate_mpr_set(&mut self.neighbours, &self.two_hop);
        self.metrics.router_mpr_selection_ran();

        // The sender tells us whether it picked us as relay.
        let selects_us = hello.selects_as_mpr(self.node_id);
        if let Some(entry) = self.neighbours.get_mut(sender) {
            entry.set_mpr_selector(selects_us);
        }

        let expired = self.tdma.cleanup_expired(now, SLOT_RESERVATION_TIMEOUT);
        for _ in 0..expired {
            self.metrics.tdma_reservation_expired();
        }
    }

    /// Process a received TC, feeding the topology database and re-flooding
    /// through the MPR mechanism where required.
    #[allow(clippy::too_many_arguments)]
    fn process_tc(
        &mut self,
        tc: Tc,
        originator: NodeId,
        seqno: SeqNo,
        vtime: u16,
        ttl: u8,
        hop_count: u8,
        sender: NodeId,
        now: u64,
    ) {
        if originator == self.node_id {
            trace!("Ignoring echo of our own TC");
            return;
        }

        if self.duplicates.is_duplicate(originator, seqno) {
            trace!(originator = %originator, seqno = %seqno, "Dropping duplicate TC");
            self.metrics.router_duplicate_dropped();
            return;
        }
        self.duplicates.add(originator, seqno, now);

        self.metrics.router_process_tc();
        debug!(
            originator = %originator,
            ansn = %tc.ansn,
            selectors = tc.selector_count(),
            "Processing TC"
        );

        let validity = now + u64::from(vtime);
        for selector in &tc.mpr_selectors {
            if let Err(e) = self
                .topology
                .add_link(originator, *selector, tc.ansn, validity)
            {
                warn!(from = %originator, to = %selector, "Dropping topology link: {e}");
            }
        }

        self.recompute_routes(now);

        // MPR flooding: we re-transmit only when the sender chose us as its
        // relay, and only while the message still has hops to live.
        let sender_selected_us = self
            .neighbours
            .get(sender)
            .map(|n| n.is_mpr_selector() && n.is_symmetric())
            .unwrap_or(false);
        if sender_selected_us && ttl > 1 {
            let forward = ControlMessage {
                originator,
                seqno,
                vtime,
                ttl: ttl - 1,
                hop_count: hop_count + 1,
                body: Body::Tc(tc),
            };
            match self.queue.push(forward, now) {
                Ok(()) => {
                    trace!(originator = %originator, seqno = %seqno, "Forwarding TC");
                    self.metrics.router_tc_forwarded();
                }
                Err(e) => {
                    warn!("Not forwarding TC: {e}");
                    self.metrics.router_queue_full();
                }
            }
        }
    }

    /// Remove a failed neighbour and every piece of state hanging off it.
    fn handle_failure(&mut self, id: NodeId) {
        info!(neighbour = %id, "Removing failed neighbour");
        self.neighbours.remove(id);
        self.two_hop.remove_via(id);
        self.tdma.remove(id);
        self.metrics.router_neighbour_expired();
    }

    /// Generate and enqueue a HELLO snapshot of the current state.
    fn send_hello(&mut self, now: u64) {
        let hello = self.generate_hello();
        let msg = ControlMessage {
            originator: self.node_id,
            seqno: self.msg_seqno.bump(),
            vtime: HELLO_VALIDITY_TIME,
            ttl: HELLO_TTL,
            hop_count: 0,
            body: Body::Hello(hello),
        };

        if let Err(e) = self.queue.push(msg, now) {
            warn!("Dropping generated HELLO: {e}");
            self.metrics.router_queue_full();
        }
    }

    /// Snapshot the neighbourhood into a HELLO body. Neighbours we selected
    /// as MPR are advertised with the MPR link code instead of plain
    /// symmetric, which is how they learn they were chosen.
    fn generate_hello(&self) -> Hello {
        let neighbours = self
            .neighbours
            .iter()
            .map(|n| HelloNeighbour {
                id: n.id(),
                link_code: if n.is_mpr() {
                    LinkStatus::MprNeighbour
                } else {
                    n.link_status()
                },
            })
            .collect();

        let two_hop_neighbours = self
            .two_hop
            .iter()
            .map(|assoc| HelloTwoHop {
                two_hop_id: assoc.two_hop_id(),
                via_id: assoc.via_id(),
                reserved_slot: self.tdma.slot_of(assoc.two_hop_id()),
            })
            .collect();

        Hello {
            interval: HELLO_INTERVAL as u16,
            willingness: self.willingness,
            reserved_slot: self.own_slot,
            neighbours,
            two_hop_neighbours,
        }
    }

    /// Generate and enqueue a TC advertising our MPR selector set. Nothing
    /// is sent while no neighbour selected us: a node which relays for
    /// nobody has nothing to advertise.
    fn send_tc(&mut self, now: u64) {
        let selectors: Vec<NodeId> = self
            .neighbours
            .iter()
            .filter(|n| n.is_mpr_selector() && n.is_symmetric())
            .map(|n| n.id())
            .collect();

        if selectors.is_empty() {
            trace!("No MPR selectors, skipping TC generation");
            return;
        }

        let seqno = self.msg_seqno.bump();
        let msg = ControlMessage {
            originator: self.node_id,
            seqno,
            vtime: TC_VALIDITY_TIME,
            ttl: TC_TTL,
            hop_count: 0,
            body: Body::Tc(Tc {
                ansn: self.ansn.bump(),
                mpr_selectors: selectors,
            }),
        };

        // Remember our own (originator, seqno) so an echo relayed back at us
        // is dropped instead of processed.
        self.duplicates.add(self.node_id, seqno, now);

        if let Err(e) = self.queue.push(msg, now) {
            warn!("Dropping generated TC: {e}");
            self.metrics.router_queue_full();
        }
    }

    /// Rebuild the routing table from the current link-state view.
    fn recompute_routes(&mut self, now: u64) {
        let edges = build_graph(
            self.node_id,
            &self.neighbours,
            &self.two_hop,
            &self.topology,
            now,
        );
        let routes = dijkstra(self.node_id, &edges);
        debug!(routes = routes.len(), "Recomputed routing table");
        self.routes.rebuild(routes, now);
        self.metrics.router_routes_recomputed();
    }

    /// Whether the given node is a symmetric neighbour heard recently enough
    /// to still be trusted with traffic.
    fn neighbour_is_live(&self, id: NodeId, now: u64) -> bool {
        self.neighbours
            .get(id)
            .map(|n| n.is_symmetric() && n.is_live(now))
            .unwrap_or(false)
    }
}
