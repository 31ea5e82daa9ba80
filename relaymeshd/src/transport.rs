//! UDP broadcast transport.
//!
//! The engine hands us structured control messages; this module owns the
//! wire. Frames are JSON-encoded [`InboundMessage`] values (sender id plus
//! message) broadcast on the local segment. Every node on the segment is a
//! radio neighbour, so unicast destinations are served by the same broadcast
//! and filtered by the receivers.

use std::{io, net::Ipv4Addr};

use log::{debug, info, warn};
use relaymesh::{control::InboundMessage, router::RouterEvent, Node, TransportHandle};
use tokio::net::UdpSocket;

/// Upper bound on an encoded control message. A full HELLO with 40
/// neighbours and 100 two-hop entries stays well below this.
const MAX_DATAGRAM_SIZE: usize = 16 * 1024;

/// Drive the transport until the node shuts down: broadcast outbound
/// messages, deliver received ones, and log link failure events.
pub async fn run(node: Node, mut handle: TransportHandle, port: u16) -> io::Result<()> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    socket.set_broadcast(true)?;
    let broadcast_addr = (Ipv4Addr::BROADCAST, port);

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        tokio::select! {
            out = handle.outbound.recv() => {
                let Some(out) = out else {
                    info!("Node stopped, transport exiting");
                    return Ok(());
                };
                // The segment is a single broadcast domain; messages with a
                // unicast destination reach it the same way.
                let frame = InboundMessage {
                    sender: node.node_id(),
                    message: out.message,
                };
                match serde_json::to_vec(&frame) {
                    Ok(bytes) => {
                        if let Err(e) = socket.send_to(&bytes, broadcast_addr).await {
                            warn!("Failed to transmit control message: {e}");
                        }
                    }
                    Err(e) => warn!("Failed to encode control message: {e}"),
                }
            }
            event = handle.events.recv() => {
                if let Some(RouterEvent::DestinationUnreachable { dest, failed_next_hop }) = event {
                    match failed_next_hop {
                        Some(hop) => warn!("Destination {dest} lost, next hop {hop} failed"),
                        None => warn!("Destination {dest} is not in the topology"),
                    }
                }
            }
            received = socket.recv_from(&mut buf) => {
                let (len, addr) = received?;
                match serde_json::from_slice::<InboundMessage>(&buf[..len]) {
                    Ok(frame) => {
                        if frame.sender == node.node_id() {
                            // Our own broadcast looped back.
                            continue;
                        }
                        debug!(
                            "Received {:?} from {} ({addr})",
                            frame.message.kind(),
                            frame.sender
                        );
                        node.deliver(frame);
                    }
                    Err(e) => debug!("Discarding malformed datagram from {addr}: {e}"),
                }
            }
        }
    }
}
