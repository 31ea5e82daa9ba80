//! Multipoint relay selection
//! ([rfc3626 §8.3](https://datatracker.ietf.org/doc/html/rfc3626#section-8.3)).
//!
//! The MPR set is the smallest practical subset of symmetric neighbours
//! through which every two-hop neighbour can still be reached. Only MPRs
//! retransmit flooded traffic, which is where OLSR gets its overhead
//! reduction from.

use tracing::{debug, trace, warn};

use crate::{neighbour::NeighbourTable, node_id::NodeId, two_hop::TwoHopTable, willingness::Willingness};

/// Recompute the MPR set from the current neighbour and two-hop tables.
///
/// The `is_mpr` flag on every neighbour is rewritten to reflect the new
/// selection, and the selected ids are returned in selection order. The
/// heuristic follows the rfc:
///
/// 1. neighbours with willingness `ALWAYS` are always selected,
/// 2. a neighbour which is the only reach towards some two-hop node is
///    selected,
/// 3. remaining uncovered two-hop nodes are covered greedily by the
///    neighbour reaching the most of them, ties broken by higher
///    willingness, further ties by table order.
///
/// If the remaining candidates cannot reduce the uncovered set (every path
/// runs through an asymmetric or unwilling neighbour), selection stops with
/// partial coverage. That is an observable property of the topology, not an
/// error.
pub fn calculate_mpr_set(neighbours: &mut NeighbourTable, two_hop: &TwoHopTable) -> Vec<NodeId> {
    let mut selected = Vec::new();

    for neighbour in neighbours.iter_mut() {
        neighbour.set_mpr(false);
    }

    if two_hop.is_empty() {
        trace!("No two-hop neighbours, MPR set is empty");
        return selected;
    }

    let mut uncovered = two_hop.two_hop_ids();

    // Step 1: willingness ALWAYS.
    let always: Vec<NodeId> = neighbours
        .symmetric()
        .filter(|n| n.willingness() == Willingness::ALWAYS)
        .map(|n| n.id())
        .collect();
    for id in always {
        select(id, neighbours, two_hop, &mut selected, &mut uncovered);
        debug!(mpr = %id, "Selected MPR (willingness always)");
    }

    // Step 2: sole providers. A two-hop node with exactly one eligible path
    // leaves no choice.
    let sole_providers: Vec<NodeId> = neighbours
        .symmetric()
        .filter(|n| {
            !n.is_mpr()
                && n.willingness() != Willingness::NEVER
                && two_hop
                    .reachable_via(n.id())
                    .any(|two_hop_id| two_hop.path_count(two_hop_id) == 1)
        })
        .map(|n| n.id())
        .collect();
    for id in sole_providers {
        select(id, neighbours, two_hop, &mut selected, &mut uncovered);
        debug!(mpr = %id, "Selected MPR (only path)");
    }

    // Step 3: greedy cover of what remains.
    while !uncovered.is_empty() {
        let mut best: Option<(NodeId, usize, Willingness)> = None;

        for neighbour in neighbours.symmetric() {
            if neighbour.is_mpr() || neighbour.willingness() == Willingness::NEVER {
                continue;
            }

            let coverage = two_hop
                .reachable_via(neighbour.id())
                .filter(|id| uncovered.contains(id))
                .count();
            if coverage == 0 {
                continue;
            }

            let better = match best {
                None => true,
                Some((_, best_coverage, best_willingness)) => {
                    coverage > best_coverage
                        || (coverage == best_coverage && neighbour.willingness() > best_willingness)
                }
            };
            if better {
                best = Some((neighbour.id(), coverage, neighbour.willingness()));
            }
        }

        match best {
            Some((id, coverage, willingness)) => {
                select(id, neighbours, two_hop, &mut selected, &mut uncovered);
                debug!(mpr = %id, coverage, willingness = %willingness, "Selected MPR (coverage)");
            }
            None => {
                warn!(
                    uncovered = uncovered.len(),
                    "No remaining candidate covers the leftover two-hop neighbours"
                );
                break;
            }
        }
    }

    debug!(mprs = selected.len(), "MPR selection complete");
    selected
}

/// Mark a neighbour as MPR and remove everything it reaches from the
/// uncovered set.
fn select(
    id: NodeId,
    neighbours: &mut NeighbourTable,
    two_hop: &TwoHopTable,
    selected: &mut Vec<NodeId>,
    uncovered: &mut Vec<NodeId>,
) {
    if let Some(neighbour) = neighbours.get_mut(id) {
        neighbour.set_mpr(true);
    }
    selected.push(id);
    uncovered.retain(|two_hop_id| !two_hop.reachable_via(id).any(|r| r == *two_hop_id));
}
