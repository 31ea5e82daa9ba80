//! Shortest path computation over the link-state graph.
//!
//! The graph is the union of this node's symmetric links and the advertised
//! links in the topology database. Every edge costs 1, so Dijkstra reduces to
//! a breadth-first relaxation, but parent pointers are kept so the next hop
//! towards every destination can be read off the tree.

use tracing::trace;

use crate::{
    neighbour::NeighbourTable, node_id::NodeId, topology::TopologyTable, two_hop::TwoHopTable,
};

/// Upper bound on the number of distinct nodes considered in one
/// computation. Nodes past the bound are ignored; the bound exists to keep
/// the computation predictable on degenerate inputs.
pub const MAX_NODES: usize = 50;

/// A directed edge in the link-state graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

/// A computed route towards a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputedRoute {
    pub dest: NodeId,
    pub next_hop: NodeId,
    pub metric: u32,
    pub hops: u32,
}

/// Union the local symmetric links, the sensed two-hop links and the valid
/// advertised links into an edge list, deduplicated on (from, to).
///
/// The two-hop set is part of the graph so destinations two hops out are
/// routable from HELLO sensing alone, before any TC about them arrives.
pub fn build_graph(
    self_id: NodeId,
    neighbours: &NeighbourTable,
    two_hop: &TwoHopTable,
    topology: &TopologyTable,
    now: u64,
) -> Vec<Edge> {
    let mut edges: Vec<Edge> = Vec::new();

    for neighbour in neighbours.symmetric() {
        edges.push(Edge {
            from: self_id,
            to: neighbour.id(),
        });
    }

    for assoc in two_hop.iter() {
        let edge = Edge {
            from: assoc.via_id(),
            to: assoc.two_hop_id(),
        };
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    }

    for link in topology.valid_links(now) {
        let edge = Edge {
            from: link.from(),
            to: link.to(),
        };
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    }

    trace!(edges = edges.len(), "Built link-state graph");
    edges
}

/// Run Dijkstra from `source` over the edge list and return a route for
/// every reachable destination. Unit edge cost; the next hop is derived by
/// walking the parent chain back until the step adjacent to the source.
pub fn dijkstra(source: NodeId, edges: &[Edge]) -> Vec<ComputedRoute> {
    // Enumerate the distinct nodes, source first.
    let mut nodes = Vec::with_capacity(MAX_NODES);
    nodes.push(source);
    for edge in edges {
        for id in [edge.from, edge.to] {
            if nodes.len() >= MAX_NODES {
                break;
            }
            if !nodes.contains(&id) {
                nodes.push(id);
            }
        }
    }

    let index_of = |id: NodeId| nodes.iter().position(|n| *n == id);

    let mut dist = vec![u32::MAX; nodes.len()];
    let mut parent: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut visited = vec![false; nodes.len()];
    dist[0] = 0;

    loop {
        // Closest unvisited node.
        let Some(u) = (0..nodes.len())
            .filter(|i| !visited[*i] && dist[*i] != u32::MAX)
            .min_by_key(|i| dist[*i])
        else {
            break;
        };
        visited[u] = true;

        for edge in edges.iter().filter(|e| e.from == nodes[u]) {
            let Some(v) = index_of(edge.to) else {
                continue;
            };
            if visited[v] {
                continue;
            }
            let candidate = dist[u] + 1;
            if candidate < dist[v] {
                dist[v] = candidate;
                parent[v] = Some(u);
            }
        }
    }

    let mut routes = Vec::new();
    for (i, dest) in nodes.iter().enumerate().skip(1) {
        if dist[i] == u32::MAX {
            continue;
        }

        // Walk back to the node whose parent is the source.
        let mut step = i;
        while let Some(p) = parent[step] {
            if p == 0 {
                break;
            }
            step = p;
        }

        routes.push(ComputedRoute {
            dest: *dest,
            next_hop: nodes[step],
            metric: dist[i],
            hops: dist[i],
        });
    }

    routes
}

#[cfg(test)]
mod tests {
    use super::{dijkstra, Edge, MAX_NODES};
    use crate::node_id::NodeId;

    fn edge(from: u32, to: u32) -> Edge {
        Edge {
            from: NodeId::new(from),
            to: NodeId::new(to),
        }
    }

    #[test]
    fn direct_neighbours_route_directly() {
        let routes = dijkstra(NodeId::new(1), &[edge(1, 2), edge(1, 3)]);

        assert_eq!(routes.len(), 2);
        for route in routes {
            assert_eq!(route.hops, 1);
            assert_eq!(route.next_hop, route.dest);
        }
    }

    #[test]
    fn chain_routes_through_relay() {
        let routes = dijkstra(NodeId::new(1), &[edge(1, 2), edge(2, 3), edge(3, 4)]);

        let to_4 = routes
            .iter()
            .find(|r| r.dest == NodeId::new(4))
            .expect("node 4 is reachable");
        assert_eq!(to_4.hops, 3);
        assert_eq!(to_4.next_hop, NodeId::new(2));
    }

    #[test]
    fn shorter_path_is_preferred() {
        let routes = dijkstra(
            NodeId::new(1),
            &[
                edge(1, 2),
                edge(2, 3),
                edge(3, 4),
                // Direct shortcut from a second neighbour.
                edge(1, 5),
                edge(5, 4),
            ],
        );

        let to_4 = routes
            .iter()
            .find(|r| r.dest == NodeId::new(4))
            .expect("node 4 is reachable");
        assert_eq!(to_4.hops, 2);
        assert_eq!(to_4.next_hop, NodeId::new(5));
    }

    #[test]
    fn unreachable_nodes_get_no_route() {
        // 4 -> 5 is a link we heard about, but nothing connects us to 4.
        let routes = dijkstra(NodeId::new(1), &[edge(1, 2), edge(4, 5)]);

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].dest, NodeId::new(2));
    }

    #[test]
    fn node_bound_is_honoured() {
        let mut edges = Vec::new();
        for i in 0..(MAX_NODES as u32 * 2) {
            edges.push(edge(1, 1000 + i));
        }

        let routes = dijkstra(NodeId::new(1), &edges);
        // Source occupies one slot, so at most MAX_NODES - 1 destinations.
        assert_eq!(routes.len(), MAX_NODES - 1);
    }
}
