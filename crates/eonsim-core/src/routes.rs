//! Candidate-route enumeration
//!
//! Yen's k-shortest loop-free paths over link lengths, computed once at
//! network build time for every ordered node pair.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::topology::{Network, NodeId};

struct HeapEntry {
    distance: f64,
    node: NodeId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.node == other.node
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap on distance
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.0.cmp(&self.node.0))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn route_length(network: &Network, route: &[NodeId]) -> f64 {
    route
        .windows(2)
        .filter_map(|hop| {
            network
                .link_between(hop[0], hop[1])
                .ok()
                .and_then(|id| network.link(id).ok())
                .map(|l| l.length())
        })
        .sum()
}

fn dijkstra(
    network: &Network,
    source: NodeId,
    target: NodeId,
    banned_edges: &HashSet<(NodeId, NodeId)>,
    banned_nodes: &HashSet<NodeId>,
) -> Option<Vec<NodeId>> {
    let n = network.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<NodeId>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    dist[source.0] = 0.0;
    heap.push(HeapEntry {
        distance: 0.0,
        node: source,
    });

    while let Some(HeapEntry { distance, node }) = heap.pop() {
        if node == target {
            break;
        }
        if distance > dist[node.0] {
            continue;
        }
        for (next, length) in network.neighbors(node) {
            if banned_nodes.contains(&next) {
                continue;
            }
            let edge = normalize(node, next);
            if banned_edges.contains(&edge) {
                continue;
            }
            let candidate = distance + length;
            if candidate < dist[next.0] {
                dist[next.0] = candidate;
                prev[next.0] = Some(node);
                heap.push(HeapEntry {
                    distance: candidate,
                    node: next,
                });
            }
        }
    }

    if dist[target.0].is_infinite() {
        return None;
    }
    let mut route = vec![target];
    let mut cursor = target;
    while let Some(p) = prev[cursor.0] {
        route.push(p);
        cursor = p;
    }
    route.reverse();
    Some(route)
}

fn normalize(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a.0 <= b.0 {
        (a, b)
    } else {
        (b, a)
    }
}

/// Yen's algorithm: up to `k` loop-free routes from `source` to `target`,
/// shortest first.
fn k_shortest_paths(network: &Network, source: NodeId, target: NodeId, k: usize) -> Vec<Vec<NodeId>> {
    let mut found: Vec<Vec<NodeId>> = Vec::new();
    let Some(first) = dijkstra(network, source, target, &HashSet::new(), &HashSet::new()) else {
        return found;
    };
    found.push(first);

    let mut spares: Vec<Vec<NodeId>> = Vec::new();
    while found.len() < k {
        let last = &found[found.len() - 1];
        for spur_idx in 0..last.len() - 1 {
            let spur_node = last[spur_idx];
            let root = &last[..=spur_idx];

            let mut banned_edges = HashSet::new();
            for route in &found {
                if route.len() > spur_idx + 1 && route[..=spur_idx] == *root {
                    banned_edges.insert(normalize(route[spur_idx], route[spur_idx + 1]));
                }
            }
            let banned_nodes: HashSet<NodeId> = root[..spur_idx].iter().copied().collect();

            if let Some(spur) = dijkstra(network, spur_node, target, &banned_edges, &banned_nodes) {
                let mut candidate = root[..spur_idx].to_vec();
                candidate.extend(spur);
                if !found.contains(&candidate) && !spares.contains(&candidate) {
                    spares.push(candidate);
                }
            }
        }
        if spares.is_empty() {
            break;
        }
        spares.sort_by(|a, b| {
            route_length(network, a)
                .partial_cmp(&route_length(network, b))
                .unwrap_or(Ordering::Equal)
        });
        found.push(spares.remove(0));
    }
    found
}

/// Candidate routes for every ordered node pair.
pub(crate) fn candidate_route_table(
    network: &Network,
    k: usize,
) -> HashMap<(NodeId, NodeId), Vec<Vec<NodeId>>> {
    let mut table = HashMap::new();
    for source in 0..network.node_count() {
        for target in 0..network.node_count() {
            if source == target {
                continue;
            }
            let source = NodeId(source);
            let target = NodeId(target);
            let routes = k_shortest_paths(network, source, target, k);
            if !routes.is_empty() {
                table.insert((source, target), routes);
            }
        }
    }
    table
}
