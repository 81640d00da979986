use std::collections::{BTreeMap, BTreeSet};

use crate::sp_interface::{DistanceVector, NodeId};
use crate::sp_topology::Topology;

/// Ground-truth distances for every ordered pair, sequential Floyd–Warshall.
///
/// Uses each direction's own weight. Missing entries mean unreachable,
/// matching the convention of the simulated tables.
pub fn all_pairs(topology: &Topology) -> BTreeMap<NodeId, DistanceVector> {
    let nodes: Vec<NodeId> = topology.nodes().collect();

    let mut dist: BTreeMap<NodeId, DistanceVector> = BTreeMap::new();
    for u in &nodes {
        let mut row = DistanceVector::new();
        row.insert(*u, 0);
        if let Some(neighbors) = topology.neighbors(*u) {
            for (v, w) in neighbors {
                let entry = row.entry(*v).or_insert(*w);
                *entry = (*entry).min(*w);
            }
        }
        dist.insert(*u, row);
    }

    for k in &nodes {
        let Some(via) = dist.get(k).cloned() else {
            continue;
        };
        for row in dist.values_mut() {
            let Some(to_k) = row.get(k).copied() else {
                continue;
            };
            for (v, k_to_v) in &via {
                let candidate = to_k.saturating_add(*k_to_v);
                match row.get(v) {
                    Some(current) if *current <= candidate => {}
                    _ => {
                        row.insert(*v, candidate);
                    }
                }
            }
        }
    }
    dist
}

/// Percentage of destinations in `truth` the simulated row got exactly right.
/// An entry missing from both counts as correct.
pub fn accuracy(simulated: &DistanceVector, truth: &DistanceVector) -> f64 {
    let destinations: BTreeSet<NodeId> = truth.keys().chain(simulated.keys()).copied().collect();
    if destinations.is_empty() {
        return 100.0;
    }
    let correct = destinations
        .iter()
        .filter(|dest| simulated.get(*dest) == truth.get(*dest))
        .count();
    100.0 * correct as f64 / destinations.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_prefers_two_hops() {
        let topology = Topology::from_edges(3, &[(0, 1, 10), (1, 2, 10), (0, 2, 25)]).unwrap();
        let truth = all_pairs(&topology);

        assert_eq!(truth[&0][&1], 10);
        assert_eq!(truth[&0][&2], 20);
        assert_eq!(truth[&2][&0], 20);
        assert_eq!(truth[&1][&1], 0);
    }

    #[test]
    fn test_asymmetric_and_disconnected() {
        let mut topology = Topology::with_nodes(4);
        topology.add_edge(0, 1, Some(5)).unwrap();
        topology.set_weight(1, 0, 50).unwrap();
        let truth = all_pairs(&topology);

        assert_eq!(truth[&0][&1], 5);
        assert_eq!(truth[&1][&0], 50);
        assert_eq!(truth[&0].get(&3), None);
        assert_eq!(truth[&3].len(), 1);
    }

    #[test]
    fn test_accuracy() {
        let truth: DistanceVector = [(0, 0), (1, 10), (2, 20)].into_iter().collect();
        let exact = truth.clone();
        let off: DistanceVector = [(0, 0), (1, 10), (2, 25)].into_iter().collect();
        let partial: DistanceVector = [(0, 0), (1, 10)].into_iter().collect();

        assert_eq!(accuracy(&exact, &truth), 100.0);
        assert!((accuracy(&off, &truth) - 200.0 / 3.0).abs() < 1e-9);
        assert!((accuracy(&partial, &truth) - 200.0 / 3.0).abs() < 1e-9);
    }
}
