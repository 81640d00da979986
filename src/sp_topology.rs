// Graph the simulated nodes run on
//
// Read-only once the engine is built. Neighbor relations are symmetric, edge
// weights are per direction: adding u -> v makes u and v neighbors of each
// other, and a direction nobody set a weight for costs DEFAULT_WEIGHT.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::sp_error::SimError;
use crate::sp_interface::{NodeId, Weight, DEFAULT_WEIGHT};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    adjacency: BTreeMap<NodeId, IndexMap<NodeId, Weight>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes `0..n` without edges
    pub fn with_nodes(n: usize) -> Self {
        let mut topology = Self::new();
        for id in 0..n as NodeId {
            topology.add_node(id);
        }
        topology
    }

    pub fn add_node(&mut self, id: NodeId) {
        self.adjacency.entry(id).or_default();
    }

    /// Link `from -> to`.
    ///
    /// `weight` sets the `from -> to` direction only (DEFAULT_WEIGHT when
    /// None and not set before); the reverse direction is created with the
    /// default weight if it does not exist yet.
    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        weight: Option<Weight>,
    ) -> Result<(), SimError> {
        if from == to {
            return Err(SimError::SelfLoop(from));
        }
        if !self.adjacency.contains_key(&to) {
            return Err(SimError::UnknownNode(to));
        }
        let forward = self
            .adjacency
            .get_mut(&from)
            .ok_or(SimError::UnknownNode(from))?;
        match weight {
            Some(w) => {
                forward.insert(to, w);
            }
            None => {
                forward.entry(to).or_insert(DEFAULT_WEIGHT);
            }
        }

        if let Some(reverse) = self.adjacency.get_mut(&to) {
            reverse.entry(from).or_insert(DEFAULT_WEIGHT);
        }
        Ok(())
    }

    /// Link both directions with the same weight
    pub fn add_undirected(&mut self, a: NodeId, b: NodeId, weight: Weight) -> Result<(), SimError> {
        self.add_edge(a, b, Some(weight))?;
        self.set_weight(b, a, weight)
    }

    /// Set one direction's weight, creating the link if needed
    pub fn set_weight(&mut self, from: NodeId, to: NodeId, weight: Weight) -> Result<(), SimError> {
        self.add_edge(from, to, Some(weight))
    }

    pub fn remove_link(&mut self, a: NodeId, b: NodeId) {
        if let Some(n) = self.adjacency.get_mut(&a) {
            n.shift_remove(&b);
        }
        if let Some(n) = self.adjacency.get_mut(&b) {
            n.shift_remove(&a);
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.adjacency.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn neighbors(&self, id: NodeId) -> Option<&IndexMap<NodeId, Weight>> {
        self.adjacency.get(&id)
    }

    pub fn weight(&self, from: NodeId, to: NodeId) -> Option<Weight> {
        self.adjacency.get(&from)?.get(&to).copied()
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.adjacency.get(&id).map_or(0, |n| n.len())
    }

    /// Number of links (each neighbor pair once)
    pub fn link_count(&self) -> usize {
        self.adjacency.values().map(|n| n.len()).sum::<usize>() / 2
    }

    pub fn average_degree(&self) -> f64 {
        if self.adjacency.is_empty() {
            return 0.0;
        }
        let total: usize = self.adjacency.values().map(|n| n.len()).sum();
        total as f64 / self.adjacency.len() as f64
    }

    /// Neighbor pairs `(a, b)` with `a < b`, ascending
    pub fn links(&self) -> Vec<(NodeId, NodeId)> {
        let mut links = Vec::new();
        for (a, neighbors) in &self.adjacency {
            let mut higher: Vec<NodeId> = neighbors.keys().copied().filter(|b| b > a).collect();
            higher.sort_unstable();
            links.extend(higher.into_iter().map(|b| (*a, b)));
        }
        links
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// `0 - 1 - ... - n` with `weights[i]` on link `i - i+1`
    pub fn chain(weights: &[Weight]) -> Self {
        let mut topology = Self::with_nodes(weights.len() + 1);
        for (i, w) in weights.iter().enumerate() {
            let i = i as NodeId;
            topology.link(i, i + 1, *w);
        }
        topology
    }

    pub fn ring(n: usize, weight: Weight) -> Self {
        let mut topology = Self::with_nodes(n);
        if n < 3 {
            // two nodes form a single link, fewer have none
            if n == 2 {
                topology.link(0, 1, weight);
            }
            return topology;
        }
        for i in 0..n as NodeId {
            topology.link(i, (i + 1) % n as NodeId, weight);
        }
        topology
    }

    pub fn fully_connected(n: usize, weight: Weight) -> Self {
        let mut topology = Self::with_nodes(n);
        for a in 0..n as NodeId {
            for b in (a + 1)..n as NodeId {
                topology.link(a, b, weight);
            }
        }
        topology
    }

    // Builders only: both ids exist and differ, nothing to validate
    fn link(&mut self, a: NodeId, b: NodeId, weight: Weight) {
        self.adjacency.entry(a).or_default().insert(b, weight);
        self.adjacency.entry(b).or_default().insert(a, weight);
    }

    /// Nodes `0..n`, links given as `(a, b, weight)` in both directions
    pub fn from_edges(n: usize, edges: &[(NodeId, NodeId, Weight)]) -> Result<Self, SimError> {
        let mut topology = Self::with_nodes(n);
        for (a, b, w) in edges {
            topology.add_undirected(*a, *b, *w)?;
        }
        Ok(topology)
    }

    /// Every pair linked with probability `connectivity`, weights uniform in
    /// the inclusive range. Same seed, same graph.
    pub fn random(
        n: usize,
        connectivity: f64,
        weights: (Weight, Weight),
        seed: u64,
    ) -> Result<Self, SimError> {
        if !(0.0..=1.0).contains(&connectivity) {
            return Err(SimError::InvalidProbability(connectivity));
        }
        if weights.0 > weights.1 {
            return Err(SimError::InvalidWeightRange(weights.0, weights.1));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut topology = Self::with_nodes(n);
        for a in 0..n as NodeId {
            for b in (a + 1)..n as NodeId {
                if rng.gen_bool(connectivity) {
                    let w = rng.gen_range(weights.0..=weights.1);
                    topology.add_undirected(a, b, w)?;
                }
            }
        }
        Ok(topology)
    }

    // ========================================================================
    // Reshaping
    // ========================================================================

    /// Drop each link with probability `1 - keep`, then keep only the largest
    /// connected component, relabelled to `0..n`.
    pub fn sparsify(&self, keep: f64, seed: u64) -> Result<Self, SimError> {
        if !(0.0..=1.0).contains(&keep) {
            return Err(SimError::InvalidProbability(keep));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut sparse = self.clone();
        for (a, b) in self.links() {
            if rng.gen::<f64>() > keep {
                sparse.remove_link(a, b);
            }
        }
        Ok(sparse.largest_component())
    }

    /// Connected components, each sorted ascending, in order of smallest id
    pub fn components(&self) -> Vec<Vec<NodeId>> {
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();

        for start in self.nodes() {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for neighbor in self.adjacency[&node].keys() {
                    if seen.insert(*neighbor) {
                        component.push(*neighbor);
                        queue.push_back(*neighbor);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Largest component relabelled to `0..n` in ascending id order.
    /// Ties go to the component holding the smallest id.
    pub fn largest_component(&self) -> Self {
        let components = self.components();
        let Some(largest) = components
            .iter()
            .enumerate()
            .max_by_key(|(i, c)| (c.len(), std::cmp::Reverse(*i)))
            .map(|(_, c)| c)
        else {
            return Self::new();
        };

        let relabel: BTreeMap<NodeId, NodeId> = largest
            .iter()
            .enumerate()
            .map(|(new, old)| (*old, new as NodeId))
            .collect();

        let mut topology = Self::with_nodes(largest.len());
        for old in largest {
            let from = relabel[old];
            for (neighbor, weight) in &self.adjacency[old] {
                let to = relabel[neighbor];
                if let Some(n) = topology.adjacency.get_mut(&from) {
                    n.insert(to, *weight);
                }
            }
        }
        topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_edge_defaults_and_asymmetry() {
        let mut topology = Topology::with_nodes(2);
        topology.add_edge(0, 1, Some(30)).unwrap();

        assert_eq!(topology.weight(0, 1), Some(30));
        assert_eq!(topology.weight(1, 0), Some(DEFAULT_WEIGHT));

        topology.set_weight(1, 0, 45).unwrap();
        assert_eq!(topology.weight(1, 0), Some(45));
        assert_eq!(topology.weight(0, 1), Some(30));
        assert_eq!(topology.link_count(), 1);
    }

    #[test]
    fn test_add_edge_errors() {
        let mut topology = Topology::with_nodes(2);
        assert_eq!(topology.add_edge(0, 0, None), Err(SimError::SelfLoop(0)));
        assert_eq!(topology.add_edge(0, 5, None), Err(SimError::UnknownNode(5)));
        assert_eq!(topology.add_edge(7, 1, None), Err(SimError::UnknownNode(7)));
    }

    #[test]
    fn test_builders() {
        let chain = Topology::chain(&[10, 15]);
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.weight(1, 2), Some(15));
        assert_eq!(chain.degree(1), 2);

        let ring = Topology::ring(5, 7);
        assert_eq!(ring.link_count(), 5);
        assert!((ring.average_degree() - 2.0).abs() < f64::EPSILON);

        let full = Topology::fully_connected(4, 1);
        assert_eq!(full.link_count(), 6);
        assert_eq!(full.links()[0], (0, 1));
    }

    #[test]
    fn test_builders_link_both_directions() {
        let chain = Topology::chain(&[10, 15]);
        assert_eq!(chain.links(), vec![(0, 1), (1, 2)]);
        assert_eq!(chain.weight(1, 0), Some(10));
        assert_eq!(chain.weight(2, 1), Some(15));
        assert_eq!(chain.weight(0, 2), None);

        let ring = Topology::ring(4, 7);
        assert_eq!(ring.links(), vec![(0, 1), (0, 3), (1, 2), (2, 3)]);
        assert!(ring.nodes().all(|id| ring.weight(id, id).is_none()));

        assert_eq!(Topology::ring(2, 3).links(), vec![(0, 1)]);
        assert_eq!(Topology::ring(1, 3).link_count(), 0);
        assert_eq!(Topology::ring(1, 3).len(), 1);

        let full = Topology::fully_connected(3, 4);
        for (a, b) in full.links() {
            assert_eq!(full.weight(a, b), Some(4));
            assert_eq!(full.weight(b, a), Some(4));
        }
        assert_eq!(Topology::chain(&[]).len(), 1);
    }

    #[test]
    fn test_random_is_seeded() {
        let a = Topology::random(12, 0.3, (100, 900), 9).unwrap();
        let b = Topology::random(12, 0.3, (100, 900), 9).unwrap();
        assert_eq!(a, b);

        for (x, y) in a.links() {
            let w = a.weight(x, y).unwrap();
            assert!((100..=900).contains(&w));
            assert_eq!(a.weight(y, x), Some(w));
        }

        assert!(Topology::random(3, 1.5, (1, 2), 0).is_err());
        assert!(Topology::random(3, 0.5, (5, 2), 0).is_err());
    }

    #[test]
    fn test_largest_component_relabels() {
        // {0,1} and {2,3,4}
        let topology = Topology::from_edges(5, &[(0, 1, 5), (2, 3, 6), (3, 4, 7)]).unwrap();
        assert_eq!(topology.components(), vec![vec![0, 1], vec![2, 3, 4]]);

        let largest = topology.largest_component();
        assert_eq!(largest.len(), 3);
        assert_eq!(largest.weight(0, 1), Some(6));
        assert_eq!(largest.weight(1, 2), Some(7));
        assert_eq!(largest.components().len(), 1);
    }

    #[test]
    fn test_sparsify_keeps_connected_subgraph() {
        let full = Topology::fully_connected(10, 50);

        let same = full.sparsify(1.0, 3).unwrap();
        assert_eq!(same, full);

        let sparse = full.sparsify(0.3, 3).unwrap();
        assert!(sparse.len() <= 10);
        assert!(sparse.link_count() <= full.link_count());
        assert_eq!(sparse.components().len(), 1);
    }
}
