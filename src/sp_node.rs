use std::collections::BTreeMap;

use indexmap::IndexMap;
use log::trace;

use crate::sp_accounting::MessageStats;
use crate::sp_interface::{DistanceVector, Envelope, Message, NodeId, SimTime, Weight};

/// Local state every protocol variant shares.
///
/// Owned by exactly one node task. Nothing outside the owning task mutates
/// the tables; the engine only reads them once time stops advancing.
#[derive(Debug, Clone)]
pub struct NodeCore {
    id: NodeId,
    neighbors: IndexMap<NodeId, Weight>,
    distances: DistanceVector,
    // None is the "no hop" sentinel, always stored for self
    next_hop: BTreeMap<NodeId, Option<NodeId>>,
    bits_sent: u64,
}

impl NodeCore {
    pub fn new(id: NodeId) -> Self {
        let mut distances = DistanceVector::new();
        distances.insert(id, 0);
        let mut next_hop = BTreeMap::new();
        next_hop.insert(id, None);

        Self {
            id,
            neighbors: IndexMap::new(),
            distances,
            next_hop,
            bits_sent: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Register an outgoing edge, topology setup only
    pub fn add_neighbor(&mut self, neighbor: NodeId, weight: Weight) {
        self.neighbors.insert(neighbor, weight);
    }

    pub fn neighbors(&self) -> &IndexMap<NodeId, Weight> {
        &self.neighbors
    }

    pub fn neighbor_ids(&self) -> Vec<NodeId> {
        self.neighbors.keys().copied().collect()
    }

    pub fn weight_to(&self, neighbor: &NodeId) -> Option<Weight> {
        self.neighbors.get(neighbor).copied()
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    /// Merge neighbor edges into the tables: `D[v] = w(self, v)`, first hop `v`
    pub fn merge_neighbors(&mut self) {
        let edges: Vec<(NodeId, Weight)> = self.neighbors.iter().map(|(n, w)| (*n, *w)).collect();
        for (neighbor, weight) in edges {
            self.improve(neighbor, weight, Some(neighbor));
        }
    }

    /// Best known cost to `dest`, None when unreachable
    pub fn distance(&self, dest: &NodeId) -> Option<Weight> {
        self.distances.get(dest).copied()
    }

    pub fn distances(&self) -> &DistanceVector {
        &self.distances
    }

    /// First hop towards `dest`; None when unknown or `dest` is self
    pub fn next_hop(&self, dest: &NodeId) -> Option<NodeId> {
        self.next_hop.get(dest).copied().flatten()
    }

    pub fn next_hops(&self) -> &BTreeMap<NodeId, Option<NodeId>> {
        &self.next_hop
    }

    pub fn bits_sent(&self) -> u64 {
        self.bits_sent
    }

    /// Relax one entry. Only strictly better candidates are taken, which
    /// keeps every entry non-increasing and `D[self]` pinned at zero.
    pub fn improve(&mut self, dest: NodeId, cost: Weight, hop: Option<NodeId>) -> bool {
        match self.distances.get(&dest) {
            Some(current) if *current <= cost => false,
            _ => {
                self.distances.insert(dest, cost);
                self.next_hop.insert(dest, hop);
                true
            }
        }
    }
}

/// What a protocol sees while handling one message.
///
/// Sending goes through here so every outbound message is charged exactly
/// once, both to the node's own counter and the engine-wide totals.
pub struct NodeContext<'a> {
    core: &'a mut NodeCore,
    stats: &'a mut MessageStats,
    outbox: &'a mut Vec<Envelope>,
    now: SimTime,
}

impl<'a> NodeContext<'a> {
    pub fn new(
        core: &'a mut NodeCore,
        stats: &'a mut MessageStats,
        outbox: &'a mut Vec<Envelope>,
        now: SimTime,
    ) -> Self {
        Self {
            core,
            stats,
            outbox,
            now,
        }
    }

    pub fn core(&self) -> &NodeCore {
        &*self.core
    }

    pub fn core_mut(&mut self) -> &mut NodeCore {
        &mut *self.core
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn send(&mut self, to: NodeId, message: Message) {
        let sender = self.core.id;
        let bits = self.stats.record(sender, &message);
        self.core.bits_sent += bits;

        trace!(
            "{} send {} {} -> {} ({} bits)",
            self.now,
            message.kind(),
            sender,
            to,
            bits
        );

        self.outbox.push(Envelope {
            sender,
            receiver: to,
            time: self.now,
            message,
        });
    }

    /// Send a copy of `message` to every neighbor, in neighbor-table order
    pub fn broadcast(&mut self, message: Message) {
        for neighbor in self.core.neighbor_ids() {
            self.send(neighbor, message.clone());
        }
    }
}

/// Capability set shared by the protocol variants.
///
/// The engine drives a variant through `initialize` once the start-up delay
/// has elapsed, then through `handle_message` for every message taken from
/// the node's mailbox. Each call runs to completion; between calls the task
/// is parked on its mailbox.
pub trait NodeProtocol {
    const NAME: &'static str;

    fn new(id: NodeId) -> Self;

    fn initialize(&mut self, core: &mut NodeCore) {
        core.merge_neighbors();
    }

    fn handle_message(&mut self, ctx: &mut NodeContext<'_>, message: Message);

    /// True when the node is not in the middle of a round
    fn is_idle(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_core_self_entries() {
        let core = NodeCore::new(4);
        assert_eq!(core.distance(&4), Some(0));
        assert_eq!(core.next_hops().get(&4), Some(&None));
        assert_eq!(core.next_hop(&4), None);
        assert_eq!(core.bits_sent(), 0);
    }

    #[test]
    fn test_merge_neighbors() {
        let mut core = NodeCore::new(0);
        core.add_neighbor(1, 50);
        core.add_neighbor(2, 100);
        core.merge_neighbors();

        assert_eq!(core.distance(&1), Some(50));
        assert_eq!(core.next_hop(&1), Some(1));
        assert_eq!(core.distance(&2), Some(100));
        assert_eq!(core.degree(), 2);
    }

    #[test]
    fn test_improve_is_monotonic() {
        let mut core = NodeCore::new(0);
        assert!(core.improve(3, 40, Some(1)));
        assert!(!core.improve(3, 40, Some(2)));
        assert!(!core.improve(3, 90, Some(2)));
        assert!(core.improve(3, 30, Some(2)));

        assert_eq!(core.distance(&3), Some(30));
        assert_eq!(core.next_hop(&3), Some(2));

        // self can never be improved below zero
        assert!(!core.improve(0, 0, Some(1)));
        assert_eq!(core.next_hop(&0), None);
    }

    #[test]
    fn test_send_charges_node_and_engine() {
        let mut core = NodeCore::new(0);
        core.add_neighbor(1, 10);
        core.add_neighbor(2, 10);
        let mut stats = MessageStats::new();
        let mut outbox = Vec::new();

        let mut ctx = NodeContext::new(&mut core, &mut stats, &mut outbox, 3);
        let msg = Message::NonChild { pivot: 0, sender: 0 };
        ctx.broadcast(msg.clone());

        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[0].receiver, 1);
        assert_eq!(outbox[1].receiver, 2);
        assert_eq!(outbox[0].time, 3);
        assert_eq!(stats.total_messages, 2);
        assert_eq!(core.bits_sent(), 2 * msg.bit_cost());
    }
}
