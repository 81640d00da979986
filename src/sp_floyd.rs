//! Flooding variant of distributed Floyd–Warshall.
//!
//! The pivot starts a round by broadcasting its own table. Every node that
//! receives a flooded table relaxes through the sender and re-broadcasts its
//! own table when it hears of the pivot for the first time or when some entry
//! strictly improved. Each node can only improve finitely often, so a round
//! settles, but the number of rebroadcasts is not bounded by the edge count:
//! that is the message explosion this variant exists to measure.

use hashbrown::HashSet;
use log::trace;

use crate::sp_interface::{DistanceVector, Message, NodeId};
use crate::sp_node::{NodeContext, NodeCore, NodeProtocol};

#[derive(Debug, Default)]
pub struct FloydNode {
    // pivots already folded into D
    heard_from: HashSet<NodeId>,
    rebroadcasts: u64,
}

impl FloydNode {
    pub fn has_heard(&self, pivot: &NodeId) -> bool {
        self.heard_from.contains(pivot)
    }

    /// Number of broadcasts triggered by flooded tables (not by round start)
    pub fn rebroadcasts(&self) -> u64 {
        self.rebroadcasts
    }

    fn broadcast_vector(ctx: &mut NodeContext<'_>, pivot: NodeId) {
        let message = Message::FloodDw {
            pivot_src: pivot,
            vector: ctx.core().distances().clone(),
            sender: ctx.core().id(),
        };
        ctx.broadcast(message);
    }

    /// `D[v] = min(D[v], w(self, sender) + V[v])` for every `v` in `V`.
    ///
    /// A sender that is not a neighbor yields no finite candidate.
    fn relax(core: &mut NodeCore, vector: &DistanceVector, sender: NodeId) -> bool {
        let Some(to_sender) = core.weight_to(&sender) else {
            return false;
        };

        let mut improved = false;
        for (dest, cost) in vector {
            let candidate = to_sender.saturating_add(*cost);
            if core.improve(*dest, candidate, Some(sender)) {
                improved = true;
            }
        }
        improved
    }
}

impl NodeProtocol for FloydNode {
    const NAME: &'static str = "floyd";

    fn new(_id: NodeId) -> Self {
        Self::default()
    }

    fn handle_message(&mut self, ctx: &mut NodeContext<'_>, message: Message) {
        match message {
            Message::StartRound { pivot } => {
                // non-pivots wait for the flood to reach them
                if pivot == ctx.core().id() {
                    self.heard_from.insert(pivot);
                    Self::broadcast_vector(ctx, pivot);
                }
            }
            Message::FloodDw {
                pivot_src,
                vector,
                sender,
            } => {
                let first_time = self.heard_from.insert(pivot_src);
                let improved = Self::relax(ctx.core_mut(), &vector, sender);

                if first_time || improved {
                    trace!(
                        "{} floyd {} rebroadcast w:{} first:{} improved:{}",
                        ctx.now(),
                        ctx.core().id(),
                        pivot_src,
                        first_time,
                        improved
                    );
                    self.rebroadcasts += 1;
                    Self::broadcast_vector(ctx, pivot_src);
                }
            }
            _ => {} // not part of this protocol - discard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sp_accounting::MessageStats;

    fn core_with(id: NodeId, neighbors: &[(NodeId, u64)]) -> NodeCore {
        let mut core = NodeCore::new(id);
        for (n, w) in neighbors {
            core.add_neighbor(*n, *w);
        }
        core.merge_neighbors();
        core
    }

    fn flood(pivot: NodeId, sender: NodeId, entries: &[(NodeId, u64)]) -> Message {
        Message::FloodDw {
            pivot_src: pivot,
            vector: entries.iter().copied().collect(),
            sender,
        }
    }

    #[test]
    fn test_pivot_broadcasts_on_start() {
        let mut core = core_with(1, &[(0, 10), (2, 15)]);
        let mut node = FloydNode::new(1);
        let mut stats = MessageStats::new();
        let mut outbox = Vec::new();

        let mut ctx = NodeContext::new(&mut core, &mut stats, &mut outbox, 0);
        node.handle_message(&mut ctx, Message::StartRound { pivot: 1 });

        assert!(node.has_heard(&1));
        assert_eq!(outbox.len(), 2);
        match &outbox[0].message {
            Message::FloodDw { vector, sender, .. } => {
                assert_eq!(*sender, 1);
                assert_eq!(vector.get(&0), Some(&10));
                assert_eq!(vector.get(&2), Some(&15));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_non_pivot_waits_on_start() {
        let mut core = core_with(0, &[(1, 10)]);
        let mut node = FloydNode::new(0);
        let mut stats = MessageStats::new();
        let mut outbox = Vec::new();

        let mut ctx = NodeContext::new(&mut core, &mut stats, &mut outbox, 0);
        node.handle_message(&mut ctx, Message::StartRound { pivot: 1 });

        assert!(outbox.is_empty());
        assert!(!node.has_heard(&1));
    }

    #[test]
    fn test_rebroadcast_only_on_first_hear_or_improvement() {
        // chain 0 -10- 1 -15- 2, seen from node 0
        let mut core = core_with(0, &[(1, 10)]);
        let mut node = FloydNode::new(0);
        let mut stats = MessageStats::new();
        let mut outbox = Vec::new();

        {
            let mut ctx = NodeContext::new(&mut core, &mut stats, &mut outbox, 1);
            // first time hearing of pivot 1 and learns about 2
            node.handle_message(&mut ctx, flood(1, 1, &[(0, 10), (1, 0), (2, 15)]));
        }
        assert_eq!(outbox.len(), 1);
        assert_eq!(core.distance(&1), Some(10));
        assert_eq!(core.distance(&2), Some(25));
        assert_eq!(core.next_hop(&2), Some(1));

        outbox.clear();
        {
            let mut ctx = NodeContext::new(&mut core, &mut stats, &mut outbox, 2);
            // same table again: heard already, nothing improves
            node.handle_message(&mut ctx, flood(1, 1, &[(0, 10), (1, 0), (2, 15)]));
        }
        assert!(outbox.is_empty());
        assert_eq!(node.rebroadcasts(), 1);
    }

    #[test]
    fn test_unknown_sender_never_improves() {
        let mut core = core_with(0, &[(1, 10)]);
        let mut node = FloydNode::new(0);
        node.heard_from.insert(5);
        let mut stats = MessageStats::new();
        let mut outbox = Vec::new();

        let mut ctx = NodeContext::new(&mut core, &mut stats, &mut outbox, 1);
        node.handle_message(&mut ctx, flood(5, 9, &[(3, 1)]));

        assert!(outbox.is_empty());
        assert_eq!(core.distance(&3), None);
    }
}
