//! Toueg's pivot propagation over per-pivot shortest-path trees.
//!
//! A round for pivot `w` has three phases on every node:
//!
//! 1. pivot selection - rounds for pivots already processed are ignored
//! 2. tree construction - tell every neighbor whether it is our parent
//!    towards `w` (`CHILD`) or not (`NONCHILD`), then collect exactly
//!    `degree` status messages tagged `w`, remembering who claimed us
//! 3. propagation - if `w` is reachable, wait for `w`'s table from the
//!    parent, forward it unchanged to the children and relax through `w`
//!
//! All phases share the node's single mailbox. Whatever does not match the
//! current phase (wrong pivot, wrong type) is dropped, never deferred.

use std::collections::BTreeMap;
use std::mem;

use hashbrown::HashSet;
use log::{debug, trace};

use crate::sp_interface::{DistanceVector, Message, NodeId};
use crate::sp_node::{NodeContext, NodeCore, NodeProtocol};

/// Remaining status messages for the tree of one pivot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuota {
    pub pivot: NodeId,
    pub remaining: usize,
    pub children: Vec<NodeId>,
}

impl StatusQuota {
    pub fn new(pivot: NodeId, degree: usize) -> Self {
        Self {
            pivot,
            remaining: degree,
            children: Vec::new(),
        }
    }

    /// Count a status message if it belongs to this tree.
    ///
    /// Returns false for anything that must be discarded: other pivots,
    /// other message types, or surplus messages once the quota is met.
    pub fn accept(&mut self, message: &Message) -> bool {
        if self.remaining == 0 {
            return false;
        }
        match message {
            Message::Child { pivot, sender } if *pivot == self.pivot => {
                self.children.push(*sender);
            }
            Message::NonChild { pivot, .. } if *pivot == self.pivot => {}
            _ => return false,
        }
        self.remaining -= 1;
        true
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TouegPhase {
    AwaitRound,
    AwaitStatus(StatusQuota),
    AwaitData {
        pivot: NodeId,
        children: Vec<NodeId>,
    },
}

#[derive(Debug)]
pub struct TouegNode {
    processed: HashSet<NodeId>,
    phase: TouegPhase,
    // children per pivot tree, as recorded in the last status phase
    trees: BTreeMap<NodeId, Vec<NodeId>>,
    discarded: u64,
}

impl TouegNode {
    pub fn phase(&self) -> &TouegPhase {
        &self.phase
    }

    pub fn is_processed(&self, pivot: &NodeId) -> bool {
        self.processed.contains(pivot)
    }

    pub fn children(&self, pivot: &NodeId) -> Option<&[NodeId]> {
        self.trees.get(pivot).map(|c| c.as_slice())
    }

    /// Messages dropped because they did not fit the current phase
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn discard(&mut self, ctx: &NodeContext<'_>, message: &Message) {
        self.discarded += 1;
        trace!(
            "{} toueg {} drop {} w:{}",
            ctx.now(),
            ctx.core().id(),
            message.kind(),
            message.pivot()
        );
    }

    fn start_round(&mut self, ctx: &mut NodeContext<'_>, pivot: NodeId) {
        let me = ctx.core().id();
        let parent = ctx.core().next_hop(&pivot);

        for neighbor in ctx.core().neighbor_ids() {
            let status = if parent == Some(neighbor) {
                Message::Child { pivot, sender: me }
            } else {
                Message::NonChild { pivot, sender: me }
            };
            ctx.send(neighbor, status);
        }

        let quota = StatusQuota::new(pivot, ctx.core().degree());
        if quota.is_complete() {
            self.finish_tree(ctx, pivot, Vec::new());
        } else {
            self.phase = TouegPhase::AwaitStatus(quota);
        }
    }

    fn finish_tree(&mut self, ctx: &mut NodeContext<'_>, pivot: NodeId, children: Vec<NodeId>) {
        self.trees.insert(pivot, children.clone());

        if ctx.core().distance(&pivot).is_none() {
            // pivot unreachable from here, nothing to propagate
            self.complete_round(pivot);
            return;
        }

        if pivot == ctx.core().id() {
            let own = ctx.core().distances().clone();
            self.propagate(ctx, pivot, own, &children);
        } else if ctx.core().next_hop(&pivot).is_some() {
            self.phase = TouegPhase::AwaitData { pivot, children };
        } else {
            self.propagate(ctx, pivot, DistanceVector::new(), &children);
        }
    }

    fn propagate(
        &mut self,
        ctx: &mut NodeContext<'_>,
        pivot: NodeId,
        vector: DistanceVector,
        children: &[NodeId],
    ) {
        for child in children {
            ctx.send(
                *child,
                Message::PivotData {
                    pivot_src: pivot,
                    vector: vector.clone(),
                },
            );
        }

        let improved = Self::relax(ctx.core_mut(), pivot, &vector);
        debug!(
            "{} toueg {} w:{} children:{} improved:{}",
            ctx.now(),
            ctx.core().id(),
            pivot,
            children.len(),
            improved
        );
        self.complete_round(pivot);
    }

    /// `D[v] = min(D[v], D[w] + Dw[v])`, taking the pivot's own first hop.
    ///
    /// The new first hop is `next_hop[w]`, not the node the table came
    /// from; it need not be an edge towards `v` itself.
    fn relax(core: &mut NodeCore, pivot: NodeId, vector: &DistanceVector) -> usize {
        let Some(to_pivot) = core.distance(&pivot) else {
            return 0;
        };
        let hop = core.next_hop(&pivot);

        let mut improved = 0;
        for (dest, cost) in vector {
            if core.improve(*dest, to_pivot.saturating_add(*cost), hop) {
                improved += 1;
            }
        }
        improved
    }

    fn complete_round(&mut self, pivot: NodeId) {
        self.processed.insert(pivot);
        self.phase = TouegPhase::AwaitRound;
    }
}

impl NodeProtocol for TouegNode {
    const NAME: &'static str = "toueg";

    fn new(_id: NodeId) -> Self {
        Self {
            processed: HashSet::new(),
            phase: TouegPhase::AwaitRound,
            trees: BTreeMap::new(),
            discarded: 0,
        }
    }

    fn handle_message(&mut self, ctx: &mut NodeContext<'_>, message: Message) {
        match mem::replace(&mut self.phase, TouegPhase::AwaitRound) {
            TouegPhase::AwaitRound => match message {
                Message::StartRound { pivot } if !self.processed.contains(&pivot) => {
                    self.start_round(ctx, pivot);
                }
                other => self.discard(ctx, &other),
            },
            TouegPhase::AwaitStatus(mut quota) => {
                if !quota.accept(&message) {
                    self.discard(ctx, &message);
                }
                if quota.is_complete() {
                    let StatusQuota { pivot, children, .. } = quota;
                    self.finish_tree(ctx, pivot, children);
                } else {
                    self.phase = TouegPhase::AwaitStatus(quota);
                }
            }
            TouegPhase::AwaitData { pivot, children } => match message {
                Message::PivotData { pivot_src, vector } if pivot_src == pivot => {
                    self.propagate(ctx, pivot, vector, &children);
                }
                other => {
                    self.discard(ctx, &other);
                    self.phase = TouegPhase::AwaitData { pivot, children };
                }
            },
        }
    }

    fn is_idle(&self) -> bool {
        self.phase == TouegPhase::AwaitRound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sp_accounting::MessageStats;
    use crate::sp_interface::Envelope;

    fn core_with(id: NodeId, neighbors: &[(NodeId, u64)]) -> NodeCore {
        let mut core = NodeCore::new(id);
        for (n, w) in neighbors {
            core.add_neighbor(*n, *w);
        }
        core.merge_neighbors();
        core
    }

    fn deliver(node: &mut TouegNode, core: &mut NodeCore, msg: Message) -> Vec<Envelope> {
        let mut stats = MessageStats::new();
        let mut outbox = Vec::new();
        let mut ctx = NodeContext::new(core, &mut stats, &mut outbox, 0);
        node.handle_message(&mut ctx, msg);
        outbox
    }

    #[test]
    fn test_quota_ignores_other_pivots_and_types() {
        let mut quota = StatusQuota::new(2, 2);

        assert!(!quota.accept(&Message::Child { pivot: 1, sender: 5 }));
        assert!(!quota.accept(&Message::StartRound { pivot: 2 }));
        assert!(quota.accept(&Message::Child { pivot: 2, sender: 5 }));
        assert!(!quota.is_complete());
        assert!(quota.accept(&Message::NonChild { pivot: 2, sender: 6 }));
        assert!(quota.is_complete());
        // surplus status is not counted
        assert!(!quota.accept(&Message::Child { pivot: 2, sender: 7 }));
        assert_eq!(quota.children, vec![5]);
    }

    #[test]
    fn test_status_sent_to_every_neighbor() {
        // node 0 in triangle 0-1 (10), 0-2 (25); parent towards 1 is 1
        let mut core = core_with(0, &[(1, 10), (2, 25)]);
        let mut node = TouegNode::new(0);

        let out = deliver(&mut node, &mut core, Message::StartRound { pivot: 1 });

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].message, Message::Child { pivot: 1, sender: 0 });
        assert_eq!(out[1].message, Message::NonChild { pivot: 1, sender: 0 });
        assert!(matches!(node.phase(), TouegPhase::AwaitStatus(q) if q.remaining == 2));
    }

    #[test]
    fn test_short_quota_does_not_proceed() {
        let mut core = core_with(0, &[(1, 10), (2, 25)]);
        let mut node = TouegNode::new(0);

        deliver(&mut node, &mut core, Message::StartRound { pivot: 0 });
        let out = deliver(&mut node, &mut core, Message::Child { pivot: 0, sender: 1 });

        assert!(out.is_empty());
        assert!(!node.is_processed(&0));
        assert!(!node.is_idle());
    }

    #[test]
    fn test_pivot_propagates_own_table_to_children() {
        let mut core = core_with(0, &[(1, 10), (2, 25)]);
        let mut node = TouegNode::new(0);

        deliver(&mut node, &mut core, Message::StartRound { pivot: 0 });
        deliver(&mut node, &mut core, Message::Child { pivot: 0, sender: 1 });
        let out = deliver(&mut node, &mut core, Message::NonChild { pivot: 0, sender: 2 });

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].receiver, 1);
        match &out[0].message {
            Message::PivotData { pivot_src, vector } => {
                assert_eq!(*pivot_src, 0);
                assert_eq!(vector, core.distances());
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert!(node.is_processed(&0));
        assert!(node.is_idle());
        assert_eq!(node.children(&0), Some(&[1][..]));
    }

    #[test]
    fn test_waits_for_parent_data_then_relaxes() {
        // node 0 learns 0->2 = 20 through pivot 1 (0-1 = 10, 1-2 = 10)
        let mut core = core_with(0, &[(1, 10), (2, 25)]);
        let mut node = TouegNode::new(0);

        deliver(&mut node, &mut core, Message::StartRound { pivot: 1 });
        deliver(&mut node, &mut core, Message::NonChild { pivot: 1, sender: 1 });
        deliver(&mut node, &mut core, Message::NonChild { pivot: 1, sender: 2 });
        assert!(matches!(node.phase(), TouegPhase::AwaitData { pivot: 1, .. }));

        // wrong pivot is dropped, still waiting
        let dropped = Message::PivotData {
            pivot_src: 2,
            vector: [(2, 0)].into_iter().collect(),
        };
        deliver(&mut node, &mut core, dropped);
        assert_eq!(node.discarded(), 1);
        assert_eq!(core.distance(&2), Some(25));

        let data = Message::PivotData {
            pivot_src: 1,
            vector: [(0, 10), (1, 0), (2, 10)].into_iter().collect(),
        };
        let out = deliver(&mut node, &mut core, data);

        assert!(out.is_empty());
        assert_eq!(core.distance(&2), Some(20));
        assert_eq!(core.next_hop(&2), Some(1));
        assert_eq!(core.distance(&0), Some(0));
        assert!(node.is_processed(&1));
    }

    #[test]
    fn test_unreachable_pivot_skips_propagation() {
        let mut core = core_with(0, &[(1, 10)]);
        let mut node = TouegNode::new(0);

        deliver(&mut node, &mut core, Message::StartRound { pivot: 9 });
        let out = deliver(&mut node, &mut core, Message::NonChild { pivot: 9, sender: 1 });

        assert!(out.is_empty());
        assert!(node.is_processed(&9));
        assert!(node.is_idle());

        // a second round for the same pivot is ignored entirely
        let out = deliver(&mut node, &mut core, Message::StartRound { pivot: 9 });
        assert!(out.is_empty());
    }

    #[test]
    fn test_isolated_node_completes_immediately() {
        let mut core = NodeCore::new(3);
        let mut node = TouegNode::new(3);

        let out = deliver(&mut node, &mut core, Message::StartRound { pivot: 3 });

        assert!(out.is_empty());
        assert!(node.is_processed(&3));
    }
}
