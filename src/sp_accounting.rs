use std::collections::BTreeMap;

use crate::sp_interface::{Message, NodeId};

/// Engine-wide message accounting.
///
/// Only the engine's send path touches this, and the engine is single
/// threaded, so plain counters suffice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStats {
    pub total_messages: u64,
    pub total_bits: u64,
    /// Bits sent per node, mirrors each node's own counter
    pub bits_per_node: BTreeMap<NodeId, u64>,
    /// Sent messages by wire tag
    pub by_kind: BTreeMap<&'static str, u64>,
}

impl MessageStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge one sent message to `sender`.
    pub fn record(&mut self, sender: NodeId, message: &Message) -> u64 {
        let bits = message.bit_cost();
        self.total_messages += 1;
        self.total_bits += bits;
        *self.bits_per_node.entry(sender).or_insert(0) += bits;
        *self.by_kind.entry(message.kind()).or_insert(0) += 1;
        bits
    }

    /// Counter deltas since an earlier snapshot: (messages, bits)
    pub fn since(&self, earlier: &MessageStats) -> (u64, u64) {
        (
            self.total_messages - earlier.total_messages,
            self.total_bits - earlier.total_bits,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_every_send() {
        let mut stats = MessageStats::new();
        let msg = Message::Child { pivot: 0, sender: 1 };

        stats.record(1, &msg);
        stats.record(1, &msg);

        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.total_bits, 2 * msg.bit_cost());
        assert_eq!(stats.bits_per_node[&1], 2 * msg.bit_cost());
        assert_eq!(stats.by_kind["CHILD"], 2);
    }

    #[test]
    fn test_since_snapshot() {
        let mut stats = MessageStats::new();
        stats.record(0, &Message::NonChild { pivot: 0, sender: 0 });
        let snapshot = stats.clone();
        stats.record(2, &Message::Child { pivot: 1, sender: 2 });

        assert_eq!(stats.since(&snapshot), (1, 72));
    }
}
