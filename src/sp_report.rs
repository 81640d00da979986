use std::collections::BTreeMap;

use serde::Serialize;

use crate::sp_interface::{DistanceVector, NodeId, SimTime};
use crate::sp_node::NodeCore;

/// Final tables of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub distances: DistanceVector,
    pub next_hop: BTreeMap<NodeId, Option<NodeId>>,
    pub bits_sent: u64,
}

impl NodeReport {
    pub fn from_core(core: &NodeCore) -> Self {
        Self {
            distances: core.distances().clone(),
            next_hop: core.next_hops().clone(),
            bits_sent: core.bits_sent(),
        }
    }
}

/// What the engine hands back once time stops advancing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub protocol: String,
    pub nodes: BTreeMap<NodeId, NodeReport>,
    pub total_messages: u64,
    pub total_bits: u64,
    pub end_time: SimTime,
}

impl SimulationReport {
    pub fn node(&self, id: NodeId) -> Option<&NodeReport> {
        self.nodes.get(&id)
    }

    /// Blake3 digest over tables and counters.
    ///
    /// Two runs with the same topology, pivot order and budgets must produce
    /// the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.protocol.as_bytes());
        hasher.update(&self.total_messages.to_le_bytes());
        hasher.update(&self.total_bits.to_le_bytes());
        hasher.update(&self.end_time.to_le_bytes());

        for (id, node) in &self.nodes {
            hasher.update(&id.to_le_bytes());
            hasher.update(&node.bits_sent.to_le_bytes());
            for (dest, cost) in &node.distances {
                hasher.update(&dest.to_le_bytes());
                hasher.update(&cost.to_le_bytes());
            }
            for (dest, hop) in &node.next_hop {
                hasher.update(&dest.to_le_bytes());
                match hop {
                    Some(h) => {
                        hasher.update(&[1]);
                        hasher.update(&h.to_le_bytes());
                    }
                    None => {
                        hasher.update(&[0]);
                    }
                }
            }
        }

        hasher.finalize().to_hex().to_string()
    }
}
