use thiserror::Error;

use crate::sp_interface::NodeId;

/// Errors surfaced by topology construction and the engine's outer API.
///
/// Protocol-level conditions (unreachable destinations, irrelevant messages,
/// stalled tasks) are never errors; they show up in the tables and run
/// outcomes instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("self loop on node {0}")]
    SelfLoop(NodeId),

    #[error("topology has no nodes")]
    EmptyTopology,

    #[error("invalid probability {0}")]
    InvalidProbability(f64),

    #[error("invalid weight range {0}..={1}")]
    InvalidWeightRange(u64, u64),

    #[error("link delay must be at least one tick")]
    ZeroLinkDelay,
}
