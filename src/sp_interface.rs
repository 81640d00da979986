// all node ids share one small numeric type
pub type NodeId = u32;

// path and edge costs - absence from a table means unreachable
pub type Weight = u64;

/// Virtual time in scheduler ticks
pub type SimTime = u64;

/// Cost of an edge whose weight the topology never supplied
pub const DEFAULT_WEIGHT: Weight = 100;

// structural sizes (bytes) used for bit accounting
const TAG_SIZE: usize = 1;
const ID_SIZE: usize = 4;
const LEN_PREFIX_SIZE: usize = 4;
const ENTRY_SIZE: usize = ID_SIZE + 8;

/// Distance vector carried in flooded / propagated payloads.
///
/// Ordered by destination so payload contents (and therefore the order of
/// relaxations on the receiving side) never depend on hashing.
pub type DistanceVector = std::collections::BTreeMap<NodeId, Weight>;

/// Wire vocabulary shared by both protocol variants.
///
/// Messages are immutable once sent: vector payloads are value copies of the
/// sender's table taken at send time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Injected by the round driver, never accounted
    StartRound { pivot: NodeId },

    // Floyd
    FloodDw {
        pivot_src: NodeId,
        vector: DistanceVector,
        sender: NodeId,
    },

    // Toueg tree construction
    Child { pivot: NodeId, sender: NodeId },
    NonChild { pivot: NodeId, sender: NodeId },

    // Toueg propagation down the tree rooted at the pivot
    PivotData {
        pivot_src: NodeId,
        vector: DistanceVector,
    },
}

impl Message {
    /// Pivot id the message is tagged with
    pub fn pivot(&self) -> NodeId {
        match self {
            Message::StartRound { pivot } => *pivot,
            Message::FloodDw { pivot_src, .. } => *pivot_src,
            Message::Child { pivot, .. } => *pivot,
            Message::NonChild { pivot, .. } => *pivot,
            Message::PivotData { pivot_src, .. } => *pivot_src,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::StartRound { .. } => "START_ROUND",
            Message::FloodDw { .. } => "FLOOD_DW",
            Message::Child { .. } => "CHILD",
            Message::NonChild { .. } => "NONCHILD",
            Message::PivotData { .. } => "PIVOT_DATA",
        }
    }

    /// Structural size estimate in bytes.
    ///
    /// One tag byte, four bytes per id field and, for vector payloads, a
    /// length prefix plus one (id, weight) entry per destination. Larger
    /// vectors cost more, which is what separates the two protocols in
    /// bit complexity.
    pub fn wire_size(&self) -> usize {
        match self {
            Message::StartRound { .. } => TAG_SIZE + ID_SIZE,
            Message::FloodDw { vector, .. } => {
                TAG_SIZE + 2 * ID_SIZE + LEN_PREFIX_SIZE + vector.len() * ENTRY_SIZE
            }
            Message::Child { .. } | Message::NonChild { .. } => TAG_SIZE + 2 * ID_SIZE,
            Message::PivotData { vector, .. } => {
                TAG_SIZE + ID_SIZE + LEN_PREFIX_SIZE + vector.len() * ENTRY_SIZE
            }
        }
    }

    /// Bits charged to the sender: 8 per byte of structural size
    pub fn bit_cost(&self) -> u64 {
        8 * self.wire_size() as u64
    }
}

/// A sent message on its way through the engine
#[derive(Clone, Debug)]
pub struct Envelope {
    pub sender: NodeId,
    pub receiver: NodeId,
    pub time: SimTime,
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_size_grows_with_payload() {
        let mut vector = DistanceVector::new();
        let empty = Message::FloodDw {
            pivot_src: 0,
            vector: vector.clone(),
            sender: 1,
        };
        vector.insert(0, 0);
        vector.insert(1, 10);
        let two = Message::FloodDw {
            pivot_src: 0,
            vector,
            sender: 1,
        };

        assert_eq!(empty.wire_size(), 13);
        assert_eq!(two.wire_size(), 13 + 2 * 12);
        assert_eq!(two.bit_cost(), 8 * 37);
    }

    #[test]
    fn test_status_messages_same_size() {
        let child = Message::Child { pivot: 3, sender: 1 };
        let non_child = Message::NonChild { pivot: 3, sender: 1 };
        assert_eq!(child.wire_size(), non_child.wire_size());
        assert_eq!(child.bit_cost(), 72);
    }

    #[test]
    fn test_pivot_tag() {
        assert_eq!(Message::StartRound { pivot: 4 }.pivot(), 4);
        assert_eq!(
            Message::PivotData {
                pivot_src: 2,
                vector: DistanceVector::new()
            }
            .pivot(),
            2
        );
        assert_eq!(Message::NonChild { pivot: 7, sender: 0 }.kind(), "NONCHILD");
    }
}
