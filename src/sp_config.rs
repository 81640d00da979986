//! Engine and experiment configuration
//!
//! Everything here (de)serializes with serde so scenario files can override
//! any field; missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::sp_error::SimError;
use crate::sp_interface::{NodeId, SimTime, Weight, DEFAULT_WEIGHT};
use crate::sp_rounds::RoundBudget;
use crate::sp_topology::Topology;

/// Scheduler timing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ticks a node sleeps before merging its neighbor table
    pub init_delay: SimTime,

    /// Ticks between a send and the delivery into the receiver's mailbox
    pub link_delay: SimTime,

    /// Upper bound on scheduler steps within one run call (None = unbounded)
    pub max_steps_per_run: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            init_delay: 1,
            link_delay: 1,
            max_steps_per_run: None,
        }
    }
}

/// Which protocol variant(s) an experiment runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolChoice {
    Floyd,
    Toueg,
    Both,
}

impl Default for ProtocolChoice {
    fn default() -> Self {
        ProtocolChoice::Both
    }
}

/// One directed or undirected edge in an explicit topology
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub weight: Option<Weight>,
    /// Weight for the reverse direction; defaults to `weight` when absent
    #[serde(default)]
    pub reverse_weight: Option<Weight>,
}

/// How to build the graph the nodes run on
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TopologyMode {
    /// `0 - 1 - ... - n`, one weight per link
    Chain { weights: Vec<Weight> },

    Ring {
        nodes: usize,
        #[serde(default = "default_weight")]
        weight: Weight,
    },

    FullyConnected {
        nodes: usize,
        #[serde(default = "default_weight")]
        weight: Weight,
    },

    /// Each pair linked with probability `connectivity`
    Random {
        nodes: usize,
        connectivity: f64,
        min_weight: Weight,
        max_weight: Weight,
    },

    Explicit { nodes: usize, edges: Vec<EdgeSpec> },
}

fn default_weight() -> Weight {
    DEFAULT_WEIGHT
}

/// Topology plus optional sparsification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(flatten)]
    pub mode: TopologyMode,

    /// Keep each link with this probability, then keep the largest component
    #[serde(default)]
    pub keep_probability: Option<f64>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            mode: TopologyMode::Random {
                nodes: 10,
                connectivity: 0.4,
                min_weight: 100,
                max_weight: 5000,
            },
            keep_probability: None,
        }
    }
}

impl TopologyConfig {
    pub fn build(&self, seed: u64) -> Result<Topology, SimError> {
        let topology = match &self.mode {
            TopologyMode::Chain { weights } => Topology::chain(weights),
            TopologyMode::Ring { nodes, weight } => Topology::ring(*nodes, *weight),
            TopologyMode::FullyConnected { nodes, weight } => {
                Topology::fully_connected(*nodes, *weight)
            }
            TopologyMode::Random {
                nodes,
                connectivity,
                min_weight,
                max_weight,
            } => Topology::random(*nodes, *connectivity, (*min_weight, *max_weight), seed)?
                .largest_component(),
            TopologyMode::Explicit { nodes, edges } => {
                let mut topology = Topology::with_nodes(*nodes);
                for edge in edges {
                    topology.add_edge(edge.from, edge.to, edge.weight)?;
                    if let Some(reverse) = edge.reverse_weight.or(edge.weight) {
                        topology.set_weight(edge.to, edge.from, reverse)?;
                    }
                }
                topology
            }
        };

        match self.keep_probability {
            Some(keep) => topology.sparsify(keep, seed.wrapping_add(1)),
            None => Ok(topology),
        }
    }
}

/// A complete experiment: graph, protocols, timing and round budget
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub seed: u64,
    pub protocol: ProtocolChoice,
    pub topology: TopologyConfig,
    pub engine: EngineConfig,
    pub round_budget: RoundBudget,
    /// Pivot order; all nodes ascending when absent
    pub pivots: Option<Vec<NodeId>>,
    /// Node whose table is checked against ground truth
    pub check_node: NodeId,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            protocol: ProtocolChoice::default(),
            topology: TopologyConfig::default(),
            engine: EngineConfig::default(),
            round_budget: RoundBudget::default(),
            pivots: None,
            check_node: 0,
        }
    }
}
