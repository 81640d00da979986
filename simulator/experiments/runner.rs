//! Experiment runner: build the graph, run the protocols, check the tables

use std::time::Instant;

use log::{info, warn};
use sp_rust::sp_reference::{accuracy, all_pairs};
use sp_rust::{
    simulate, ExperimentConfig, FloydNode, NodeProtocol, ProtocolChoice, SimError, Topology,
    TouegNode,
};

use super::stats::{ExperimentResult, ProtocolResult};

pub struct ExperimentRunner {
    label: String,
    config: ExperimentConfig,
}

impl ExperimentRunner {
    pub fn new(label: impl Into<String>, config: ExperimentConfig) -> Self {
        Self {
            label: label.into(),
            config,
        }
    }

    pub fn run(&self) -> Result<ExperimentResult, SimError> {
        let topology = self.config.topology.build(self.config.seed)?;
        if topology.is_empty() {
            return Err(SimError::EmptyTopology);
        }

        info!(
            "{}: {} nodes, {} links, average degree {:.2}",
            self.label,
            topology.len(),
            topology.link_count(),
            topology.average_degree()
        );

        let mut protocols = Vec::new();
        if matches!(self.config.protocol, ProtocolChoice::Toueg | ProtocolChoice::Both) {
            protocols.push(self.run_protocol::<TouegNode>(&topology)?);
        }
        if matches!(self.config.protocol, ProtocolChoice::Floyd | ProtocolChoice::Both) {
            protocols.push(self.run_protocol::<FloydNode>(&topology)?);
        }

        Ok(ExperimentResult {
            label: self.label.clone(),
            seed: self.config.seed,
            nodes: topology.len(),
            links: topology.link_count(),
            average_degree: topology.average_degree(),
            check_node: self.config.check_node,
            protocols,
        })
    }

    fn run_protocol<P: NodeProtocol>(&self, topology: &Topology) -> Result<ProtocolResult, SimError> {
        info!("  -> running {}", P::NAME);
        let started = Instant::now();
        let (report, rounds) = simulate::<P>(
            topology,
            self.config.engine.clone(),
            self.config.round_budget.clone(),
            self.config.pivots.as_deref(),
        )?;
        let duration_secs = started.elapsed().as_secs_f64();

        let truth = all_pairs(topology);
        let check = self.config.check_node;
        let check_accuracy = match (report.node(check), truth.get(&check)) {
            (Some(node), Some(row)) => accuracy(&node.distances, row),
            _ => {
                warn!("check node {} not in graph", check);
                0.0
            }
        };
        let mean_accuracy = report
            .nodes
            .iter()
            .filter_map(|(id, node)| truth.get(id).map(|row| accuracy(&node.distances, row)))
            .sum::<f64>()
            / report.nodes.len().max(1) as f64;

        let unsettled = rounds.iter().filter(|r| !r.settled()).count();
        if unsettled > 0 {
            warn!(
                "{}: {} of {} rounds did not settle within the budget",
                P::NAME,
                unsettled,
                rounds.len()
            );
        }

        Ok(ProtocolResult {
            protocol: P::NAME,
            report,
            rounds,
            check_accuracy,
            mean_accuracy,
            duration_secs,
        })
    }
}
