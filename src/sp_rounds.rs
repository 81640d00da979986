// Pivot-round driver
//
// One round per pivot: START_ROUND(w) goes into every mailbox, then the
// engine gets a fixed slice of virtual time. Settlement is reported, never
// assumed; a round that runs out of budget leaves its stragglers parked and
// the next round starts anyway.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::sp_config::EngineConfig;
use crate::sp_error::SimError;
use crate::sp_interface::{Message, NodeId, SimTime};
use crate::sp_node::NodeProtocol;
use crate::sp_report::SimulationReport;
use crate::sp_system::{RunOutcome, System};
use crate::sp_topology::Topology;

/// Virtual time granted to each round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RoundBudget {
    Fixed { ticks: SimTime },
    /// `max(min, per_node * n)`
    Scaled { min: SimTime, per_node: SimTime },
}

impl Default for RoundBudget {
    fn default() -> Self {
        RoundBudget::Scaled {
            min: 60,
            per_node: 2,
        }
    }
}

impl RoundBudget {
    pub fn ticks(&self, nodes: usize) -> SimTime {
        match self {
            RoundBudget::Fixed { ticks } => *ticks,
            RoundBudget::Scaled { min, per_node } => {
                (*min).max(per_node.saturating_mul(nodes as SimTime))
            }
        }
    }
}

/// What one pivot round cost and whether it settled in its budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    pub pivot: NodeId,
    pub messages: u64,
    pub bits: u64,
    pub run: RunOutcome,
}

impl RoundOutcome {
    pub fn settled(&self) -> bool {
        self.run.settled()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PivotRounds {
    budget: RoundBudget,
}

impl PivotRounds {
    pub fn new(budget: RoundBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> &RoundBudget {
        &self.budget
    }

    /// Let every node finish its start-up delay before the first round
    pub fn warm_up<P: NodeProtocol>(&self, system: &mut System<P>) -> RunOutcome {
        let until = system.now().max(system.config().init_delay);
        system.run_until(until)
    }

    /// Run one round per pivot, in the given order
    pub fn run<P: NodeProtocol>(
        &self,
        system: &mut System<P>,
        pivots: &[NodeId],
    ) -> Result<Vec<RoundOutcome>, SimError> {
        for pivot in pivots {
            if system.node(*pivot).is_none() {
                return Err(SimError::UnknownNode(*pivot));
            }
        }

        self.warm_up(system);
        let ticks = self.budget.ticks(system.len());

        let mut outcomes = Vec::with_capacity(pivots.len());
        for pivot in pivots {
            let before = system.stats().clone();
            system.inject_all(Message::StartRound { pivot: *pivot });
            let run = system.run_for(ticks);
            let (messages, bits) = system.stats().since(&before);

            debug!(
                "{} round w:{} {} msgs {} bits settled:{}",
                P::NAME,
                pivot,
                messages,
                bits,
                run.settled()
            );
            outcomes.push(RoundOutcome {
                pivot: *pivot,
                messages,
                bits,
                run,
            });
        }

        let unsettled = outcomes.iter().filter(|o| !o.settled()).count();
        info!(
            "{}: {} rounds, {} unsettled within {} ticks each",
            P::NAME,
            outcomes.len(),
            unsettled,
            ticks
        );
        Ok(outcomes)
    }

    /// Every vertex as pivot, ascending
    pub fn run_all<P: NodeProtocol>(
        &self,
        system: &mut System<P>,
    ) -> Result<Vec<RoundOutcome>, SimError> {
        let pivots = system.node_ids();
        self.run(system, &pivots)
    }
}

/// Build an engine for `topology`, run the pivots (all vertices when None)
/// and hand back the final report with the per-round outcomes
pub fn simulate<P: NodeProtocol>(
    topology: &Topology,
    config: EngineConfig,
    budget: RoundBudget,
    pivots: Option<&[NodeId]>,
) -> Result<(SimulationReport, Vec<RoundOutcome>), SimError> {
    let mut system = System::<P>::new(topology, config)?;
    let rounds = PivotRounds::new(budget);
    let outcomes = match pivots {
        Some(pivots) => rounds.run(&mut system, pivots)?,
        None => rounds.run_all(&mut system)?,
    };
    Ok((system.report(), outcomes))
}
