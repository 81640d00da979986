//! Configuration for the experiment drivers

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Deserialize;
use sp_rust::sp_config::{TopologyMode, TopologyConfig};
use sp_rust::{EngineConfig, ExperimentConfig, RoundBudget, Weight};

/// Scenario file format read by `scenario_runner`
#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    /// Scenario metadata
    #[serde(default)]
    pub meta: ScenarioMeta,

    /// Experiment settings, anything missing falls back to defaults
    #[serde(default)]
    pub experiment: ExperimentConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScenarioMeta {
    pub name: Option<String>,
    pub description: Option<String>,
    pub hypothesis: Option<String>,
}

/// Scale sweep run by `complexity_comparison`
#[derive(Debug, Clone)]
pub struct ComparisonConfig {
    /// Node counts to generate graphs for
    pub sizes: Vec<usize>,

    /// Pair link probability of the generated graphs
    pub connectivity: f64,

    /// Inclusive weight range of the generated graphs
    pub weights: (Weight, Weight),

    /// Also run a sparsified variant of each graph with this keep probability
    pub sparse_keep: Option<f64>,

    /// Random seed (None = generate random)
    pub seed: Option<u64>,

    pub engine: EngineConfig,
    pub round_budget: RoundBudget,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            sizes: vec![10, 20, 30, 40, 50],
            connectivity: 0.6,
            weights: (100, 5000),
            sparse_keep: Some(0.3),
            seed: None,
            engine: EngineConfig::default(),
            round_budget: RoundBudget::Scaled {
                min: 60,
                per_node: 3,
            },
        }
    }
}

impl ComparisonConfig {
    /// Get or generate seed
    pub fn resolve_seed(&self) -> u64 {
        self.seed
            .unwrap_or_else(|| StdRng::from_entropy().next_u64())
    }

    /// One experiment per size, plus its sparse twin when configured
    pub fn experiments(&self, seed: u64) -> Vec<(String, ExperimentConfig)> {
        let mut experiments = Vec::new();
        for (i, nodes) in self.sizes.iter().enumerate() {
            let mode = TopologyMode::Random {
                nodes: *nodes,
                connectivity: self.connectivity,
                min_weight: self.weights.0,
                max_weight: self.weights.1,
            };
            let seed = seed.wrapping_add(i as u64);

            experiments.push((
                format!("dense {}", nodes),
                self.experiment(seed, mode.clone(), None),
            ));
            if let Some(keep) = self.sparse_keep {
                experiments.push((
                    format!("sparse {}", nodes),
                    self.experiment(seed, mode, Some(keep)),
                ));
            }
        }
        experiments
    }

    fn experiment(&self, seed: u64, mode: TopologyMode, keep: Option<f64>) -> ExperimentConfig {
        ExperimentConfig {
            seed,
            topology: TopologyConfig {
                mode,
                keep_probability: keep,
            },
            engine: self.engine.clone(),
            round_budget: self.round_budget.clone(),
            ..ExperimentConfig::default()
        }
    }
}
