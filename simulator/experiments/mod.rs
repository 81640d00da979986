// Experiment Driver Module
//
// Shared by scenario_runner and complexity_comparison; each binary uses a
// different half of it.
#![allow(dead_code)]

pub mod config;
pub mod runner;
pub mod stats;

// Re-export commonly used types
#[allow(unused_imports)]
pub use config::{ComparisonConfig, ScenarioFile, ScenarioMeta};
pub use runner::ExperimentRunner;
#[allow(unused_imports)]
pub use stats::{print_sweep, ExperimentResult, ProtocolResult};
