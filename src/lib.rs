//! # sp_rust - Distributed Shortest-Path Protocol Simulator
//!
//! A deterministic discrete-event simulator for message-passing all-pairs
//! shortest-path protocols, built to compare their message and bit
//! complexity on the same graph.
//!
//! ## Core Components
//!
//! - **System**: cooperative single-threaded scheduler with a virtual clock,
//!   one task and one FIFO mailbox per node
//! - **FloydNode**: flooding relaxation, rebroadcasting on every improvement
//! - **TouegNode**: per-pivot shortest-path trees, pivot table propagated
//!   down the tree level by level
//! - **PivotRounds**: round driver with an explicit per-round time budget
//! - **MessageStats**: engine-wide message counter and bits per node
//!
//! ## Usage
//!
//! ```no_run
//! use sp_rust::{EngineConfig, PivotRounds, System, Topology, TouegNode};
//!
//! let topology = Topology::chain(&[10, 15]);
//! let mut system = System::<TouegNode>::new(&topology, EngineConfig::default()).unwrap();
//!
//! let rounds = PivotRounds::default().run_all(&mut system).unwrap();
//! let report = system.report();
//! println!("{} rounds, {} messages", rounds.len(), report.total_messages);
//! ```
//!
//! ## Simulation
//!
//! Runnable drivers live in `simulator/`: `scenario_runner` executes YAML
//! experiment files, `complexity_comparison` runs both protocols on one graph
//! and prints the message and bit totals side by side.

// Shared vocabulary
pub mod sp_error;
pub mod sp_interface;

// Engine
pub mod sp_accounting;
pub mod sp_mailbox;
pub mod sp_node;
pub mod sp_system;

// Protocols
pub mod sp_floyd;
pub mod sp_toueg;

// Driving and checking runs
pub mod sp_config;
pub mod sp_reference;
pub mod sp_report;
pub mod sp_rounds;
pub mod sp_topology;

pub use sp_accounting::MessageStats;
pub use sp_config::{EngineConfig, ExperimentConfig, ProtocolChoice, TopologyConfig};
pub use sp_error::SimError;
pub use sp_floyd::FloydNode;
pub use sp_interface::{DistanceVector, Message, NodeId, SimTime, Weight, DEFAULT_WEIGHT};
pub use sp_node::{NodeContext, NodeCore, NodeProtocol};
pub use sp_report::{NodeReport, SimulationReport};
pub use sp_rounds::{simulate, PivotRounds, RoundBudget, RoundOutcome};
pub use sp_system::{RunOutcome, System};
pub use sp_topology::Topology;
pub use sp_toueg::TouegNode;
