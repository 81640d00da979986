//! Toueg vs. Floyd message and bit complexity over a sweep of graph sizes
//!
//! Run with: cargo run --example complexity_comparison

mod experiments;

use experiments::{print_sweep, ComparisonConfig, ExperimentRunner};
use log::info;
use simple_logger::SimpleLogger;

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║        Shortest-Path Complexity Comparison             ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let config = ComparisonConfig::default();
    let seed = config.resolve_seed();

    info!("Configuration:");
    info!("  Sizes: {:?}", config.sizes);
    info!("  Connectivity: {}", config.connectivity);
    info!("  Weights: {}..={}", config.weights.0, config.weights.1);
    info!("  Sparse keep: {:?}", config.sparse_keep);
    info!("  Seed: {}", seed);

    let mut results = Vec::new();
    for (label, experiment) in config.experiments(seed) {
        match ExperimentRunner::new(label.clone(), experiment).run() {
            Ok(result) => {
                result.print_summary();
                results.push(result);
            }
            Err(e) => {
                eprintln!("{} failed: {}", label, e);
                std::process::exit(1);
            }
        }
    }

    print_sweep(&results);
}
