//! Results of experiment runs

use sp_rust::{RoundOutcome, SimulationReport};

/// Outcome of one protocol on one graph
#[derive(Debug, Clone)]
pub struct ProtocolResult {
    pub protocol: &'static str,
    pub report: SimulationReport,
    pub rounds: Vec<RoundOutcome>,

    /// Accuracy of the check node's table against ground truth (percent)
    pub check_accuracy: f64,

    /// Mean accuracy over all nodes (percent)
    pub mean_accuracy: f64,

    /// Wall-clock seconds spent simulating
    pub duration_secs: f64,
}

impl ProtocolResult {
    pub fn unsettled_rounds(&self) -> usize {
        self.rounds.iter().filter(|r| !r.settled()).count()
    }

    /// Largest per-round message count
    pub fn peak_round_messages(&self) -> u64 {
        self.rounds.iter().map(|r| r.messages).max().unwrap_or(0)
    }
}

/// Graph facts plus every protocol that ran on it
#[derive(Debug, Clone)]
pub struct ExperimentResult {
    pub label: String,
    pub seed: u64,
    pub nodes: usize,
    pub links: usize,
    pub average_degree: f64,
    pub check_node: u32,
    pub protocols: Vec<ProtocolResult>,
}

impl ExperimentResult {
    pub fn protocol(&self, name: &str) -> Option<&ProtocolResult> {
        self.protocols.iter().find(|p| p.protocol == name)
    }

    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        Shortest-Path Simulation Results                ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Experiment: {}", self.label);
        println!("  Seed: {}", self.seed);
        println!(
            "  Graph: {} nodes, {} links, average degree {:.2}",
            self.nodes, self.links, self.average_degree
        );
        println!();

        for result in &self.protocols {
            println!("═══ {} ═══", result.protocol);
            println!("  Execution Time:  {:.4} sec", result.duration_secs);
            println!("  Total Messages:  {}", result.report.total_messages);
            println!("  Total Bits:      {}", result.report.total_bits);
            println!("  Peak Round:      {} messages", result.peak_round_messages());
            println!(
                "  Rounds:          {} ({} unsettled)",
                result.rounds.len(),
                result.unsettled_rounds()
            );
            println!(
                "  Accuracy:        {:.1}% (node {}), {:.1}% mean",
                result.check_accuracy, self.check_node, result.mean_accuracy
            );
            println!("  Fingerprint:     {}", &result.report.fingerprint()[..16]);
            println!();
        }

        if let (Some(toueg), Some(floyd)) = (self.protocol("toueg"), self.protocol("floyd")) {
            print_comparison(toueg, floyd);
        }
    }
}

/// Side-by-side table, differences relative to Floyd
pub fn print_comparison(toueg: &ProtocolResult, floyd: &ProtocolResult) {
    let rule = "=".repeat(85);
    println!("{}", rule);
    println!("{:<25} | {:<20} | {:<20} | DIFFERENCE", "METRIC", "TOUEG", "FLOYD");
    println!("{}", rule);

    let msgs_t = toueg.report.total_messages;
    let msgs_f = floyd.report.total_messages;
    let bits_t = toueg.report.total_bits;
    let bits_f = floyd.report.total_bits;

    println!(
        "{:<25} | {:<20} | {:<20} | {:+.1}%",
        "Message Count",
        msgs_t,
        msgs_f,
        relative_saving(msgs_t, msgs_f)
    );
    println!(
        "{:<25} | {:<20} | {:<20} | {:+.1}%",
        "Bit Complexity",
        bits_t,
        bits_f,
        relative_saving(bits_t, bits_f)
    );
    println!();
}

/// `(baseline - value) / baseline` in percent, 0 for an empty baseline
pub fn relative_saving(value: u64, baseline: u64) -> f64 {
    if baseline == 0 {
        return 0.0;
    }
    (baseline as f64 - value as f64) / baseline as f64 * 100.0
}

/// One line per experiment for sweeps
pub fn print_sweep(results: &[ExperimentResult]) {
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║        Complexity Sweep                                ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    println!(
        "{:<12} {:>6} {:>8} {:>12} {:>12} {:>14} {:>14}",
        "graph", "nodes", "degree", "toueg msgs", "floyd msgs", "toueg bits", "floyd bits"
    );
    for result in results {
        let count = |name: &str| {
            result
                .protocol(name)
                .map(|p| (p.report.total_messages, p.report.total_bits))
                .unwrap_or((0, 0))
        };
        let (toueg_msgs, toueg_bits) = count("toueg");
        let (floyd_msgs, floyd_bits) = count("floyd");
        println!(
            "{:<12} {:>6} {:>8.2} {:>12} {:>12} {:>14} {:>14}",
            result.label,
            result.nodes,
            result.average_degree,
            toueg_msgs,
            floyd_msgs,
            toueg_bits,
            floyd_bits
        );
    }
    println!();
}
