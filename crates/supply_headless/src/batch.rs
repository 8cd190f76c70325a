//! Batch runner.
//!
//! Runs one scenario across many seeds in parallel using rayon, so the
//! effect of field layout on a fixed build order can be compared at a
//! glance.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::runner::{run_scenario, RunReport};
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of seeds to run.
    pub count: u32,
    /// Seeds are `"{seed_prefix}{index}"`.
    pub seed_prefix: String,
    /// Maximum parallel runs (0 = use rayon default).
    pub parallel: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 8,
            seed_prefix: "batch-".to_string(),
            parallel: 0,
        }
    }
}

impl BatchConfig {
    /// Seed string for run `index`.
    #[must_use]
    pub fn seed(&self, index: u32) -> String {
        format!("{}{index}", self.seed_prefix)
    }
}

/// One seed's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Run index.
    pub index: u32,
    /// The run's report, or why it failed.
    pub outcome: Result<RunReport, String>,
}

impl BatchEntry {
    /// One-line summary for terminal output.
    #[must_use]
    pub fn summary_line(&self) -> String {
        match &self.outcome {
            Ok(report) => format!(
                "{:>4} {:<16} mined {:>4} ({}/{}) money {:>6} built {:>3} clock {}",
                self.index,
                report.seed,
                report.mined,
                report.value_mined,
                report.total_value,
                report.money,
                report.constructed,
                report.clock,
            ),
            Err(message) => format!("{:>4} failed: {message}", self.index),
        }
    }
}

/// Run `scenario` once per seed in `config`, in parallel.
///
/// Entries come back in index order.
pub fn run_batch(scenario: &Scenario, config: &BatchConfig) -> Vec<BatchEntry> {
    if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let entries: Vec<BatchEntry> = (0..config.count)
        .into_par_iter()
        .map(|index| {
            let seeded = scenario.with_seed(config.seed(index));
            let outcome = run_scenario(&seeded).map_err(|err| {
                warn!(index, %err, "Batch run failed");
                err.to_string()
            });
            BatchEntry { index, outcome }
        })
        .collect();

    let completed = entries.iter().filter(|e| e.outcome.is_ok()).count();
    info!(runs = entries.len(), completed, "Batch complete");
    entries
}
