//! Headless supply network runner.
//!
//! Runs scenarios without graphics for CI checks and seed sweeps.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in outpost scenario
//! cargo run -p supply_headless -- run
//!
//! # Run a scenario file
//! cargo run -p supply_headless -- run --scenario scenarios/outpost.ron
//!
//! # Verify determinism
//! cargo run -p supply_headless -- verify --runs 5
//!
//! # Sweep 32 seeds
//! cargo run -p supply_headless -- batch --count 32 --parallel 4
//! ```
//!
//! Reports go to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use supply_headless::{
    batch::{run_batch, BatchConfig},
    runner::{run_scenario, verify_scenario},
    scenario::{Scenario, ScenarioError},
};

#[derive(Parser)]
#[command(name = "supply_headless")]
#[command(about = "Headless supply network runner for CI and seed sweeps")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario and print its report
    Run {
        /// Scenario file to load (built-in outpost if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario's seed
        #[arg(long)]
        seed: Option<String>,
    },

    /// Verify determinism by running the same scenario multiple times
    Verify {
        /// Scenario file to load (built-in outpost if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Run one scenario across many seeds
    Batch {
        /// Scenario file to load (built-in outpost if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of seeds
        #[arg(short, long, default_value = "8")]
        count: u32,

        /// Seed prefix; run `i` uses `{prefix}{i}`
        #[arg(long, default_value = "batch-")]
        seed_prefix: String,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for reports)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Some(Commands::Run { scenario, seed }) => cmd_run(scenario, seed),
        Some(Commands::Verify { scenario, runs }) => cmd_verify(scenario, runs),
        Some(Commands::Batch {
            scenario,
            count,
            seed_prefix,
            parallel,
        }) => cmd_batch(
            scenario,
            BatchConfig {
                count,
                seed_prefix,
                parallel,
            },
        ),
        None => cmd_run(None, None),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(%err, "Failed");
            ExitCode::FAILURE
        }
    }
}

fn load_scenario(path: Option<PathBuf>) -> Result<Scenario, ScenarioError> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading scenario");
            Scenario::load(path)
        }
        None => Ok(Scenario::outpost()),
    }
}

/// Run a single scenario and print its JSON report
fn cmd_run(path: Option<PathBuf>, seed: Option<String>) -> Result<ExitCode, ScenarioError> {
    let mut scenario = load_scenario(path)?;
    if let Some(seed) = seed {
        scenario = scenario.with_seed(seed);
    }
    let report = run_scenario(&scenario)?;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            tracing::error!(%err, "Failed to encode report");
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Run the scenario repeatedly and compare final state hashes
fn cmd_verify(path: Option<PathBuf>, runs: u32) -> Result<ExitCode, ScenarioError> {
    let scenario = load_scenario(path)?;
    let hashes = verify_scenario(&scenario, runs.max(2))?;
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    for (run, hash) in hashes.iter().enumerate() {
        println!("run {run}: {hash:016x}");
    }
    if deterministic {
        tracing::info!(runs = hashes.len(), "Deterministic");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(runs = hashes.len(), "Runs diverged");
        Ok(ExitCode::FAILURE)
    }
}

/// Sweep seeds and print one line per run
fn cmd_batch(path: Option<PathBuf>, config: BatchConfig) -> Result<ExitCode, ScenarioError> {
    let scenario = load_scenario(path)?;
    let entries = run_batch(&scenario, &config);
    for entry in &entries {
        println!("{}", entry.summary_line());
    }
    if entries.iter().all(|e| e.outcome.is_ok()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
