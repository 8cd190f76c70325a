//! Headless runner for the supply network simulation.
//!
//! Drives the simulation core the way a render loop would, without any
//! graphics. This enables:
//!
//! - **Scenario runs**: scripted placements against a seeded field, with a
//!   JSON report on stdout
//! - **Determinism checks**: the same scenario run several times must end
//!   in the same state hash
//! - **Seed sweeps**: one build order across many seeds, in parallel
//!
//! # Example
//!
//! ```bash
//! # Run a scenario
//! cargo run -p supply_headless -- run --scenario scenarios/outpost.ron
//!
//! # Verify determinism
//! cargo run -p supply_headless -- verify --scenario scenarios/outpost.ron --runs 5
//!
//! # Sweep seeds
//! cargo run -p supply_headless -- batch --scenario scenarios/outpost.ron --count 32
//! ```

pub mod batch;
pub mod hud;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchEntry};
pub use hud::{format_clock, format_percent};
pub use runner::{run_scenario, verify_scenario, RunReport, ScenarioRunner};
pub use scenario::{Scenario, ScenarioError, TimedPlacement};
