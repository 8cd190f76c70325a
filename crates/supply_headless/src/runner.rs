//! Frame-loop driver.
//!
//! Stands in for the render loop: every frame it attempts the placements
//! that have come due, advances the simulation by one frame, eases the
//! construction bars and tallies what happened.

use serde::{Deserialize, Serialize};
use supply_core::simulation::{Simulation, TickEvents};

use crate::hud::{format_clock, format_percent};
use crate::scenario::{Scenario, ScenarioError, TimedPlacement};

/// Summary of one scenario run, printed as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed used for the field.
    pub seed: String,
    /// Frames driven.
    pub frames: u64,
    /// Wall-clock milliseconds the frames covered.
    pub wall_ms: u64,
    /// Simulated milliseconds (frozen while paused).
    pub sim_ms: u64,
    /// `sim_ms` as `m:ss`.
    pub clock: String,
    /// Money at the end.
    pub money: u32,
    /// Ore mined.
    pub value_mined: u64,
    /// Value of the whole field.
    pub total_value: u64,
    /// Mined share, as the HUD shows it.
    pub mined: String,
    /// Whether the field was mined out.
    pub complete: bool,
    /// Placements that went through.
    pub placements_accepted: u32,
    /// Placements refused (blocked or unaffordable).
    pub placements_rejected: u32,
    /// Packets launched.
    pub packets_emitted: u32,
    /// Packets delivered.
    pub deliveries: u64,
    /// Constructions finished.
    pub constructed: u64,
    /// Miners shut down for lack of asteroids.
    pub exhausted: u64,
    /// Asteroids emptied.
    pub depleted: u64,
    /// Packets discarded in flight.
    pub packets_lost: u32,
    /// Orders dropped at emission.
    pub dropped_orders: u32,
    /// Entities in the world at the end.
    pub entities: usize,
    /// Final state hash.
    pub state_hash: u64,
}

/// Running event counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunTotals {
    packets_emitted: u32,
    deliveries: u64,
    constructed: u64,
    exhausted: u64,
    depleted: u64,
    packets_lost: u32,
    dropped_orders: u32,
}

impl RunTotals {
    fn add(&mut self, events: &TickEvents) {
        self.packets_emitted += events.packets_emitted;
        self.deliveries += events.deliveries.len() as u64;
        self.constructed += events.constructed.len() as u64;
        self.exhausted += events.exhausted.len() as u64;
        self.depleted += events.depleted.len() as u64;
        self.packets_lost += events.packets_lost;
        self.dropped_orders += events.dropped_orders;
    }
}

/// Drives one scenario frame by frame.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    scenario: Scenario,
    sim: Simulation,
    schedule: Vec<TimedPlacement>,
    next_placement: usize,
    frames: u64,
    wall_ms: u64,
    accepted: u32,
    rejected: u32,
    totals: RunTotals,
}

impl ScenarioRunner {
    /// Build the seeded world for `scenario`.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let config = scenario.sim_config()?;
        let sim = Simulation::seeded(config, &scenario.seed);
        Ok(Self {
            schedule: scenario.schedule(),
            scenario: scenario.clone(),
            sim,
            next_placement: 0,
            frames: 0,
            wall_ms: 0,
            accepted: 0,
            rejected: 0,
            totals: RunTotals::default(),
        })
    }

    /// The simulation being driven.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether the run has reached its duration or mined out the field.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.wall_ms >= self.scenario.duration_ms || self.sim.is_complete()
    }

    /// Drive one frame.
    pub fn step_frame(&mut self) -> TickEvents {
        self.apply_due_placements();
        let frame_ms = self.scenario.frame_ms;
        let events = self.sim.tick_wrap(frame_ms);
        self.sim.advance_build_displays(frame_ms);
        self.frames += 1;
        self.wall_ms += u64::from(frame_ms);

        for &id in &events.constructed {
            if let Some(entity) = self.sim.entity(id) {
                tracing::info!(entity = id, kind = %entity.kind, clock = %format_clock(self.sim.tick_counter()), "Built");
            }
        }
        for &id in &events.exhausted {
            tracing::info!(entity = id, "Miner exhausted");
        }
        self.totals.add(&events);
        events
    }

    /// Drive frames until finished and report.
    pub fn run(mut self) -> RunReport {
        tracing::info!(
            scenario = %self.scenario.name,
            seed = %self.scenario.seed,
            total_value = self.sim.total_value(),
            "Starting run"
        );
        while !self.is_finished() {
            self.step_frame();
        }
        let report = self.report();
        tracing::info!(
            frames = report.frames,
            clock = %report.clock,
            mined = %report.mined,
            money = report.money,
            "Run finished"
        );
        report
    }

    /// Snapshot of the run so far.
    #[must_use]
    pub fn report(&self) -> RunReport {
        let sim = &self.sim;
        RunReport {
            scenario: self.scenario.name.clone(),
            seed: self.scenario.seed.clone(),
            frames: self.frames,
            wall_ms: self.wall_ms,
            sim_ms: sim.tick_counter(),
            clock: format_clock(sim.tick_counter()),
            money: sim.money(),
            value_mined: sim.value_mined(),
            total_value: sim.total_value(),
            mined: format_percent(sim.value_mined(), sim.total_value()),
            complete: sim.is_complete(),
            placements_accepted: self.accepted,
            placements_rejected: self.rejected,
            packets_emitted: self.totals.packets_emitted,
            deliveries: self.totals.deliveries,
            constructed: self.totals.constructed,
            exhausted: self.totals.exhausted,
            depleted: self.totals.depleted,
            packets_lost: self.totals.packets_lost,
            dropped_orders: self.totals.dropped_orders,
            entities: sim.entities().len(),
            state_hash: sim.state_hash(),
        }
    }

    fn apply_due_placements(&mut self) {
        while let Some(placement) = self.schedule.get(self.next_placement) {
            if placement.at_ms > self.wall_ms {
                break;
            }
            let placement = *placement;
            self.next_placement += 1;
            match self.sim.place(&placement.candidate()) {
                Ok(id) => {
                    self.accepted += 1;
                    tracing::debug!(entity = id, kind = %placement.kind, x = placement.x, y = placement.y, "Placement accepted");
                }
                Err(err) => {
                    self.rejected += 1;
                    tracing::warn!(%err, at_ms = placement.at_ms, "Placement rejected");
                }
            }
        }
    }
}

/// Load, run and report one scenario.
pub fn run_scenario(scenario: &Scenario) -> Result<RunReport, ScenarioError> {
    Ok(ScenarioRunner::new(scenario)?.run())
}

/// Run `scenario` `runs` times and return the final state hash of each.
pub fn verify_scenario(scenario: &Scenario, runs: u32) -> Result<Vec<u64>, ScenarioError> {
    (0..runs)
        .map(|_| run_scenario(scenario).map(|report| report.state_hash))
        .collect()
}
