//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the supply simulation produces
//! identical results given an identical seed and identical placements at
//! identical times.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the simulation guards against:
//!
//! - **Floating-point math**: positions, distances and packet motion use
//!   fixed-point arithmetic via [`supply_core::math::Fixed`].
//!
//! - **Iteration order**: entities are visited in ascending id order and
//!   ties between equally distant producers go to the lowest id.
//!
//! - **System randomness**: the asteroid field and cosmetic seeds come from
//!   a generator seeded by the session's seed string.
//!
//! - **Frame timing**: frames are split into bounded steps, so the same
//!   sequence of frame lengths always yields the same sequence of steps.

use std::thread;

use supply_core::placement::PlacementCandidate;
use supply_core::simulation::Simulation;

/// Step length used by the harness, matching one rendered frame.
pub const STEP_MS: u32 = 16;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of steps each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run any state machine multiple times and verify determinism.
///
/// # Example
///
/// ```
/// use supply_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 10, || 0u64, |n| *n += 2, |n| *n);
/// result.assert_deterministic();
/// assert_eq!(result.hashes, vec![20, 20, 20]);
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a simulation twice with identical setup and compare final hashes.
///
/// Each step is one [`STEP_MS`] tick.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick(STEP_MS);
        },
        Simulation::state_hash,
    );
    result.is_deterministic
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under different thread
/// scheduling or memory layout.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick(STEP_MS);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs step by step, finding the first divergence.
///
/// Returns `None` if the runs never differ, `Some(step)` otherwise.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick(STEP_MS);
        sim2.tick(STEP_MS);

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// A placement attempted just before step `at_tick`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedPlacement {
    /// Step index at which to place.
    pub at_tick: u64,
    /// What and where.
    pub candidate: PlacementCandidate,
}

/// Replay a seeded session for `num_ticks` frames, attempting each scripted
/// placement at its step. Rejected placements are ignored.
#[must_use]
pub fn replay_script(seed: &str, script: &[ScriptedPlacement], num_ticks: u64) -> Simulation {
    let mut sim = Simulation::from_seed(seed);
    let mut pending: Vec<&ScriptedPlacement> = script.iter().collect();
    pending.sort_by_key(|p| p.at_tick);
    let mut pending = pending.into_iter().peekable();

    for tick in 0..num_ticks {
        while let Some(placement) = pending.next_if(|p| p.at_tick <= tick) {
            let _ = sim.place(&placement.candidate);
        }
        sim.tick_wrap(STEP_MS);
    }
    sim
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the supply network.
pub mod strategies {
    use proptest::prelude::*;
    use supply_core::entity::EntityKind;
    use supply_core::math::Vec2Fixed;
    use supply_core::placement::PlacementCandidate;

    use super::ScriptedPlacement;

    /// Generate a position within reach of the factory at the centre of a
    /// standard session.
    pub fn arb_near_centre() -> impl Strategy<Value = Vec2Fixed> {
        (-60i32..=60i32, -60i32..=60i32).prop_map(|(dx, dy)| Vec2Fixed::from_ints(360 + dx, 200 + dy))
    }

    /// Generate a kind the player may place.
    pub fn arb_buildable_kind() -> impl Strategy<Value = EntityKind> {
        prop::sample::select(EntityKind::BUILDABLE.to_vec())
    }

    /// Generate a placement near the centre.
    pub fn arb_placement() -> impl Strategy<Value = PlacementCandidate> {
        (arb_buildable_kind(), arb_near_centre())
            .prop_map(|(kind, position)| PlacementCandidate { kind, position })
    }

    /// Generate a script of placements spread over the first `max_tick`
    /// steps.
    pub fn arb_placement_script(
        max_len: usize,
        max_tick: u64,
    ) -> impl Strategy<Value = Vec<ScriptedPlacement>> {
        proptest::collection::vec(
            (0..max_tick, arb_placement())
                .prop_map(|(at_tick, candidate)| ScriptedPlacement { at_tick, candidate }),
            0..max_len,
        )
    }

    /// Generate a session seed string.
    pub fn arb_seed() -> impl Strategy<Value = String> {
        "[a-z]{1,8}"
    }

    /// Generate asteroid values in the standard field range.
    pub fn arb_asteroid_value() -> impl Strategy<Value = u32> {
        500u32..1500u32
    }
}
