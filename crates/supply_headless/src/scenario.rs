//! Scenario loading and configuration.
//!
//! A scenario fixes everything a headless run needs: the seed that lays
//! out the asteroid field, how long each frame is, how long to run, and a
//! list of placements the "player" attempts at given times.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use supply_core::config::SimConfig;
use supply_core::data::EntityTypeTable;
use supply_core::entity::EntityKind;
use supply_core::error::SupplyError;
use supply_core::placement::PlacementCandidate;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The referenced entity type table is invalid.
    #[error("Invalid entity types: {0}")]
    Types(#[from] SupplyError),
    /// The scenario itself is inconsistent.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Seed string for the asteroid field.
    pub seed: String,
    /// Length of one rendered frame in milliseconds.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u32,
    /// Simulated run length in milliseconds.
    pub duration_ms: u64,
    /// Override for the number of asteroids.
    #[serde(default)]
    pub asteroid_count: Option<u32>,
    /// Placements to attempt, in any order.
    #[serde(default)]
    pub placements: Vec<TimedPlacement>,
    /// Optional RON entity type table replacing the standard one.
    #[serde(default)]
    pub entity_types_path: Option<PathBuf>,
}

const fn default_frame_ms() -> u32 {
    16
}

impl Default for Scenario {
    fn default() -> Self {
        Self::outpost()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// A relative `entity_types_path` is resolved against the scenario's
    /// own directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&contents)?;
        if let (Some(types), Some(dir)) = (scenario.entity_types_path.as_mut(), path.parent()) {
            if types.is_relative() {
                *types = dir.join(&*types);
            }
        }
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        if scenario.frame_ms == 0 {
            return Err(ScenarioError::Invalid("frame_ms must be positive".to_string()));
        }
        Ok(scenario)
    }

    /// Router spurs east and west of the factory.
    #[must_use]
    pub fn outpost() -> Self {
        Self {
            name: "Outpost".to_string(),
            seed: "outpost".to_string(),
            frame_ms: default_frame_ms(),
            duration_ms: 120_000,
            asteroid_count: None,
            placements: vec![
                TimedPlacement::new(0, EntityKind::Router, 400, 200),
                TimedPlacement::new(2_000, EntityKind::Router, 440, 200),
                TimedPlacement::new(4_000, EntityKind::Router, 320, 200),
                TimedPlacement::new(6_000, EntityKind::Router, 280, 200),
            ],
            entity_types_path: None,
        }
    }

    /// Simulation settings for this scenario.
    pub fn sim_config(&self) -> Result<SimConfig, ScenarioError> {
        let mut config = SimConfig::default();
        if let Some(count) = self.asteroid_count {
            config = config.with_asteroid_count(count);
        }
        if let Some(path) = &self.entity_types_path {
            let ron = std::fs::read_to_string(path)?;
            let types = EntityTypeTable::from_ron_str(&ron, &path.display().to_string())?;
            config = config.with_types(types);
        }
        Ok(config)
    }

    /// Placements sorted by time; equal times keep file order.
    #[must_use]
    pub fn schedule(&self) -> Vec<TimedPlacement> {
        let mut placements = self.placements.clone();
        placements.sort_by_key(|p| p.at_ms);
        placements
    }

    /// Copy of this scenario with another seed.
    #[must_use]
    pub fn with_seed(&self, seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            ..self.clone()
        }
    }
}

/// A placement attempted once the clock reaches `at_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedPlacement {
    /// Simulated time of the attempt.
    pub at_ms: u64,
    /// What to build.
    pub kind: EntityKind,
    /// World x.
    pub x: i32,
    /// World y.
    pub y: i32,
}

impl TimedPlacement {
    /// Create a new timed placement.
    #[must_use]
    pub const fn new(at_ms: u64, kind: EntityKind, x: i32, y: i32) -> Self {
        Self { at_ms, kind, x, y }
    }

    /// The placement as the core sees it.
    #[must_use]
    pub fn candidate(&self) -> PlacementCandidate {
        PlacementCandidate::at(self.kind, self.x, self.y)
    }
}
