//! # Supply Core
//!
//! Deterministic simulation core for the asteroid supply network.
//!
//! A factory produces supply; supply packets travel over links between
//! link-capable entities to build new structures and to feed miners, which
//! burn supply to extract value from asteroids.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`store`] - Entity storage with stable ascending-id iteration
//! - [`routing`] - Supply links and all-pairs shortest paths
//! - [`demand`] - Who needs supply and which producer serves them
//! - [`transit`] - Packets in flight and delivery effects
//! - [`production`] - Producer cadence and mining
//! - [`placement`] - Placement validation
//! - [`field`] - Seeded asteroid field generation
//! - [`simulation`] - The tick loop tying it all together
//! - [`data`] - Data-driven entity type definitions
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod data;
pub mod demand;
pub mod entity;
pub mod error;
pub mod field;
pub mod math;
pub mod placement;
pub mod production;
pub mod routing;
pub mod simulation;
pub mod store;
pub mod supply;
pub mod transit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SimConfig;
    pub use crate::data::{EntityTypeData, EntityTypeTable, MiningStats};
    pub use crate::demand::{DemandScheduler, PeriodicReport};
    pub use crate::entity::{
        Entity, EntityId, EntityKind, EntitySpec, EntityState, Frame, LinkCap,
    };
    pub use crate::error::{Result, SupplyError};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::placement::{PlacementCandidate, PlacementPlan, PlannedLink};
    pub use crate::routing::{PathTable, RoutingEngine, SupplyLink};
    pub use crate::simulation::{Simulation, SupplySummary, TickEvents};
    pub use crate::store::EntityStore;
    pub use crate::supply::Supply;
    pub use crate::transit::Packet;
}
