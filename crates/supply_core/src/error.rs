//! Error types for the supply simulation.

use thiserror::Error;

use crate::entity::{EntityId, EntityKind};
use crate::math::Fixed;

/// Result type alias using [`SupplyError`].
pub type Result<T> = std::result::Result<T, SupplyError>;

/// Top-level error type for the supply simulation.
///
/// Ordinary negative outcomes (no supply source, no asteroid in range) are
/// plain `bool`/`Option` results and never appear here.
#[derive(Debug, Error)]
pub enum SupplyError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A placement candidate failed validation.
    #[error("Cannot place {kind} at ({x}, {y})")]
    PlacementBlocked {
        /// Kind of entity requested.
        kind: EntityKind,
        /// Candidate x coordinate.
        x: Fixed,
        /// Candidate y coordinate.
        y: Fixed,
    },

    /// Not enough money for the requested building.
    #[error("Insufficient funds for {kind}: need {required}, have {available}")]
    InsufficientFunds {
        /// Kind of entity requested.
        kind: EntityKind,
        /// Money required.
        required: u32,
        /// Money available.
        available: u32,
    },

    /// The routing engine has no path between two entities.
    #[error("No supply route from {from} to {to}")]
    NoRoute {
        /// Route origin.
        from: EntityId,
        /// Route destination.
        to: EntityId,
    },

    /// A supply link between these two entities already exists.
    #[error("Duplicate supply link between {a} and {b}")]
    DuplicateLink {
        /// First endpoint.
        a: EntityId,
        /// Second endpoint.
        b: EntityId,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}
