//! Placement validation.
//!
//! A candidate is valid when it collides with nothing, can reach supply
//! through at least one link, and (for miners) has an asteroid in reach.
//! The plan lists the links a placement would create so a preview can draw
//! them before the player commits.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::entity::{EntityId, EntityKind};
use crate::math::{Fixed, Vec2Fixed};
use crate::routing::RoutingEngine;
use crate::store::EntityStore;

/// A prospective placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementCandidate {
    /// Kind to build.
    pub kind: EntityKind,
    /// World position.
    pub position: Vec2Fixed,
}

impl PlacementCandidate {
    /// Candidate of `kind` at whole-number coordinates.
    #[must_use]
    pub fn at(kind: EntityKind, x: i32, y: i32) -> Self {
        Self {
            kind,
            position: Vec2Fixed::from_ints(x, y),
        }
    }
}

/// A link the placement would create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLink {
    /// Existing entity at the other end.
    pub to: EntityId,
    /// Squared distance to it.
    pub distance_sq: Fixed,
}

/// Links a valid placement would create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementPlan {
    /// Asteroids in reach of a miner, ascending id.
    pub asteroid_links: Vec<PlannedLink>,
    /// Supply links, nearest first, trimmed to the kind's link cap.
    pub supply_links: Vec<PlannedLink>,
}

/// Validate `candidate` against the current map.
///
/// Returns the links it would create, or `None` if it cannot be placed.
/// Only buildable kinds can be placed.
#[must_use]
pub fn plan_placement(
    store: &EntityStore,
    routing: &RoutingEngine,
    config: &SimConfig,
    candidate: &PlacementCandidate,
) -> Option<PlacementPlan> {
    if !EntityKind::BUILDABLE.contains(&candidate.kind) {
        return None;
    }
    let data = config.types.get(candidate.kind);
    let position = candidate.position;
    let is_miner = data.mining.is_some();
    let asteroid_radius_sq = config.asteroid_link_radius_sq();
    let supply_radius_sq = config.supply_link_radius_sq();

    let mut plan = PlacementPlan::default();
    for other in store.iter() {
        let dist_sq = position.distance_squared(other.position);
        let reach = data.radius + other.radius;
        if dist_sq <= reach * reach {
            return None;
        }

        if is_miner && other.is_minable() && dist_sq <= asteroid_radius_sq {
            plan.asteroid_links.push(PlannedLink {
                to: other.id,
                distance_sq: dist_sq,
            });
        }

        if dist_sq <= supply_radius_sq
            && other.is_link_capable()
            && other.max_links.has_room(routing.link_count(other.id))
            && !(data.max_links.is_leaf() && other.max_links.is_leaf())
        {
            plan.supply_links.push(PlannedLink {
                to: other.id,
                distance_sq: dist_sq,
            });
        }
    }

    if is_miner && plan.asteroid_links.is_empty() {
        return None;
    }
    if plan.supply_links.is_empty() {
        return None;
    }

    plan.supply_links.sort_by_key(|link| link.distance_sq);
    plan.supply_links
        .truncate(data.max_links.take(plan.supply_links.len()));
    if plan.supply_links.is_empty() {
        return None;
    }
    Some(plan)
}
