//! Supply packets in flight.
//!
//! A packet leaves its producer toward the first hop of the current route,
//! snaps to each waypoint it reaches and re-routes from there, so a route
//! that improves mid-flight is picked up at the next waypoint. Delivery
//! effects on the receiver live in [`deliver`].

use crate::entity::{BuildDisplay, EntityId, EntityState, Frame};
use crate::error::{Result, SupplyError};
use crate::math::{Fixed, Vec2Fixed};
use crate::routing::RoutingEngine;
use crate::store::EntityStore;
use crate::supply::Supply;

/// One unit of supply moving along the link graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Packet {
    /// Last waypoint reached (the producer at first).
    pub source: EntityId,
    /// Final destination.
    pub target: EntityId,
    /// Waypoint currently headed for.
    pub next: EntityId,
    /// World position.
    pub position: Vec2Fixed,
    /// World units per millisecond.
    pub speed: Fixed,
}

/// Result of advancing a packet by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStep {
    /// Still travelling.
    InFlight,
    /// Reached the target this step.
    Arrived,
    /// No route left to the target; the packet is discarded.
    Lost,
}

impl Packet {
    /// Sprite frame drawn for packets.
    pub const FRAME: Frame = Frame::Supply;

    /// Move the packet `dt_ms` worth of distance along its route.
    ///
    /// Overshoot carries across waypoints within the same step.
    pub fn advance(
        &mut self,
        store: &EntityStore,
        routing: &mut RoutingEngine,
        dt_ms: u32,
    ) -> PacketStep {
        let mut remaining = Fixed::from_num(dt_ms) * self.speed;
        loop {
            let Some(waypoint) = store.get(self.next).map(|e| e.position) else {
                return PacketStep::Lost;
            };
            let gap = self.position.distance(waypoint);
            if remaining < gap {
                let from = store.get(self.source).map_or(self.position, |e| e.position);
                let heading = (waypoint - from).normalize();
                self.position = self.position + heading.scale(remaining);
                return PacketStep::InFlight;
            }

            self.position = waypoint;
            remaining -= gap;
            if self.next == self.target {
                return PacketStep::Arrived;
            }
            self.source = self.next;
            match routing.next_step(store, self.source, self.target) {
                Some(next) => self.next = next,
                None => {
                    tracing::debug!(
                        at = self.source,
                        target = self.target,
                        "Supply packet lost its route"
                    );
                    return PacketStep::Lost;
                }
            }
        }
    }
}

/// Take one unit from `source` and launch a packet toward `target`.
///
/// # Errors
///
/// Returns [`SupplyError::NoRoute`] if `target` is unreachable and
/// [`SupplyError::EntityNotFound`] if `source` does not exist. Nothing is
/// deducted on error.
pub fn emit_supply(
    store: &mut EntityStore,
    routing: &mut RoutingEngine,
    source: EntityId,
    target: EntityId,
    speed: Fixed,
) -> Result<Packet> {
    let next = routing
        .next_step(store, source, target)
        .ok_or(SupplyError::NoRoute {
            from: source,
            to: target,
        })?;
    let producer = store
        .get_mut(source)
        .ok_or(SupplyError::EntityNotFound(source))?;
    producer.supply = producer.supply.saturating_sub(Supply::ONE);
    Ok(Packet {
        source,
        target,
        next,
        position: producer.position,
        speed,
    })
}

/// What a delivered packet did to its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Construction advanced but is not finished.
    Progressed,
    /// The last construction packet arrived; the entity is now operating.
    Completed,
    /// Added to the receiver's stock (capped).
    Stocked,
}

/// Apply an arrived packet to `target`.
///
/// Clears the enroute flag, then either advances construction or adds one
/// unit of stock. Returns `None` if the target no longer exists.
pub fn deliver(store: &mut EntityStore, target: EntityId) -> Option<Delivery> {
    let entity = store.get_mut(target)?;
    entity.supply_enroute = false;

    let EntityState::UnderConstruction(mut build) = entity.state else {
        entity.supply = entity.supply.add_capped(Supply::ONE, entity.supply_max);
        return Some(Delivery::Stocked);
    };

    build.progress += 1;
    let shown = entity.build_display.map_or(Fixed::ZERO, |d| d.shown);
    entity.build_display = Some(BuildDisplay::snapshot(build, shown));
    if build.is_complete() {
        entity.state = EntityState::Operating;
        Some(Delivery::Completed)
    } else {
        entity.state = EntityState::UnderConstruction(build);
        Some(Delivery::Progressed)
    }
}
