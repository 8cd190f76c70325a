//! Core simulation loop.
//!
//! [`Simulation`] owns the whole session: the entity store, the routing
//! engine, the demand scheduler and the packets in flight. Time advances in
//! whole milliseconds; a rendered frame is split into steps of at most
//! `max_step_ms` so packet motion and mining stay stable under frame
//! hitches.
//!
//! # Determinism
//!
//! - No floating-point math (positions and distances are [`Fixed`])
//! - No system randomness (a seeded [`FieldRng`] drives generation)
//! - Entities are always visited in ascending id order
//! - Same seed and same placements at the same times give the same session
//!
//! # Example
//!
//! ```
//! use supply_core::prelude::*;
//!
//! let mut sim = Simulation::new(SimConfig::default());
//! let factory = sim.spawn_entity(
//!     &EntitySpec::new(EntityKind::Factory, Vec2Fixed::from_ints(100, 100))
//!         .with_supply(Supply::units(10)),
//! );
//!
//! // Placing a router queues its construction packet and unpauses.
//! let router = sim
//!     .place(&PlacementCandidate::at(EntityKind::Router, 140, 100))
//!     .unwrap();
//! assert!(!sim.is_paused());
//! assert_eq!(sim.money(), 490);
//!
//! // The factory emits after one interval; the packet then travels 40 units.
//! let events = sim.tick(250);
//! assert_eq!(events.packets_emitted, 1);
//! let events = sim.tick(500);
//! assert_eq!(events.constructed, vec![router]);
//! assert!(sim.entity(router).unwrap().is_active());
//! # let _ = factory;
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::mem;

use crate::config::SimConfig;
use crate::demand::{DemandScheduler, PeriodicReport};
use crate::entity::{Entity, EntityId, EntityKind, EntitySpec};
use crate::error::{Result, SupplyError};
use crate::field::{generate_asteroids, FieldRng};
use crate::math::{fixed_sqrt, Fixed, Vec2Fixed};
use crate::placement::{plan_placement, PlacementCandidate, PlacementPlan};
use crate::production::{self, MiningYield};
use crate::routing::RoutingEngine;
use crate::store::EntityStore;
use crate::supply::Supply;
use crate::transit::{self, Delivery, Packet, PacketStep};

/// Events generated while advancing the simulation.
///
/// Drivers use these for logging, reports and effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Periodic demand passes that ran.
    pub periodic_passes: Vec<PeriodicReport>,
    /// Packets launched.
    pub packets_emitted: u32,
    /// Entities that received a packet.
    pub deliveries: Vec<EntityId>,
    /// Entities that finished construction.
    pub constructed: Vec<EntityId>,
    /// Miners that ran out of asteroids.
    pub exhausted: Vec<EntityId>,
    /// Asteroids mined empty.
    pub depleted: Vec<EntityId>,
    /// Ore mined.
    pub ore_mined: u64,
    /// Packets discarded for lack of a route.
    pub packets_lost: u32,
    /// Orders dropped because no route existed at emission time.
    pub dropped_orders: u32,
}

impl TickEvents {
    /// Append `other` to these events.
    pub fn merge(&mut self, other: Self) {
        self.periodic_passes.extend(other.periodic_passes);
        self.packets_emitted += other.packets_emitted;
        self.deliveries.extend(other.deliveries);
        self.constructed.extend(other.constructed);
        self.exhausted.extend(other.exhausted);
        self.depleted.extend(other.depleted);
        self.ore_mined += other.ore_mined;
        self.packets_lost += other.packets_lost;
        self.dropped_orders += other.dropped_orders;
    }
}

/// Stock readout across all producers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupplySummary {
    /// Whole units held by operating producers.
    pub available: u32,
    /// Combined cap of all producers, built or not.
    pub total: u32,
}

/// The supply network simulation.
///
/// # Step Order
///
/// Each [`tick`](Self::tick):
/// 1. **Periodic pass** - when the elapsed time crosses a period boundary,
///    producers regenerate and needy entities are serviced round-robin
/// 2. **Entities** - in id order, skipping construction sites: producers
///    emit due orders, miners mine
/// 3. **Packets** - newest first; arrivals apply their effects immediately
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    store: EntityStore,
    routing: RoutingEngine,
    scheduler: DemandScheduler,
    packets: Vec<Packet>,
    /// Simulated milliseconds since start.
    elapsed_ms: u64,
    money: u32,
    value_mined: u64,
    total_value: u64,
    paused: bool,
    rng: FieldRng,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Simulation {
    /// Create an empty, paused simulation.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            money: config.starting_money,
            config,
            store: EntityStore::new(),
            routing: RoutingEngine::new(),
            scheduler: DemandScheduler::new(),
            packets: Vec::new(),
            elapsed_ms: 0,
            value_mined: 0,
            total_value: 0,
            paused: true,
            rng: FieldRng::new(0),
        }
    }

    /// Standard session from a seed string.
    #[must_use]
    pub fn from_seed(seed: &str) -> Self {
        Self::seeded(SimConfig::default(), seed)
    }

    /// Session with a fully stocked factory at the centre of the world and
    /// a generated asteroid field around it. Starts paused.
    #[must_use]
    pub fn seeded(config: SimConfig, seed: &str) -> Self {
        let mut sim = Self::new(config);
        sim.rng = FieldRng::from_seed_str(seed);

        let centre = Vec2Fixed::new(
            Fixed::from_num(sim.config.world_width) / Fixed::from_num(2),
            Fixed::from_num(sim.config.world_height) / Fixed::from_num(2),
        );
        let stock = sim.config.types.factory.supply_cap();
        sim.spawn_entity(&EntitySpec::new(EntityKind::Factory, centre).with_supply(stock));

        for asteroid in generate_asteroids(&sim.config, &mut sim.rng) {
            sim.spawn_entity(
                &EntitySpec::new(EntityKind::Asteroid, asteroid.position)
                    .with_rotation(asteroid.rotation)
                    .with_value(asteroid.value),
            );
        }

        tracing::info!(
            seed,
            asteroids = sim.config.asteroid_count,
            total_value = sim.total_value,
            "Generated asteroid field"
        );
        sim
    }

    /// Add an entity directly, bypassing placement rules and cost.
    ///
    /// Asteroids add to the field's total value. Operating miners bind to
    /// an asteroid right away, so spawn asteroids first.
    pub fn spawn_entity(&mut self, spec: &EntitySpec) -> EntityId {
        let id = self.store.add(spec, &self.config.types);
        if spec.kind == EntityKind::Asteroid {
            self.total_value += u64::from(spec.value);
        }
        if self.config.types.get(spec.kind).max_links.is_link_capable() {
            self.routing.invalidate();
        }
        let operating_miner = self
            .store
            .get(id)
            .is_some_and(|e| e.miner().is_some() && e.is_active());
        if operating_miner {
            production::activate_miner(&mut self.store, id, self.config.asteroid_link_radius_sq());
        }
        id
    }

    /// Link two existing entities directly, bypassing placement rules.
    ///
    /// # Errors
    ///
    /// Returns [`SupplyError::EntityNotFound`] for unknown ids,
    /// [`SupplyError::InvalidState`] if either end cannot take links and
    /// [`SupplyError::DuplicateLink`] if they are already linked.
    pub fn connect(&mut self, a: EntityId, b: EntityId) -> Result<()> {
        let first = self.store.get(a).ok_or(SupplyError::EntityNotFound(a))?;
        let second = self.store.get(b).ok_or(SupplyError::EntityNotFound(b))?;
        if !first.is_link_capable() || !second.is_link_capable() {
            return Err(SupplyError::InvalidState(format!(
                "cannot link {} {a} to {} {b}",
                first.kind, second.kind
            )));
        }
        let distance = first.position.distance(second.position);
        self.routing.add_link(a, b, distance)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Entity store.
    #[must_use]
    pub const fn entities(&self) -> &EntityStore {
        &self.store
    }

    /// Look up one entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.store.get(id)
    }

    /// Routing engine (links and cached paths).
    #[must_use]
    pub const fn routing(&self) -> &RoutingEngine {
        &self.routing
    }

    /// First hop from `from` toward `to`, rebuilding paths if needed.
    pub fn next_step(&mut self, from: EntityId, to: EntityId) -> Option<EntityId> {
        self.routing.next_step(&self.store, from, to)
    }

    /// Route length between two entities, rebuilding paths if needed.
    pub fn path_distance(&mut self, from: EntityId, to: EntityId) -> Option<Fixed> {
        self.routing.distance(&self.store, from, to)
    }

    /// Packets in flight.
    #[must_use]
    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    /// Demand scheduler state.
    #[must_use]
    pub const fn scheduler(&self) -> &DemandScheduler {
        &self.scheduler
    }

    /// Simulated milliseconds since start.
    #[must_use]
    pub const fn tick_counter(&self) -> u64 {
        self.elapsed_ms
    }

    /// Current money.
    #[must_use]
    pub const fn money(&self) -> u32 {
        self.money
    }

    /// Ore mined so far.
    #[must_use]
    pub const fn value_mined(&self) -> u64 {
        self.value_mined
    }

    /// Value of the whole asteroid field.
    #[must_use]
    pub const fn total_value(&self) -> u64 {
        self.total_value
    }

    /// Whether the field has been mined out.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.total_value > 0 && self.value_mined >= self.total_value
    }

    /// Whether time is frozen.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Freeze or resume time.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Stock held by producers, for the HUD.
    #[must_use]
    pub fn available_supply(&self) -> SupplySummary {
        let mut summary = SupplySummary::default();
        for entity in self.store.iter() {
            if !entity.is_supply_source() || entity.supply_max.is_zero() {
                continue;
            }
            summary.total += entity.supply_max.whole_units();
            if entity.is_active() {
                summary.available += entity.supply.whole_units();
            }
        }
        summary
    }

    /// Whether the player can pay for `kind`.
    #[must_use]
    pub fn can_afford(&self, kind: EntityKind) -> bool {
        self.money >= self.config.types.get(kind).cost
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    /// Validate a placement without committing it.
    #[must_use]
    pub fn can_place(&self, candidate: &PlacementCandidate) -> Option<PlacementPlan> {
        plan_placement(&self.store, &self.routing, &self.config, candidate)
    }

    /// Build `candidate`: charge its cost, add it under construction, link
    /// it, request its first packet and unpause.
    ///
    /// # Errors
    ///
    /// Returns [`SupplyError::PlacementBlocked`] if the placement is invalid
    /// and [`SupplyError::InsufficientFunds`] if it is not affordable.
    /// Nothing changes on error.
    pub fn place(&mut self, candidate: &PlacementCandidate) -> Result<EntityId> {
        let kind = candidate.kind;
        let plan = self.can_place(candidate).ok_or(SupplyError::PlacementBlocked {
            kind,
            x: candidate.position.x,
            y: candidate.position.y,
        })?;
        let cost = self.config.types.get(kind).cost;
        if self.money < cost {
            return Err(SupplyError::InsufficientFunds {
                kind,
                required: cost,
                available: self.money,
            });
        }

        let spec = EntitySpec::new(kind, candidate.position)
            .under_construction()
            .with_vis_seed(self.rng.next_u32());
        let id = self.store.add(&spec, &self.config.types);
        for link in &plan.supply_links {
            self.routing
                .add_link(link.to, id, fixed_sqrt(link.distance_sq))?;
        }
        self.routing.invalidate();
        self.money -= cost;

        let queued = DemandScheduler::pull_supply(&mut self.store, &mut self.routing, id);
        self.paused = false;
        tracing::debug!(
            entity = id,
            %kind,
            links = plan.supply_links.len(),
            queued,
            money = self.money,
            "Placed"
        );
        Ok(id)
    }

    /// Ask the nearest producer with spare stock to send `id` a packet.
    ///
    /// Returns `false` if no producer can serve it right now.
    pub fn pull_supply(&mut self, id: EntityId) -> bool {
        DemandScheduler::pull_supply(&mut self.store, &mut self.routing, id)
    }

    /// Queue a packet for every entity that wants one and can be served.
    pub fn reorder_supply(&mut self) -> usize {
        DemandScheduler::reorder_supply(&mut self.store, &mut self.routing)
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Advance by one rendered frame of `elapsed_ms`.
    ///
    /// Does nothing while paused or once the field is mined out. Long
    /// frames are split into steps of at most `max_step_ms`.
    pub fn tick_wrap(&mut self, elapsed_ms: u32) -> TickEvents {
        let mut events = TickEvents::default();
        if self.paused || self.is_complete() {
            return events;
        }
        let step = self.config.max_step_ms.max(1);
        let mut remaining = elapsed_ms;
        while remaining > step {
            events.merge(self.tick(step));
            remaining -= step;
        }
        events.merge(self.tick(remaining));
        events
    }

    /// Advance by exactly `dt_ms`.
    pub fn tick(&mut self, dt_ms: u32) -> TickEvents {
        let mut events = TickEvents::default();

        let period = u64::from(self.config.periodic_interval_ms.max(1));
        let before = self.elapsed_ms / period;
        self.elapsed_ms += u64::from(dt_ms);
        if self.elapsed_ms / period != before {
            let types = &self.config.types;
            let report = self
                .scheduler
                .periodic_pass(&mut self.store, &mut self.routing, |entity| {
                    Supply::units(types.get(entity.kind).supply_prod)
                });
            events.periodic_passes.push(report);
        }

        for id in self.store.ids() {
            self.update_entity(id, dt_ms, &mut events);
        }
        self.update_packets(dt_ms, &mut events);

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(elapsed_ms = self.elapsed_ms, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Ease construction bars toward their targets by one frame, dropping
    /// bars that have filled.
    pub fn advance_build_displays(&mut self, dt_ms: u32) {
        for entity in self.store.iter_mut() {
            let Some(display) = entity.build_display.as_mut() else {
                continue;
            };
            if display.advance(dt_ms) {
                entity.build_display = None;
            }
        }
    }

    fn update_entity(&mut self, id: EntityId, dt_ms: u32, events: &mut TickEvents) {
        let Some(entity) = self.store.get_mut(id) else {
            return;
        };
        if !entity.is_active() {
            return;
        }
        if let Some(target) =
            production::update_supply_source(entity, dt_ms, self.config.emit_interval_ms)
        {
            self.emit(id, target, events);
        }

        let Some(stats) = self
            .store
            .get(id)
            .filter(|e| e.miner().is_some())
            .and_then(|e| self.config.types.get(e.kind).mining)
        else {
            return;
        };
        let outcome = production::mine(
            &mut self.store,
            id,
            dt_ms,
            stats,
            self.config.asteroid_link_radius_sq(),
        );
        self.record_mining(id, outcome, events);
    }

    fn record_mining(&mut self, id: EntityId, outcome: MiningYield, events: &mut TickEvents) {
        if outcome.ore > 0 {
            self.value_mined += u64::from(outcome.ore);
            self.money = self.money.saturating_add(outcome.ore);
            events.ore_mined += u64::from(outcome.ore);
        }
        if let Some(asteroid) = outcome.depleted {
            events.depleted.push(asteroid);
        }
        if outcome.exhausted {
            events.exhausted.push(id);
        }
    }

    fn emit(&mut self, source: EntityId, target: EntityId, events: &mut TickEvents) {
        match transit::emit_supply(
            &mut self.store,
            &mut self.routing,
            source,
            target,
            self.config.packet_speed,
        ) {
            Ok(packet) => {
                self.packets.push(packet);
                events.packets_emitted += 1;
            }
            Err(err) => {
                tracing::error!(%err, source, target, "Dropping supply order");
                debug_assert!(false, "order {source} -> {target} could not be emitted: {err}");
                self.release(target);
                events.dropped_orders += 1;
            }
        }
    }

    fn update_packets(&mut self, dt_ms: u32, events: &mut TickEvents) {
        let mut packets = mem::take(&mut self.packets);
        let mut index = packets.len();
        while index > 0 {
            index -= 1;
            match packets[index].advance(&self.store, &mut self.routing, dt_ms) {
                PacketStep::InFlight => {}
                PacketStep::Arrived => {
                    let packet = packets.swap_remove(index);
                    self.arrive(packet.target, events);
                }
                PacketStep::Lost => {
                    let packet = packets.swap_remove(index);
                    self.release(packet.target);
                    events.packets_lost += 1;
                }
            }
        }
        packets.append(&mut self.packets);
        self.packets = packets;
    }

    /// Let `target` request supply again after its packet went missing.
    fn release(&mut self, target: EntityId) {
        if let Some(entity) = self.store.get_mut(target) {
            entity.supply_enroute = false;
        }
    }

    fn arrive(&mut self, target: EntityId, events: &mut TickEvents) {
        let Some(delivery) = transit::deliver(&mut self.store, target) else {
            return;
        };
        events.deliveries.push(target);

        match delivery {
            Delivery::Completed => self.building_finished(target, events),
            Delivery::Stocked => {
                let working_miner = self
                    .store
                    .get(target)
                    .is_some_and(|e| e.miner().is_some() && !e.is_exhausted());
                if working_miner
                    && !production::activate_miner(
                        &mut self.store,
                        target,
                        self.config.asteroid_link_radius_sq(),
                    )
                {
                    events.exhausted.push(target);
                }
            }
            Delivery::Progressed => {}
        }

        let wants_more = self
            .store
            .get(target)
            .is_some_and(|e| DemandScheduler::needs_supply(e, true));
        if wants_more {
            DemandScheduler::pull_supply(&mut self.store, &mut self.routing, target);
        }
    }

    fn building_finished(&mut self, id: EntityId, events: &mut TickEvents) {
        let Some(entity) = self.store.get_mut(id) else {
            return;
        };
        entity.set_frame(self.config.types.get(entity.kind).frame);
        let kind = entity.kind;
        let is_miner = entity.miner().is_some();
        let link_capable = entity.is_link_capable();
        let multi_link = entity.max_links.is_multi_link();
        events.constructed.push(id);
        tracing::debug!(entity = id, %kind, "Construction finished");

        if is_miner
            && !production::activate_miner(&mut self.store, id, self.config.asteroid_link_radius_sq())
        {
            events.exhausted.push(id);
        }
        if link_capable {
            self.routing.invalidate();
        }
        if multi_link {
            DemandScheduler::reorder_supply(&mut self.store, &mut self.routing);
        }
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    /// Compute a hash of the complete simulation state.
    ///
    /// Two simulations fed the same seed and placements at the same times
    /// produce identical hashes at every step.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.elapsed_ms.hash(&mut hasher);
        self.money.hash(&mut hasher);
        self.value_mined.hash(&mut hasher);
        self.total_value.hash(&mut hasher);
        self.paused.hash(&mut hasher);
        self.scheduler.hash(&mut hasher);
        self.rng.hash(&mut hasher);

        self.store.len().hash(&mut hasher);
        for entity in self.store.iter() {
            entity.hash(&mut hasher);
        }
        self.routing.links().hash(&mut hasher);
        self.packets.hash(&mut hasher);

        hasher.finish()
    }
}
