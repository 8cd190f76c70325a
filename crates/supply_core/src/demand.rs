//! Demand scheduling.
//!
//! Decides which entity needs supply, which producer serves it, and in what
//! order requests are queued. Requests are raised in three places:
//!
//! - the periodic pass, which walks every needy entity in round-robin order
//!   starting after the last one serviced;
//! - right after a delivery, if the receiver still wants more;
//! - after a multi-link entity finishes construction, since new routes may
//!   have opened up for everyone.
//!
//! A request pushes the requester onto the chosen producer's order queue and
//! sets its `supply_enroute` flag, so no entity ever has two packets coming.

use crate::entity::{Entity, EntityId};
use crate::math::Fixed;
use crate::routing::RoutingEngine;
use crate::store::EntityStore;
use crate::supply::Supply;

/// Outcome of one periodic pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodicReport {
    /// Entities that needed supply when the pass started, ascending.
    pub needy: Vec<EntityId>,
    /// Entities that got an order, in service order.
    pub serviced: Vec<EntityId>,
}

/// Round-robin demand scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DemandScheduler {
    /// Id of the last entity serviced by a periodic pass.
    round_robin_id: EntityId,
}

impl DemandScheduler {
    /// Create a scheduler that starts its first pass at the lowest id.
    #[must_use]
    pub const fn new() -> Self {
        Self { round_robin_id: 0 }
    }

    /// Id of the last entity serviced by a periodic pass.
    #[must_use]
    pub const fn round_robin_id(&self) -> EntityId {
        self.round_robin_id
    }

    /// Whether `entity` should request a packet now.
    ///
    /// Sites under construction always want supply. Stocked consumers want
    /// it while below their cap. Right after a delivery
    /// (`after_delivery`), a consumer within one unit of its cap waits for
    /// the next pass instead.
    #[must_use]
    pub fn needs_supply(entity: &Entity, after_delivery: bool) -> bool {
        if entity.supply_enroute {
            return false;
        }
        if entity.building().is_some() {
            return true;
        }
        !entity.supply_max.is_zero()
            && entity.supply < entity.supply_max
            && !entity.is_supply_source()
            && !(after_delivery && entity.supply > entity.supply_max.saturating_sub(Supply::ONE))
    }

    /// Closest active producer with stock not yet promised to an order.
    ///
    /// Ties go to the lowest id.
    pub fn find_supply_source(
        store: &EntityStore,
        routing: &mut RoutingEngine,
        requester: EntityId,
    ) -> Option<EntityId> {
        let paths = routing.paths(store);
        let mut best: Option<(EntityId, Fixed)> = None;
        for candidate in store.iter() {
            if !candidate.is_active() {
                continue;
            }
            let Some(producer) = candidate.producer() else {
                continue;
            };
            if !producer.has_uncommitted(candidate.supply) {
                continue;
            }
            let Some(distance) = paths.distance(requester, candidate.id) else {
                continue;
            };
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((candidate.id, distance));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Queue a packet for `requester` at the closest eligible producer.
    ///
    /// Returns `false` and changes nothing if no producer can serve it.
    pub fn pull_supply(
        store: &mut EntityStore,
        routing: &mut RoutingEngine,
        requester: EntityId,
    ) -> bool {
        let Some(source) = Self::find_supply_source(store, routing, requester) else {
            return false;
        };
        if let Some(producer) = store.get_mut(source).and_then(Entity::producer_mut) {
            producer.orders.push_back(requester);
        } else {
            return false;
        }
        if let Some(entity) = store.get_mut(requester) {
            entity.supply_enroute = true;
        }
        tracing::trace!(requester, source, "Queued supply order");
        true
    }

    /// Periodic pass: regenerate producers, then service needy entities.
    ///
    /// Servicing starts at the first needy id above the round-robin
    /// watermark and wraps around, so the entity serviced last time goes
    /// to the back of the line.
    pub fn periodic_pass(
        &mut self,
        store: &mut EntityStore,
        routing: &mut RoutingEngine,
        production: impl Fn(&Entity) -> Supply,
    ) -> PeriodicReport {
        for entity in store.iter_mut() {
            if !entity.is_supply_source() {
                continue;
            }
            let produced = production(entity);
            entity.supply = entity.supply.add_capped(produced, entity.supply_max);
        }

        let needy: Vec<EntityId> = store
            .iter()
            .filter(|e| Self::needs_supply(e, false))
            .map(|e| e.id)
            .collect();

        let mut serviced = Vec::new();
        if !needy.is_empty() {
            let start = needy
                .iter()
                .position(|&id| id > self.round_robin_id)
                .unwrap_or(0);
            for offset in 0..needy.len() {
                let id = needy[(start + offset) % needy.len()];
                if Self::pull_supply(store, routing, id) {
                    self.round_robin_id = id;
                    serviced.push(id);
                }
            }
        }

        tracing::debug!(
            needy = needy.len(),
            serviced = serviced.len(),
            round_robin_id = self.round_robin_id,
            "Periodic demand pass"
        );
        PeriodicReport { needy, serviced }
    }

    /// Re-evaluate every entity with delivery semantics and queue requests.
    ///
    /// Returns the number of requests queued.
    pub fn reorder_supply(store: &mut EntityStore, routing: &mut RoutingEngine) -> usize {
        let mut queued = 0;
        for id in store.ids() {
            let needy = store
                .get(id)
                .is_some_and(|entity| Self::needs_supply(entity, true));
            if needy && Self::pull_supply(store, routing, id) {
                queued += 1;
            }
        }
        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EntityTypeTable;
    use crate::entity::{EntityKind, EntitySpec};
    use crate::math::Vec2Fixed;

    fn add(store: &mut EntityStore, spec: EntitySpec) -> EntityId {
        store.add(&spec, &EntityTypeTable::standard())
    }

    fn at(x: i32) -> Vec2Fixed {
        Vec2Fixed::from_ints(x, 0)
    }

    #[test]
    fn test_needs_supply_rules() {
        let mut store = EntityStore::new();
        let site = add(
            &mut store,
            EntitySpec::new(EntityKind::Router, at(0)).under_construction(),
        );
        let router = add(&mut store, EntitySpec::new(EntityKind::Router, at(10)));
        let miner = add(&mut store, EntitySpec::new(EntityKind::Miner, at(20)));
        let factory = add(&mut store, EntitySpec::new(EntityKind::Factory, at(30)));
        let asteroid = add(
            &mut store,
            EntitySpec::new(EntityKind::Asteroid, at(40)).with_value(5),
        );

        let needs = |store: &EntityStore, id, after| {
            DemandScheduler::needs_supply(store.get(id).unwrap(), after)
        };
        assert!(needs(&store, site, false));
        assert!(!needs(&store, router, false));
        assert!(needs(&store, miner, false));
        assert!(needs(&store, miner, true));
        assert!(!needs(&store, factory, false));
        assert!(!needs(&store, asteroid, false));

        // Partially stocked: wanted at the pass, not right after a delivery
        store.get_mut(miner).unwrap().supply = Supply::from_raw(5000);
        assert!(needs(&store, miner, false));
        assert!(!needs(&store, miner, true));

        store.get_mut(site).unwrap().supply_enroute = true;
        assert!(!needs(&store, site, false));
    }

    #[test]
    fn test_nearest_source_with_spare_stock_wins() {
        let mut store = EntityStore::new();
        let mut routing = RoutingEngine::new();
        let near = add(
            &mut store,
            EntitySpec::new(EntityKind::Factory, at(0)).with_supply(Supply::units(1)),
        );
        let far = add(
            &mut store,
            EntitySpec::new(EntityKind::Factory, at(100)).with_supply(Supply::units(5)),
        );
        let m1 = add(&mut store, EntitySpec::new(EntityKind::Miner, at(30)));
        let m2 = add(&mut store, EntitySpec::new(EntityKind::Miner, at(40)));
        routing.add_link(near, m1, Fixed::from_num(30)).unwrap();
        routing.add_link(near, m2, Fixed::from_num(40)).unwrap();
        routing.add_link(far, m1, Fixed::from_num(70)).unwrap();
        routing.add_link(far, m2, Fixed::from_num(60)).unwrap();

        assert!(DemandScheduler::pull_supply(&mut store, &mut routing, m1));
        assert_eq!(store.get(near).unwrap().producer().unwrap().orders, [m1]);
        assert!(store.get(m1).unwrap().supply_enroute);

        // The near factory's only unit is promised; m2 goes to the far one
        assert_eq!(
            DemandScheduler::find_supply_source(&store, &mut routing, m2),
            Some(far)
        );
    }

    #[test]
    fn test_equal_distance_tie_goes_to_lowest_id() {
        let mut store = EntityStore::new();
        let mut routing = RoutingEngine::new();
        let a = add(
            &mut store,
            EntitySpec::new(EntityKind::Factory, at(0)).with_supply(Supply::units(1)),
        );
        let b = add(
            &mut store,
            EntitySpec::new(EntityKind::Factory, at(40)).with_supply(Supply::units(1)),
        );
        let m = add(&mut store, EntitySpec::new(EntityKind::Miner, at(20)));
        routing.add_link(b, m, Fixed::from_num(20)).unwrap();
        routing.add_link(a, m, Fixed::from_num(20)).unwrap();
        assert_eq!(
            DemandScheduler::find_supply_source(&store, &mut routing, m),
            Some(a)
        );
    }

    #[test]
    fn test_pull_without_source_changes_nothing() {
        let mut store = EntityStore::new();
        let mut routing = RoutingEngine::new();
        let f = add(&mut store, EntitySpec::new(EntityKind::Factory, at(0)));
        let m = add(&mut store, EntitySpec::new(EntityKind::Miner, at(20)));
        routing.add_link(f, m, Fixed::from_num(20)).unwrap();

        assert!(!DemandScheduler::pull_supply(&mut store, &mut routing, m));
        assert!(!store.get(m).unwrap().supply_enroute);
        assert!(store.get(f).unwrap().producer().unwrap().orders.is_empty());
    }

    #[test]
    fn test_periodic_pass_rotates_service() {
        let mut store = EntityStore::new();
        let mut routing = RoutingEngine::new();
        let f = add(&mut store, EntitySpec::new(EntityKind::Factory, at(0)));
        let sites: Vec<EntityId> = (1..=3)
            .map(|i| {
                let id = add(
                    &mut store,
                    EntitySpec::new(EntityKind::Router, at(i * 10)).under_construction(),
                );
                routing.add_link(f, id, Fixed::from_num(i * 10)).unwrap();
                id
            })
            .collect();

        let mut scheduler = DemandScheduler::new();
        let mut order = Vec::new();
        for _ in 0..4 {
            // One unit per pass
            let report = scheduler.periodic_pass(&mut store, &mut routing, |_| Supply::ONE);
            assert_eq!(report.needy, sites);
            order.extend(report.serviced.iter().copied());

            // Consume the order so every site needs supply again
            let factory = store.get_mut(f).unwrap();
            factory.supply = Supply::ZERO;
            factory.producer_mut().unwrap().orders.clear();
            for &id in &sites {
                store.get_mut(id).unwrap().supply_enroute = false;
            }
        }
        assert_eq!(order, vec![sites[0], sites[1], sites[2], sites[0]]);
    }

    #[test]
    fn test_periodic_pass_regenerates_up_to_cap() {
        let mut store = EntityStore::new();
        let mut routing = RoutingEngine::new();
        let f = add(
            &mut store,
            EntitySpec::new(EntityKind::Factory, at(0)).with_supply(Supply::units(7)),
        );
        let mut scheduler = DemandScheduler::new();
        let report = scheduler.periodic_pass(&mut store, &mut routing, |_| Supply::units(10));
        assert!(report.serviced.is_empty());
        assert_eq!(store.get(f).unwrap().supply, Supply::units(10));
    }

    #[test]
    fn test_reorder_supply_reaches_everyone() {
        let mut store = EntityStore::new();
        let mut routing = RoutingEngine::new();
        let f = add(
            &mut store,
            EntitySpec::new(EntityKind::Factory, at(0)).with_supply(Supply::units(10)),
        );
        let m1 = add(&mut store, EntitySpec::new(EntityKind::Miner, at(10)));
        let m2 = add(&mut store, EntitySpec::new(EntityKind::Miner, at(20)));
        routing.add_link(f, m1, Fixed::from_num(10)).unwrap();
        routing.add_link(f, m2, Fixed::from_num(20)).unwrap();

        assert_eq!(DemandScheduler::reorder_supply(&mut store, &mut routing), 2);
        assert_eq!(store.get(f).unwrap().producer().unwrap().orders, [m1, m2]);
        // Everyone is enroute now; a second call queues nothing
        assert_eq!(DemandScheduler::reorder_supply(&mut store, &mut routing), 0);
    }
}
