//! Entity storage.
//!
//! The store is the single owner of every [`Entity`]. Ids are assigned
//! monotonically starting at 1 and are never reused; entities are never
//! removed (depleted asteroids and exhausted miners stay on the map).

use std::collections::BTreeMap;

use crate::data::EntityTypeTable;
use crate::entity::{
    BuildDisplay, BuildProgress, Entity, EntityId, EntityKind, EntitySpec, EntityState,
    MinerState, ProducerState, Role,
};
use crate::math::Fixed;

/// Storage for all entities in the simulation.
///
/// Backed by a `BTreeMap` so every walk over the store visits entities in
/// ascending id order. Routing, scheduling and tie-breaking all depend on
/// that order being reproducible.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    /// Map of entity ID to entity data.
    entities: BTreeMap<EntityId, Entity>,
    /// Last entity ID assigned.
    last_id: EntityId,
}

impl EntityStore {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, filling type-derived defaults from `types`.
    ///
    /// The entity is visible to every other component immediately.
    pub fn add(&mut self, spec: &EntitySpec, types: &EntityTypeTable) -> EntityId {
        let data = types.get(spec.kind);
        self.last_id += 1;
        let id = self.last_id;

        let (state, frame, build_display) = if spec.under_construction {
            let build = BuildProgress::new(data.cost_supply);
            (
                EntityState::UnderConstruction(build),
                data.construction_frame(),
                Some(BuildDisplay::snapshot(build, Fixed::ZERO)),
            )
        } else {
            (EntityState::Operating, data.frame, None)
        };

        let role = if data.supply_source {
            Role::Producer(ProducerState::default())
        } else if data.mining.is_some() {
            Role::Miner(MinerState::default())
        } else if spec.kind == EntityKind::Asteroid {
            Role::Deposit { value: spec.value }
        } else {
            Role::Relay
        };

        let entity = Entity {
            id,
            kind: spec.kind,
            position: spec.position,
            radius: data.radius,
            frame,
            z: data.frame.z_order(),
            rotation: spec.rotation,
            vis_seed: spec.vis_seed,
            supply: spec.supply,
            supply_max: data.supply_cap(),
            supply_enroute: false,
            max_links: data.max_links,
            state,
            build_display,
            role,
        };
        self.entities.insert(id, entity);
        id
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Last ID handed out (0 before the first insert).
    #[must_use]
    pub const fn last_id(&self) -> EntityId {
        self.last_id
    }

    /// Entity IDs in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Iterate over all entities in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Iterate mutably over all entities in ascending ID order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Frame, LinkCap};
    use crate::math::Vec2Fixed;
    use crate::supply::Supply;

    #[test]
    fn test_ids_are_monotonic_from_one() {
        let types = EntityTypeTable::standard();
        let mut store = EntityStore::new();
        let a = store.add(&EntitySpec::new(EntityKind::Router, Vec2Fixed::ZERO), &types);
        let b = store.add(&EntitySpec::new(EntityKind::Router, Vec2Fixed::ZERO), &types);
        assert_eq!((a, b), (1, 2));
        assert_eq!(store.last_id(), 2);
        assert_eq!(store.ids(), vec![1, 2]);
    }

    #[test]
    fn test_type_defaults_are_filled() {
        let types = EntityTypeTable::standard();
        let mut store = EntityStore::new();
        let id = store.add(
            &EntitySpec::new(EntityKind::Factory, Vec2Fixed::from_ints(360, 200))
                .with_supply(Supply::units(10)),
            &types,
        );
        let factory = store.get(id).unwrap();
        assert_eq!(factory.frame, Frame::Factory);
        assert_eq!(factory.supply_max, Supply::units(10));
        assert_eq!(factory.max_links, LinkCap::Unbounded);
        assert!(factory.is_supply_source());
        assert!(factory.is_active());
        assert!(!factory.supply_enroute);
    }

    #[test]
    fn test_under_construction_uses_building_frame() {
        let types = EntityTypeTable::standard();
        let mut store = EntityStore::new();
        let id = store.add(
            &EntitySpec::new(EntityKind::Miner, Vec2Fixed::ZERO).under_construction(),
            &types,
        );
        let miner = store.get(id).unwrap();
        assert_eq!(miner.frame, Frame::MinerBuilding);
        assert_eq!(miner.z, Frame::Miner.z_order());
        assert_eq!(
            miner.building(),
            Some(BuildProgress {
                progress: 0,
                required: 3
            })
        );
        assert!(miner.build_display.is_some());
        assert!(miner.miner().is_some());
        assert!(!miner.is_active());
    }

    #[test]
    fn test_asteroid_gets_deposit_role() {
        let types = EntityTypeTable::standard();
        let mut store = EntityStore::new();
        let id = store.add(
            &EntitySpec::new(EntityKind::Asteroid, Vec2Fixed::ZERO).with_value(750),
            &types,
        );
        let asteroid = store.get(id).unwrap();
        assert_eq!(asteroid.deposit_value(), Some(750));
        assert!(!asteroid.is_link_capable());
    }
}
