//! Production and extraction.
//!
//! Producers turn queued orders into packets at a fixed cadence. Miners
//! burn stocked supply to pull value out of a bound asteroid, rebinding to
//! the nearest minable neighbour when it runs dry and shutting down for
//! good when nothing is left in reach.

use crate::data::MiningStats;
use crate::entity::{turns, Entity, EntityId, EntityState, Frame, Role};
use crate::math::{Fixed, Vec2Fixed};
use crate::store::EntityStore;
use crate::supply::Supply;

/// Advance a producer's emission timer.
///
/// Returns the order to emit for now, if one is due. An idle producer
/// banks at most one interval, so the first order after a lull goes out
/// immediately but a long lull does not build up a burst.
pub fn update_supply_source(entity: &mut Entity, dt_ms: u32, interval_ms: u32) -> Option<EntityId> {
    let producer = entity.producer_mut()?;
    producer.order_time_accum = producer.order_time_accum.saturating_add(dt_ms);
    if producer.orders.is_empty() {
        producer.order_time_accum = producer.order_time_accum.min(interval_ms);
        return None;
    }
    if producer.order_time_accum < interval_ms {
        return None;
    }
    producer.order_time_accum -= interval_ms;
    producer.orders.pop_front()
}

/// What one mining step produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MiningYield {
    /// Ore extracted this step.
    pub ore: u32,
    /// The miner rebound to a new asteroid.
    pub rebound: bool,
    /// The miner found nothing left in reach and shut down.
    pub exhausted: bool,
    /// The asteroid being mined ran dry this step.
    pub depleted: Option<EntityId>,
}

/// Bind `miner_id` to the nearest asteroid with value left.
///
/// Only asteroids within `radius_sq` are considered; ties go to the lowest
/// id. With nothing in reach the miner becomes exhausted, which is
/// terminal. Returns `true` if the miner is bound afterwards.
pub fn activate_miner(store: &mut EntityStore, miner_id: EntityId, radius_sq: Fixed) -> bool {
    let Some(miner) = store.get(miner_id) else {
        return false;
    };
    if miner.is_exhausted() || miner.miner().is_none() {
        return false;
    }
    let origin = miner.position;

    let mut nearest: Option<(EntityId, Fixed, Vec2Fixed)> = None;
    for asteroid in store.iter() {
        if asteroid.id == miner_id || !asteroid.is_minable() {
            continue;
        }
        let dist_sq = origin.distance_squared(asteroid.position);
        if dist_sq > radius_sq {
            continue;
        }
        if nearest.map_or(true, |(_, best, _)| dist_sq < best) {
            nearest = Some((asteroid.id, dist_sq, asteroid.position));
        }
    }

    let Some(miner) = store.get_mut(miner_id) else {
        return false;
    };
    match nearest {
        Some((asteroid_id, _, asteroid_pos)) => {
            if let Some(state) = miner.miner_mut() {
                state.asteroid_link = Some(asteroid_id);
            }
            update_miner_frame(miner, Some(asteroid_pos));
            tracing::trace!(miner = miner_id, asteroid = asteroid_id, "Miner bound");
            true
        }
        None => {
            if let Some(state) = miner.miner_mut() {
                state.asteroid_link = None;
            }
            miner.state = EntityState::Exhausted;
            miner.supply = Supply::ZERO;
            miner.supply_max = Supply::ZERO;
            miner.rotation = turns::ZERO;
            miner.set_frame(Frame::MinerDone);
            tracing::debug!(miner = miner_id, "Miner exhausted");
            false
        }
    }
}

/// Pick the miner's frame and rotation from its stock and the direction of
/// its asteroid.
///
/// A miner without stock (or without an asteroid) idles. Otherwise the
/// drill points along an axis when one component dominates by more than
/// 2:1, else diagonally.
pub fn update_miner_frame(miner: &mut Entity, asteroid_pos: Option<Vec2Fixed>) {
    if miner.is_exhausted() {
        return;
    }
    let Some(target) = asteroid_pos.filter(|_| !miner.supply.is_zero()) else {
        miner.set_frame(Frame::Miner);
        miner.rotation = turns::ZERO;
        return;
    };

    let d = target - miner.position;
    let (ax, ay) = (d.x.abs(), d.y.abs());
    let two = Fixed::from_num(2);
    let negative = |v: Fixed| v < Fixed::ZERO;

    let (frame, rotation) = if ax > ay * two {
        let rot = if negative(d.x) {
            turns::THREE_QUARTERS
        } else {
            turns::QUARTER
        };
        (Frame::MinerUp, rot)
    } else if ay > ax * two {
        let rot = if negative(d.y) { turns::ZERO } else { turns::HALF };
        (Frame::MinerUp, rot)
    } else {
        let rot = match (negative(d.x), negative(d.y)) {
            (true, true) => turns::ZERO,
            (true, false) => turns::THREE_QUARTERS,
            (false, true) => turns::QUARTER,
            (false, false) => turns::HALF,
        };
        (Frame::MinerDiagonal, rot)
    };
    miner.set_frame(frame);
    miner.rotation = rotation;
}

/// Run one mining step for `miner_id`.
///
/// Mining converts elapsed time into whole ore, clamped by the asteroid's
/// remaining value and by what the stock can still pay for. Leftover time
/// carries to the next step; a miner that runs out of stock resets it.
pub fn mine(
    store: &mut EntityStore,
    miner_id: EntityId,
    dt_ms: u32,
    stats: MiningStats,
    radius_sq: Fixed,
) -> MiningYield {
    let mut result = MiningYield::default();
    let Some(miner) = store.get(miner_id) else {
        return result;
    };
    if !matches!(miner.state, EntityState::Operating) {
        return result;
    }
    let Some(mut asteroid_id) = miner.miner().and_then(|m| m.asteroid_link) else {
        return result;
    };

    let drained = store
        .get(asteroid_id)
        .and_then(Entity::deposit_value)
        .map_or(true, |value| value == 0);
    if drained {
        if !activate_miner(store, miner_id, radius_sq) {
            result.exhausted = true;
            return result;
        }
        result.rebound = true;
        match store.get(miner_id).and_then(|m| m.miner()).and_then(|m| m.asteroid_link) {
            Some(id) => asteroid_id = id,
            None => return result,
        }
    }

    let (Some(value), Some(asteroid_pos)) = (
        store.get(asteroid_id).and_then(Entity::deposit_value),
        store.get(asteroid_id).map(|a| a.position),
    ) else {
        return result;
    };

    let Some(miner) = store.get_mut(miner_id) else {
        return result;
    };
    let stock = miner.supply;
    if stock.is_zero() {
        return result;
    }
    let Some(state) = miner.miner_mut() else {
        return result;
    };
    state.time_accum = state.time_accum.saturating_add(dt_ms);
    let ore = (state.time_accum / stats.mine_rate_ms)
        .min(value)
        .min(stats.ore_budget(stock));
    if ore == 0 {
        return result;
    }
    state.time_accum = state
        .time_accum
        .saturating_sub(ore * stats.mine_rate_ms);

    let burnt = Supply::from_raw(stats.supply_per_ore().raw().saturating_mul(ore));
    miner.supply = stock.saturating_sub(burnt);
    if miner.supply.is_zero() {
        if let Some(state) = miner.miner_mut() {
            state.time_accum = 0;
        }
        update_miner_frame(miner, Some(asteroid_pos));
    }

    if let Some(asteroid) = store.get_mut(asteroid_id) {
        let remaining = value - ore;
        asteroid.role = Role::Deposit { value: remaining };
        if remaining == 0 {
            asteroid.set_frame(Frame::AsteroidEmpty);
            result.depleted = Some(asteroid_id);
        }
    }

    result.ore = ore;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EntityTypeTable;
    use crate::entity::{EntityKind, EntitySpec};

    fn radius_sq() -> Fixed {
        Fixed::from_num(26 * 26)
    }

    fn stats() -> MiningStats {
        EntityTypeTable::standard().miner.mining.unwrap()
    }

    fn add(store: &mut EntityStore, spec: EntitySpec) -> EntityId {
        store.add(&spec, &EntityTypeTable::standard())
    }

    fn miner_with_asteroid(value: u32) -> (EntityStore, EntityId, EntityId) {
        let mut store = EntityStore::new();
        let asteroid = add(
            &mut store,
            EntitySpec::new(EntityKind::Asteroid, Vec2Fixed::from_ints(110, 100)).with_value(value),
        );
        let miner = add(
            &mut store,
            EntitySpec::new(EntityKind::Miner, Vec2Fixed::from_ints(100, 100))
                .with_supply(Supply::ONE),
        );
        assert!(activate_miner(&mut store, miner, radius_sq()));
        (store, miner, asteroid)
    }

    #[test]
    fn test_producer_banks_one_interval_when_idle() {
        let mut store = EntityStore::new();
        let f = add(&mut store, EntitySpec::new(EntityKind::Factory, Vec2Fixed::ZERO));
        let factory = store.get_mut(f).unwrap();

        assert_eq!(update_supply_source(factory, 10_000, 250), None);
        assert_eq!(factory.producer().unwrap().order_time_accum, 250);

        factory.producer_mut().unwrap().orders.extend([7, 8]);
        assert_eq!(update_supply_source(factory, 16, 250), Some(7));
        assert_eq!(factory.producer().unwrap().order_time_accum, 16);
        assert_eq!(update_supply_source(factory, 200, 250), None);
        assert_eq!(update_supply_source(factory, 34, 250), Some(8));
        assert_eq!(factory.producer().unwrap().order_time_accum, 0);
    }

    #[test]
    fn test_non_producer_never_emits() {
        let mut store = EntityStore::new();
        let r = add(&mut store, EntitySpec::new(EntityKind::Router, Vec2Fixed::ZERO));
        assert_eq!(update_supply_source(store.get_mut(r).unwrap(), 1000, 250), None);
    }

    #[test]
    fn test_one_unit_mines_eighty_ore() {
        let (mut store, miner, asteroid) = miner_with_asteroid(1000);
        let mut total = 0;
        for _ in 0..1000 {
            total += mine(&mut store, miner, 16, stats(), radius_sq()).ore;
        }
        assert_eq!(total, 80);
        assert_eq!(store.get(asteroid).unwrap().deposit_value(), Some(920));
        let m = store.get(miner).unwrap();
        assert!(m.supply.is_zero());
        assert_eq!(m.frame, Frame::Miner);
        assert_eq!(m.miner().unwrap().time_accum, 0);
    }

    #[test]
    fn test_mining_clamped_by_asteroid_value() {
        let (mut store, miner, asteroid) = miner_with_asteroid(3);
        let result = mine(&mut store, miner, 1000, stats(), radius_sq());
        assert_eq!(result.ore, 3);
        assert_eq!(result.depleted, Some(asteroid));
        let rock = store.get(asteroid).unwrap();
        assert_eq!(rock.frame, Frame::AsteroidEmpty);
        assert_eq!(rock.z, Frame::AsteroidEmpty.z_order());
        // 3 ore burnt 375 raw
        assert_eq!(store.get(miner).unwrap().supply, Supply::from_raw(10_000 - 375));
    }

    #[test]
    fn test_rebinds_then_exhausts() {
        let (mut store, miner, first) = miner_with_asteroid(1);
        let second = add(
            &mut store,
            EntitySpec::new(EntityKind::Asteroid, Vec2Fixed::from_ints(100, 115)).with_value(1),
        );

        assert_eq!(mine(&mut store, miner, 125, stats(), radius_sq()).depleted, Some(first));
        let result = mine(&mut store, miner, 125, stats(), radius_sq());
        assert!(result.rebound);
        assert_eq!(result.ore, 1);
        assert_eq!(store.get(miner).unwrap().miner().unwrap().asteroid_link, Some(second));

        let result = mine(&mut store, miner, 125, stats(), radius_sq());
        assert!(result.exhausted);
        let m = store.get(miner).unwrap();
        assert!(m.is_exhausted());
        assert_eq!(m.frame, Frame::MinerDone);
        assert!(m.supply_max.is_zero());
        assert!(!activate_miner(&mut store, miner, radius_sq()));
    }

    #[test]
    fn test_nearest_asteroid_wins_and_ties_go_to_lowest_id() {
        let mut store = EntityStore::new();
        let far = add(
            &mut store,
            EntitySpec::new(EntityKind::Asteroid, Vec2Fixed::from_ints(20, 0)).with_value(5),
        );
        let left = add(
            &mut store,
            EntitySpec::new(EntityKind::Asteroid, Vec2Fixed::from_ints(-10, 0)).with_value(5),
        );
        let right = add(
            &mut store,
            EntitySpec::new(EntityKind::Asteroid, Vec2Fixed::from_ints(10, 0)).with_value(5),
        );
        let miner = add(&mut store, EntitySpec::new(EntityKind::Miner, Vec2Fixed::ZERO));
        assert!(activate_miner(&mut store, miner, radius_sq()));
        let link = store.get(miner).unwrap().miner().unwrap().asteroid_link;
        assert_eq!(link, Some(left));
        assert_ne!(link, Some(far));
        assert_ne!(link, Some(right));
    }

    #[test]
    fn test_out_of_reach_asteroid_exhausts_miner() {
        let mut store = EntityStore::new();
        add(
            &mut store,
            EntitySpec::new(EntityKind::Asteroid, Vec2Fixed::from_ints(27, 0)).with_value(5),
        );
        let miner = add(&mut store, EntitySpec::new(EntityKind::Miner, Vec2Fixed::ZERO));
        assert!(!activate_miner(&mut store, miner, radius_sq()));
        assert!(store.get(miner).unwrap().is_exhausted());
    }

    #[test]
    fn test_miner_frame_orientation() {
        let mut store = EntityStore::new();
        let id = add(
            &mut store,
            EntitySpec::new(EntityKind::Miner, Vec2Fixed::ZERO).with_supply(Supply::ONE),
        );
        let miner = store.get_mut(id).unwrap();
        let cases = [
            ((-10, 1), Frame::MinerUp, turns::THREE_QUARTERS),
            ((10, 1), Frame::MinerUp, turns::QUARTER),
            ((1, -10), Frame::MinerUp, turns::ZERO),
            ((1, 10), Frame::MinerUp, turns::HALF),
            ((-5, -5), Frame::MinerDiagonal, turns::ZERO),
            ((-5, 5), Frame::MinerDiagonal, turns::THREE_QUARTERS),
            ((5, -5), Frame::MinerDiagonal, turns::QUARTER),
            ((5, 5), Frame::MinerDiagonal, turns::HALF),
        ];
        for ((dx, dy), frame, rotation) in cases {
            update_miner_frame(miner, Some(Vec2Fixed::from_ints(dx, dy)));
            assert_eq!((miner.frame, miner.rotation), (frame, rotation), "offset ({dx}, {dy})");
        }

        miner.supply = Supply::ZERO;
        update_miner_frame(miner, Some(Vec2Fixed::from_ints(5, 5)));
        assert_eq!((miner.frame, miner.rotation), (Frame::Miner, turns::ZERO));
    }
}
