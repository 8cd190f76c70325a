//! Test fixtures and helpers.
//!
//! Small pre-wired supply networks for consistent testing. Every fixture
//! returns an unpaused simulation with all entities operating, so tests
//! can drive `tick`/`tick_wrap` straight away.

use fixed::types::I32F32;
use supply_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a ratio of integers.
#[must_use]
pub fn fixed_ratio(num: i32, den: i32) -> I32F32 {
    I32F32::from_num(num) / I32F32::from_num(den)
}

/// Spawn an operating factory holding `stock` whole units.
pub fn spawn_factory(sim: &mut Simulation, x: i32, y: i32, stock: u32) -> EntityId {
    sim.spawn_entity(
        &EntitySpec::new(EntityKind::Factory, Vec2Fixed::from_ints(x, y))
            .with_supply(Supply::units(stock)),
    )
}

/// Spawn an asteroid worth `value`.
pub fn spawn_asteroid(sim: &mut Simulation, x: i32, y: i32, value: u32) -> EntityId {
    sim.spawn_entity(
        &EntitySpec::new(EntityKind::Asteroid, Vec2Fixed::from_ints(x, y)).with_value(value),
    )
}

/// Spawn an operating entity of `kind` with no stock.
pub fn spawn(sim: &mut Simulation, kind: EntityKind, x: i32, y: i32) -> EntityId {
    sim.spawn_entity(&EntitySpec::new(kind, Vec2Fixed::from_ints(x, y)))
}

/// Factory, miner and asteroid in a row.
#[derive(Debug, Clone)]
pub struct MiningOutpost {
    /// The simulation.
    pub sim: Simulation,
    /// Factory at (360, 200) holding 10 units.
    pub factory: EntityId,
    /// Asteroid at (420, 200).
    pub asteroid: EntityId,
    /// Miner at (400, 200), linked to the factory.
    pub miner: EntityId,
}

/// A factory feeding one miner that sits next to an asteroid worth
/// `value`. The miner has requested its first packet.
#[must_use]
pub fn mining_outpost(value: u32) -> MiningOutpost {
    let mut sim = Simulation::default();
    let factory = spawn_factory(&mut sim, 360, 200, 10);
    let asteroid = spawn_asteroid(&mut sim, 420, 200, value);
    let miner = spawn(&mut sim, EntityKind::Miner, 400, 200);
    sim.connect(factory, miner)
        .expect("fixture link factory-miner");
    sim.pull_supply(miner);
    sim.set_paused(false);
    MiningOutpost {
        sim,
        factory,
        asteroid,
        miner,
    }
}

/// A factory and a miner joined by a line of routers.
#[derive(Debug, Clone)]
pub struct RelayChain {
    /// The simulation.
    pub sim: Simulation,
    /// Factory at the origin.
    pub factory: EntityId,
    /// Routers, nearest the factory first, 40 units apart.
    pub routers: Vec<EntityId>,
    /// Miner after the last router.
    pub miner: EntityId,
    /// Asteroid next to the miner.
    pub asteroid: EntityId,
}

/// `factory -- router × n -- miner`, each hop 40 units along x.
#[must_use]
pub fn relay_chain(routers: usize) -> RelayChain {
    let mut sim = Simulation::default();
    let factory = spawn_factory(&mut sim, 0, 0, 10);
    let mut previous = factory;
    let mut ids = Vec::with_capacity(routers);
    let mut x = 0;
    for _ in 0..routers {
        x += 40;
        let router = spawn(&mut sim, EntityKind::Router, x, 0);
        sim.connect(previous, router)
            .expect("fixture link along the chain");
        ids.push(router);
        previous = router;
    }
    let asteroid = spawn_asteroid(&mut sim, x + 60, 0, 1000);
    let miner = spawn(&mut sim, EntityKind::Miner, x + 40, 0);
    sim.connect(previous, miner)
        .expect("fixture link to the miner");
    sim.set_paused(false);
    RelayChain {
        sim,
        factory,
        routers: ids,
        miner,
        asteroid,
    }
}

/// Two miners sharing a factory that makes one unit per period.
#[derive(Debug, Clone)]
pub struct StarvedOutpost {
    /// The simulation.
    pub sim: Simulation,
    /// Factory with a cap of 1 and production of 1 per period, empty.
    pub factory: EntityId,
    /// Both miners, ascending id.
    pub miners: [EntityId; 2],
}

/// Type table whose factory holds and produces a single unit.
#[must_use]
pub fn scarce_types() -> EntityTypeTable {
    let mut types = EntityTypeTable::standard();
    types.factory.supply_max = 1;
    types.factory.supply_prod = 1;
    types
}

/// A factory that can fund one delivery per period, flanked by two
/// miners each bound to its own asteroid.
#[must_use]
pub fn starved_outpost() -> StarvedOutpost {
    let mut sim = Simulation::new(SimConfig::default().with_types(scarce_types()));
    let factory = spawn_factory(&mut sim, 200, 200, 0);
    spawn_asteroid(&mut sim, 140, 200, 1000);
    spawn_asteroid(&mut sim, 260, 200, 1000);
    let left = spawn(&mut sim, EntityKind::Miner, 160, 200);
    let right = spawn(&mut sim, EntityKind::Miner, 240, 200);
    sim.connect(factory, left).expect("fixture link left");
    sim.connect(factory, right).expect("fixture link right");
    sim.set_paused(false);
    StarvedOutpost {
        sim,
        factory,
        miners: [left, right],
    }
}

/// Seeded standard session with routers placed around the factory where
/// space allows. Unpaused if anything was placed.
#[must_use]
pub fn seeded_hub(seed: &str) -> Simulation {
    let mut sim = Simulation::from_seed(seed);
    let centre = sim.entity(1).map_or(Vec2Fixed::ZERO, |e| e.position);
    for (dx, dy) in [(40, 0), (-40, 0), (0, 40), (0, -40)] {
        let candidate = PlacementCandidate {
            kind: EntityKind::Router,
            position: centre + Vec2Fixed::from_ints(dx, dy),
        };
        let _ = sim.place(&candidate);
    }
    sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mining_outpost_layout() {
        let outpost = mining_outpost(1000);
        let sim = &outpost.sim;
        assert!(!sim.is_paused());
        let miner = sim.entity(outpost.miner).unwrap();
        assert_eq!(miner.miner().unwrap().asteroid_link, Some(outpost.asteroid));
        assert!(miner.supply_enroute);
        assert_eq!(sim.routing().link_count(outpost.factory), 1);
    }

    #[test]
    fn test_relay_chain_layout() {
        let chain = relay_chain(3);
        assert_eq!(chain.routers.len(), 3);
        assert_eq!(chain.sim.routing().links().len(), 4);
        assert_eq!(chain.sim.total_value(), 1000);
    }

    #[test]
    fn test_starved_outpost_starts_empty() {
        let outpost = starved_outpost();
        let factory = outpost.sim.entity(outpost.factory).unwrap();
        assert!(factory.supply.is_zero());
        assert_eq!(factory.supply_max, Supply::ONE);
    }

    #[test]
    fn test_fixed_helpers() {
        assert_eq!(fixed(3), I32F32::from_num(3));
        assert_eq!(fixed_ratio(1, 4) * fixed(4), fixed(1));
    }
}
