//! Property-based tests for routing, demand and accounting.

use proptest::prelude::*;
use supply_core::demand::DemandScheduler;
use supply_core::prelude::*;
use supply_test_utils::determinism::strategies::{arb_placement, arb_seed};
use supply_test_utils::determinism::STEP_MS;

/// Routers in a row plus a set of weighted links between them.
fn arb_router_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize, i32)>)> {
    (3usize..9).prop_flat_map(|n| {
        let edge = (0..n, 0..n, 1i32..100);
        (Just(n), proptest::collection::vec(edge, 1..(n * 2)))
    })
}

fn build_graph(n: usize, edges: &[(usize, usize, i32)]) -> (EntityStore, RoutingEngine, Vec<EntityId>) {
    let types = EntityTypeTable::standard();
    let mut store = EntityStore::new();
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let x = i32::try_from(i).unwrap() * 40;
        ids.push(store.add(&EntitySpec::new(EntityKind::Router, Vec2Fixed::from_ints(x, 0)), &types));
    }
    let mut routing = RoutingEngine::new();
    for &(a, b, weight) in edges {
        // Self-links and repeats are rejected; that is fine here
        let _ = routing.add_link(ids[a], ids[b], Fixed::from_num(weight));
    }
    (store, routing, ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_path_table_is_symmetric((n, edges) in arb_router_graph()) {
        let (store, mut routing, ids) = build_graph(n, &edges);
        let paths = routing.paths(&store);
        for &a in &ids {
            for &b in &ids {
                prop_assert_eq!(paths.distance(a, b), paths.distance(b, a));
            }
        }
    }

    #[test]
    fn prop_path_table_obeys_triangle_inequality((n, edges) in arb_router_graph()) {
        let (store, mut routing, ids) = build_graph(n, &edges);
        let paths = routing.paths(&store);
        for &a in &ids {
            for &b in &ids {
                for &c in &ids {
                    if a == b || b == c || a == c {
                        continue;
                    }
                    let (Some(ab), Some(bc)) = (paths.distance(a, b), paths.distance(b, c)) else {
                        continue;
                    };
                    let ac = paths.distance(a, c);
                    prop_assert!(ac.is_some());
                    prop_assert!(ac.unwrap() <= ab + bc);
                }
            }
        }
    }

    #[test]
    fn prop_next_step_is_a_direct_link((n, edges) in arb_router_graph()) {
        let (store, mut routing, ids) = build_graph(n, &edges);
        let links = routing.links().to_vec();
        let paths = routing.paths(&store);
        for &a in &ids {
            for &b in &ids {
                if let Some(hop) = paths.next_step(a, b) {
                    prop_assert!(links.iter().any(|link| link.joins(a, hop)));
                }
            }
        }
    }

    #[test]
    fn prop_pull_supply_is_idempotent(stock in 0u32..=10_000, cap in 0u32..3, pulls in 1usize..4) {
        let types = EntityTypeTable::standard();
        let mut store = EntityStore::new();
        let factory = store.add(
            &EntitySpec::new(EntityKind::Factory, Vec2Fixed::from_ints(0, 0)).with_supply(Supply::units(10)),
            &types,
        );
        let miner = store.add(
            &EntitySpec::new(EntityKind::Miner, Vec2Fixed::from_ints(40, 0)).with_supply(Supply::from_raw(stock)),
            &types,
        );
        if let Some(entity) = store.get_mut(miner) {
            entity.supply_max = Supply::units(cap);
        }
        let mut routing = RoutingEngine::new();
        routing.add_link(factory, miner, Fixed::from_num(40)).unwrap();

        let wanted = DemandScheduler::needs_supply(store.get(miner).unwrap(), false);
        let mut queued = 0;
        for _ in 0..pulls {
            if DemandScheduler::needs_supply(store.get(miner).unwrap(), false)
                && DemandScheduler::pull_supply(&mut store, &mut routing, miner)
            {
                queued += 1;
            }
        }

        prop_assert_eq!(queued, usize::from(wanted));
        let orders = store.get(factory).unwrap().producer().unwrap().orders.len();
        prop_assert_eq!(orders, queued);
        prop_assert!(!DemandScheduler::needs_supply(store.get(miner).unwrap(), false));
        prop_assert!(!DemandScheduler::needs_supply(store.get(miner).unwrap(), true));
    }

    #[test]
    fn prop_money_is_conserved(
        seed in arb_seed(),
        placements in proptest::collection::vec(arb_placement(), 0..5),
    ) {
        let mut sim = Simulation::from_seed(&seed);
        let start = sim.money();
        let mut spent = 0u32;
        for (i, candidate) in placements.iter().enumerate() {
            if sim.place(candidate).is_ok() {
                spent += sim.config().types.get(candidate.kind).cost;
            }
            for _ in 0..(50 * (i + 1)) {
                sim.tick_wrap(STEP_MS);
            }
        }
        prop_assert_eq!(
            u64::from(sim.money()),
            u64::from(start - spent) + sim.value_mined()
        );
        prop_assert!(sim.value_mined() <= sim.total_value());
    }

    #[test]
    fn prop_at_most_one_packet_per_target(
        seed in arb_seed(),
        placements in proptest::collection::vec(arb_placement(), 1..5),
    ) {
        let mut sim = Simulation::from_seed(&seed);
        for candidate in &placements {
            let _ = sim.place(candidate);
        }
        for _ in 0..300 {
            sim.tick_wrap(STEP_MS);
            let mut targets: Vec<EntityId> = sim.packets().iter().map(|p| p.target).collect();
            let total = targets.len();
            targets.sort_unstable();
            targets.dedup();
            prop_assert_eq!(targets.len(), total);
            for target in targets {
                prop_assert!(sim.entity(target).unwrap().supply_enroute);
            }
        }
    }

    #[test]
    fn prop_supply_in_system_is_bounded_by_producer_caps(
        seed in arb_seed(),
        placements in proptest::collection::vec(arb_placement(), 1..6),
    ) {
        let mut sim = Simulation::from_seed(&seed);
        for candidate in &placements {
            let _ = sim.place(candidate);
        }

        // The periodic top-up refills producers while earlier packets may
        // still be in flight; those packets are carried until delivered.
        let mut carried = 0usize;
        let mut in_flight = sim.packets().len();
        for _ in 0..1_500 {
            let events = sim.tick_wrap(STEP_MS);
            if !events.periodic_passes.is_empty() {
                carried = in_flight;
            }
            in_flight = sim.packets().len();

            let unit = u64::from(Supply::units(1).raw());
            let mut stock = 0u64;
            let mut caps = 0u64;
            for entity in sim.entities().iter().filter(|e| e.is_supply_source()) {
                prop_assert!(entity.supply <= entity.supply_max);
                stock += u64::from(entity.supply.raw());
                caps += u64::from(entity.supply_max.raw());
            }
            prop_assert!(
                stock + in_flight as u64 * unit <= caps + carried as u64 * unit,
                "stock {} + in flight {} exceeds caps {} + carried {}",
                stock, in_flight, caps, carried
            );
        }
    }
}
