//! Scenario file loading and end-to-end runs.

use std::io::Write;
use std::path::PathBuf;

use supply_core::entity::EntityKind;
use supply_headless::{run_scenario, Scenario, ScenarioError, ScenarioRunner};
use supply_test_utils::determinism::verify_determinism;

fn shipped(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios")
        .join(name)
}

#[test]
fn test_shipped_scenarios_load() {
    let outpost = Scenario::load(shipped("outpost.ron")).unwrap();
    assert_eq!(outpost.name, "Outpost");
    assert_eq!(outpost.placements.len(), 6);

    let sparse = Scenario::load(shipped("sparse_field.ron")).unwrap();
    let config = sparse.sim_config().unwrap();
    assert_eq!(config.asteroid_count, 30);
    assert_eq!(config.types.miner.cost, 100);
}

#[test]
fn test_relative_types_path_follows_scenario_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut types = std::fs::File::create(dir.path().join("types.ron")).unwrap();
    let mut table = supply_core::data::EntityTypeTable::standard();
    table.router.cost = 25;
    write!(types, "{}", ron::to_string(&table).unwrap()).unwrap();

    let scenario_path = dir.path().join("cheap.ron");
    std::fs::write(
        &scenario_path,
        r#"Scenario(
            name: "Types",
            seed: "types",
            duration_ms: 1000,
            asteroid_count: Some(5),
            entity_types_path: Some("types.ron"),
            placements: [TimedPlacement(at_ms: 0, kind: Router, x: 360, y: 240)],
        )"#,
    )
    .unwrap();

    let scenario = Scenario::load(&scenario_path).unwrap();
    assert_eq!(scenario.entity_types_path, Some(dir.path().join("types.ron")));
    let report = run_scenario(&scenario).unwrap();
    if report.placements_accepted == 1 {
        assert_eq!(report.money, 475);
    }
}

#[test]
fn test_bad_types_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("types.ron"), "EntityTypeTable(").unwrap();
    let scenario_path = dir.path().join("broken.ron");
    std::fs::write(
        &scenario_path,
        r#"Scenario(name: "B", seed: "b", duration_ms: 10, entity_types_path: Some("types.ron"))"#,
    )
    .unwrap();

    let scenario = Scenario::load(&scenario_path).unwrap();
    assert!(matches!(
        ScenarioRunner::new(&scenario),
        Err(ScenarioError::Types(_))
    ));
}

#[test]
fn test_malformed_scenario_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.ron");
    std::fs::write(&path, "Scenario(name: ").unwrap();
    assert!(matches!(
        Scenario::load(&path),
        Err(ScenarioError::ParseError(_))
    ));
}

#[test]
fn test_frame_runs_are_reproducible() {
    let scenario = Scenario {
        duration_ms: 15_000,
        ..Scenario::outpost()
    };
    let result = verify_determinism(
        3,
        900,
        || ScenarioRunner::new(&scenario).unwrap(),
        |runner| {
            runner.step_frame();
        },
        |runner| runner.simulation().state_hash(),
    );
    result.assert_deterministic();
}

#[test]
fn test_outpost_builds_its_routers() {
    let scenario = Scenario {
        duration_ms: 20_000,
        ..Scenario::outpost()
    };
    let report = run_scenario(&scenario).unwrap();
    assert_eq!(report.placements_accepted + report.placements_rejected, 4);
    assert_eq!(report.constructed, u64::from(report.placements_accepted));
    let spent = report.placements_accepted * 10;
    assert_eq!(u64::from(report.money), u64::from(500 - spent) + report.value_mined);
    assert!(!report.mined.is_empty());
    assert_eq!(
        scenario.placements.iter().filter(|p| p.kind == EntityKind::Router).count(),
        4
    );
}
