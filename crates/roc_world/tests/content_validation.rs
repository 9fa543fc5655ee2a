//! Validation tests for the shipped `content/` catalog and `scenarios/` files.
//!
//! These load the real JSON files and check that:
//! 1. every file deserializes and passes loader validation
//! 2. every catalog platform builds a lifecycle and stays in sensible ranges
//! 3. the example scenario builds and runs with a balanced ledger

use roc_core::{
    prepare_run, step, MassBalance, Platform, PlatformCatalog, PlatformKind, Sortie, Weatherer,
};
use roc_world::{build_operations, build_spill, load_catalog, load_scenario, scenario_rng};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Integration tests run from the crate directory, so go up two levels.
fn workspace_path(relative: &str) -> PathBuf {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    PathBuf::from(manifest).join("../..").join(relative)
}

fn catalog() -> &'static PlatformCatalog {
    static CATALOG: OnceLock<PlatformCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let dir = workspace_path("content");
        load_catalog(dir.to_str().unwrap()).expect("shipped catalog should load")
    })
}

// =========================================================================
// 1. Catalog
// =========================================================================

#[test]
fn catalog_has_both_platform_kinds() {
    let catalog = catalog();
    assert!(!catalog.vessel.is_empty());
    assert!(!catalog.aircraft.is_empty());
    assert!(catalog.vessel.iter().all(|p| p.kind == PlatformKind::Vessel));
    assert!(catalog.aircraft.iter().all(|p| p.kind == PlatformKind::Aircraft));
}

#[test]
fn every_platform_builds_a_lifecycle() {
    for params in catalog().iter() {
        let sortie = Sortie {
            transit_nm: 10.0,
            cascade_nm: 0.0,
            pump_rate_gpm: params.release_rate(5.0).min(params.pump_rate_max),
            loading: roc_core::LoadingType::Sequential,
        };
        let result = Platform::new(params.clone(), sortie);
        assert!(result.is_ok(), "platform '{}': {:?}", params.name, result.err());
    }
}

#[test]
fn dosage_ranges_are_ordered() {
    for params in catalog().iter() {
        assert!(
            params.min_dosage() <= params.max_dosage(),
            "platform '{}' has min dosage {} above max {}",
            params.name,
            params.min_dosage(),
            params.max_dosage()
        );
        assert!(
            params.pump_rate_min <= params.pump_rate_max,
            "platform '{}' pump range is inverted",
            params.name
        );
    }
}

#[test]
fn optional_ranges_bracket_nominal_values() {
    for params in catalog().iter() {
        if let (Some(min), Some(max)) = (params.swath_width_min, params.swath_width_max) {
            assert!(
                min <= params.swath_width && params.swath_width <= max,
                "platform '{}' swath {} outside [{min}, {max}]",
                params.name,
                params.swath_width
            );
        }
        if let (Some(min), Some(max)) = (params.application_speed_min, params.application_speed_max)
        {
            assert!(
                min <= params.application_speed && params.application_speed <= max,
                "platform '{}' application speed {} outside [{min}, {max}]",
                params.name,
                params.application_speed
            );
        }
    }
}

#[test]
fn vessels_can_reach_a_nearby_slick() {
    for params in &catalog().vessel {
        assert!(
            params.max_onsite_time_s(25.0) > 0.0,
            "vessel '{}' cannot work a slick 25 nm out",
            params.name
        );
    }
}

// =========================================================================
// 2. Example scenario
// =========================================================================

#[test]
fn example_scenario_builds_and_runs() {
    let scenario = load_scenario(&workspace_path("scenarios/example.json"))
        .expect("example scenario should load");
    let (seed, mut rng) = scenario_rng(&scenario, None);
    assert_eq!(seed, 42);

    let mut spill = build_spill(&scenario, &mut rng);
    let initial = spill.total_mass();
    assert!((initial - scenario.spill.total_mass_kg).abs() < 1e-6 * initial);

    let mut operations = build_operations(&scenario, catalog(), &mut rng)
        .expect("example operations should build");
    assert_eq!(operations.len(), scenario.operations.len());

    let mut ledger = MassBalance::new();
    prepare_run(&mut operations, &mut ledger);
    for operation in &operations {
        assert!(
            ledger.reports(operation.id()).is_empty(),
            "operation '{}' reported {:?} before the run",
            operation.id(),
            ledger.reports(operation.id())
        );
    }

    #[allow(clippy::cast_possible_truncation)]
    let step_ms = (scenario.time_step_s * 1000.0).round() as i64;
    let mut model_time = scenario.start_time;
    for _ in 0..scenario.steps {
        step(
            &mut operations,
            &mut spill,
            &mut ledger,
            scenario.time_step_s,
            model_time,
        );
        model_time += chrono::Duration::milliseconds(step_ms);
    }

    assert!(ledger.total_removed() > 0.0);
    assert!(
        (spill.total_mass() + ledger.total_removed() - initial).abs() < 1e-6 * initial,
        "mass balance drifted"
    );
}
