//! Shared test fixtures for roc_core and downstream crates.
//!
//! `reference_spill()` is a uniform 100 t slick, 5 mm of emulsion at 20% water.
//! The operation configs are sized against it so a one-hour step crosses at
//! least one phase boundary.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    BurnConfig, DisperseConfig, Interval, LoadingType, PlatformCatalog, PlatformKind,
    PlatformParams, PlatformSpec, SkimConfig, Spill, Substance, SubstanceBatch, UnitAssignments,
};

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 6, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid fixture date")
}

/// A window wide enough to cover any test run.
pub fn all_day() -> Vec<Interval> {
    vec![Interval::new(
        start_time() - Duration::days(1),
        start_time() + Duration::days(30),
    )]
}

pub fn test_substance() -> Substance {
    Substance {
        name: "test crude".to_string(),
        density_kg_per_m3: 900.0,
    }
}

/// One batch of identical elements; each element's mass is split 30/70 over
/// two components.
pub fn uniform_spill(
    elements: usize,
    mass_per_element: f64,
    area_per_element: f64,
    frac_water: f64,
) -> Spill {
    Spill {
        batches: vec![SubstanceBatch {
            substance: test_substance(),
            mass: vec![mass_per_element; elements],
            mass_components: vec![vec![0.3 * mass_per_element, 0.7 * mass_per_element]; elements],
            area: vec![area_per_element; elements],
            frac_water: vec![frac_water; elements],
        }],
    }
}

/// 100 elements of 1000 kg, 5 mm emulsion thickness, 20% water.
pub fn reference_spill() -> Spill {
    let emulsion_m3 = 1000.0 / 900.0 / 0.8;
    uniform_spill(100, 1000.0, emulsion_m3 / 0.005, 0.2)
}

pub fn test_vessel() -> PlatformParams {
    PlatformParams {
        name: "Test Vessel".to_string(),
        kind: PlatformKind::Vessel,
        transit_speed: 10.0,
        application_speed: 5.0,
        cascade_transit_speed_with_payload: 10.0,
        cascade_transit_speed_without_payload: 10.0,
        max_range_with_payload: 500.0,
        max_range_no_payload: 500.0,
        taxi_land_depart: 0.0,
        taxi_time_takeoff: 0.0,
        taxi_time_landing: 0.0,
        fuel_load: 30.0,
        dispersant_load: 60.0,
        u_turn_time: 5.0,
        max_op_time: 12.0,
        payload: 2000.0,
        pump_rate_max: 100.0,
        pump_rate_min: 10.0,
        swath_width: 100.0,
        swath_width_min: None,
        swath_width_max: None,
        application_speed_min: None,
        application_speed_max: None,
        transitions: None,
    }
}

pub fn test_aircraft() -> PlatformParams {
    PlatformParams {
        name: "Test Aircraft".to_string(),
        kind: PlatformKind::Aircraft,
        transit_speed: 200.0,
        application_speed: 150.0,
        cascade_transit_speed_with_payload: 180.0,
        cascade_transit_speed_without_payload: 200.0,
        max_range_with_payload: 800.0,
        max_range_no_payload: 1000.0,
        taxi_land_depart: 15.0,
        taxi_time_takeoff: 10.0,
        taxi_time_landing: 10.0,
        fuel_load: 30.0,
        dispersant_load: 30.0,
        u_turn_time: 2.0,
        max_op_time: 4.0,
        payload: 3000.0,
        pump_rate_max: 500.0,
        pump_rate_min: 50.0,
        swath_width: 150.0,
        swath_width_min: None,
        swath_width_max: None,
        application_speed_min: None,
        application_speed_max: None,
        transitions: None,
    }
}

pub fn test_catalog() -> PlatformCatalog {
    PlatformCatalog {
        vessel: vec![test_vessel()],
        aircraft: vec![test_aircraft()],
    }
}

/// 300 ft boom, 12 in draft, towed at 0.75 kts. Fills in about 29 min on
/// `reference_spill()` and takes about 39.5 min to reach the burn position.
pub fn burn_config() -> BurnConfig {
    BurnConfig {
        id: None,
        on: true,
        window: all_day(),
        units: UnitAssignments::new(),
        offset: 3000.0,
        boom_length: 300.0,
        boom_draft: 12.0,
        speed: 0.75,
        throughput: 0.25,
    }
}

/// 500 bbl skimmer; fills in about 67 min on `reference_spill()`.
pub fn skim_config() -> SkimConfig {
    SkimConfig {
        id: None,
        on: true,
        window: all_day(),
        units: UnitAssignments::new(),
        speed: 0.75,
        storage: 500.0,
        swath_width: 40.0,
        throughput: 0.75,
        nameplate_pump: 400.0,
        recovery_efficiency: 0.8,
        decant: 0.5,
        decant_pump: 100.0,
        rig_time: 0.0,
        transit_time: 3600.0,
        offload: 1800.0,
        barge_arrival: None,
    }
}

/// Test Vessel at 5 gal/acre, 20 nm from the slick, starting en route.
pub fn disperse_config() -> DisperseConfig {
    DisperseConfig {
        id: None,
        on: true,
        window: all_day(),
        units: UnitAssignments::new(),
        platform: PlatformSpec::Named("Test Vessel".to_string()),
        transit: 20.0,
        dosage: 5.0,
        cascade_on: false,
        cascade_distance: None,
        loading_type: LoadingType::Sequential,
        efficiency: 1.0,
    }
}
