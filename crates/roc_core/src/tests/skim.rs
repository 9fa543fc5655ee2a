use super::*;
use crate::test_fixtures::skim_config;
use crate::units::{GAL_PER_BBL, M3_PER_BBL, M3_PER_GAL};

fn skim_ops(cfg: &SkimConfig) -> Vec<ResponseOperation> {
    vec![ResponseOperation::Skim(
        Skim::new(op_id("skim_0001"), cfg).unwrap(),
    )]
}

/// Retained fluid rate (gpm) of `skim_config()` on `reference_spill()`.
fn reference_retained_gpm() -> f64 {
    let thickness_in = 0.005 * units::INCHES_PER_METER;
    let encounter = thickness_in * 0.75 * 40.0 * 63.13;
    let total_fluid = encounter * 0.75 / 0.8;
    let free_water = 0.2 * total_fluid;
    encounter * 0.75 + free_water * 0.5
}

/// Same 5 mm slick as `reference_spill()` but ten times the oil, so long
/// skimming runs never exhaust it.
fn large_spill() -> Spill {
    let emulsion_m3 = 10_000.0 / 900.0 / 0.8;
    uniform_spill(100, 10_000.0, emulsion_m3 / 0.005, 0.2)
}

fn record(ledger: &MassBalance) -> &SkimRecord {
    ledger.skim_record(&op_id("skim_0001")).unwrap()
}

#[test]
fn storage_fills_then_heads_for_offload() {
    let mut ops = skim_ops(&skim_config());
    let mut spill = reference_spill();
    let mut ledger = MassBalance::new();
    prepare_run(&mut ops, &mut ledger);

    let steps = step(&mut ops, &mut spill, &mut ledger, 5400.0, start_time());
    let skim = as_skim(&ops[0]);

    assert!(matches!(skim.phase(), SkimPhase::Transiting { .. }));
    assert!(skim.storage_remaining().abs() < 1e-12);

    let fill_s = 500.0 * GAL_PER_BBL / reference_retained_gpm() * 60.0;
    assert!((seconds_in(&steps[0].trace, "collecting") - fill_s).abs() < 1e-6);
    assert!((seconds_in(&steps[0].trace, "transiting") - (5400.0 - fill_s)).abs() < 1e-6);

    let rec = record(&ledger);
    assert!(relative_eq(rec.fluid_collected, 500.0 * M3_PER_BBL, 1e-9));
    assert!(rec.storage_remaining.abs() < 1e-12);
    assert!(relative_eq(
        rec.fluid_collected,
        rec.emulsion_collected + rec.water_retained,
        1e-9
    ));
    assert!(relative_eq(
        rec.water_collected,
        rec.water_decanted + rec.water_retained,
        1e-9
    ));
    assert!(relative_eq(ledger.mass(SKIMMED), rec.oil_collected * 900.0, 1e-9));
    assert!(relative_eq(
        spill.total_mass(),
        100_000.0 - ledger.mass(SKIMMED),
        1e-9
    ));
}

#[test]
fn offload_cycle_returns_to_collecting() {
    let mut ops = skim_ops(&skim_config());
    let mut spill = reference_spill();
    let mut ledger = MassBalance::new();
    prepare_run(&mut ops, &mut ledger);

    // Fill 66.8 min, tow 60, offload 30, tow 60, then 23 min of skimming.
    let steps = step(&mut ops, &mut spill, &mut ledger, 14_400.0, start_time());
    let skim = as_skim(&ops[0]);

    assert_eq!(skim.phase(), SkimPhase::Collecting);
    assert_eq!(skim.offloads_completed(), 1);
    assert!(skim.storage_remaining() > 0.0 && skim.storage_remaining() < skim.storage());

    let trace = &steps[0].trace;
    assert!((seconds_in(trace, "transiting") - 7200.0).abs() < 1e-6);
    assert!((seconds_in(trace, "offloading") - 1800.0).abs() < 1e-6);
    assert!((seconds_in(trace, "collecting") - 5400.0).abs() < 1e-6);
    assert!((traced_seconds(trace) - 14_400.0).abs() < 1e-9);
}

#[test]
fn barge_alongside_keeps_skimmer_on_scene() {
    let mut cfg = skim_config();
    cfg.barge_arrival = Some(start_time());
    let mut ops = skim_ops(&cfg);
    let mut spill = large_spill();
    let mut ledger = MassBalance::new();
    prepare_run(&mut ops, &mut ledger);

    let steps = step(&mut ops, &mut spill, &mut ledger, 10_800.0, start_time());
    let skim = as_skim(&ops[0]);

    assert_eq!(skim.phase(), SkimPhase::Collecting);
    assert_eq!(skim.offloads_completed(), 2);
    assert!((seconds_in(&steps[0].trace, "collecting") - 10_800.0).abs() < 1e-6);
    assert!(relative_eq(
        record(&ledger).fluid_collected,
        reference_retained_gpm() * 180.0 * M3_PER_GAL,
        1e-9
    ));
}

#[test]
fn barge_not_yet_arrived_means_transit() {
    let mut cfg = skim_config();
    cfg.barge_arrival = Some(start_time() + chrono::Duration::hours(6));
    let mut ops = skim_ops(&cfg);
    let mut spill = reference_spill();
    let mut ledger = MassBalance::new();
    prepare_run(&mut ops, &mut ledger);

    step(&mut ops, &mut spill, &mut ledger, 5400.0, start_time());
    assert!(matches!(
        as_skim(&ops[0]).phase(),
        SkimPhase::Transiting { .. }
    ));
}

#[test]
fn small_decant_pump_retains_overflow() {
    let mut cfg = skim_config();
    cfg.decant_pump = 10.0;
    let mut ops = skim_ops(&cfg);
    let mut spill = reference_spill();
    let mut ledger = MassBalance::new();
    prepare_run(&mut ops, &mut ledger);
    step(&mut ops, &mut spill, &mut ledger, 600.0, start_time());

    let reports = ledger.reports(&op_id("skim_0001"));
    assert_eq!(reports.len(), 1);
    let PhysicalImplausibility::DecantPumpLimited {
        decant_gpm,
        pump_gpm,
    } = reports[0]
    else {
        panic!("expected a decant pump report, got {:?}", reports[0]);
    };
    assert!(decant_gpm > pump_gpm);
    assert!((pump_gpm - 10.0).abs() < 1e-12);

    let rec = record(&ledger);
    assert!(rec.water_retained > rec.water_decanted);
    assert!(relative_eq(
        rec.water_collected,
        rec.water_decanted + rec.water_retained,
        1e-9
    ));
}

#[test]
fn wide_swath_is_bounded_by_nameplate_pump() {
    let mut cfg = skim_config();
    cfg.swath_width = 100.0;
    cfg.storage = 1000.0;
    let mut ops = skim_ops(&cfg);
    let mut spill = reference_spill();
    let mut ledger = MassBalance::new();
    prepare_run(&mut ops, &mut ledger);
    step(&mut ops, &mut spill, &mut ledger, 3600.0, start_time());

    // 400 gpm total: 320 emulsion, 80 free water, half of it retained.
    let skim = as_skim(&ops[0]);
    assert!(relative_eq(skim.fluid_collected_this_step(), 360.0 * 60.0, 1e-9));
    assert_eq!(skim.phase(), SkimPhase::Collecting);
    assert!(ledger.reports(&op_id("skim_0001")).is_empty());
}

#[test]
fn closed_window_skims_nothing() {
    let mut cfg = skim_config();
    cfg.window = vec![Interval::new(
        start_time() + chrono::Duration::hours(2),
        start_time() + chrono::Duration::hours(4),
    )];
    let mut ops = skim_ops(&cfg);
    let mut spill = reference_spill();
    let mut ledger = MassBalance::new();
    prepare_run(&mut ops, &mut ledger);

    let steps = step(&mut ops, &mut spill, &mut ledger, 3600.0, start_time());
    assert!(!steps[0].active);
    assert!(ledger.mass(SKIMMED).abs() < 1e-12);
    assert!(record(&ledger).fluid_collected.abs() < 1e-12);
    assert!(relative_eq(
        record(&ledger).storage_remaining,
        500.0 * M3_PER_BBL,
        1e-12
    ));

    let later = start_time() + chrono::Duration::hours(2);
    let steps = step(&mut ops, &mut spill, &mut ledger, 3600.0, later);
    assert!(steps[0].active);
    assert!(ledger.mass(SKIMMED) > 0.0);
}

#[test]
fn record_only_counts_oil_left_by_earlier_operations() {
    let mut ops = all_operations();
    let mut spill = uniform_spill(20, 50.0, 50.0 / 900.0 / 0.8 / 0.005, 0.2);
    let mut ledger = MassBalance::new();
    prepare_run(&mut ops, &mut ledger);

    run_steps(&mut ops, &mut spill, &mut ledger, 3600.0, 24, start_time());

    let rec = ledger.skim_record(&op_id("skim")).unwrap();
    assert!(relative_eq(
        rec.oil_collected * 900.0,
        ledger.mass(SKIMMED),
        1e-9
    ));
    assert!(relative_eq(
        rec.fluid_collected,
        rec.emulsion_collected + rec.water_retained,
        1e-9
    ));
}

#[test]
fn rate_advisories_wait_until_the_skimmer_collects() {
    let mut cfg = skim_config();
    cfg.swath_width = 2000.0;
    cfg.storage = 1.0;
    cfg.transit_time = 7200.0;
    let thick = || {
        let emulsion_m3 = 1000.0 / 900.0 / 0.8;
        uniform_spill(100, 1000.0, emulsion_m3 / 0.05, 0.2)
    };
    let mut ops = skim_ops(&cfg);
    let mut ledger = MassBalance::new();
    prepare_run(&mut ops, &mut ledger);

    // On a 50 mm slick the nameplate pump caps the swath well below 1000 ft.
    let mut spill = thick();
    step(&mut ops, &mut spill, &mut ledger, 3600.0, start_time());
    assert!(matches!(as_skim(&ops[0]).phase(), SkimPhase::Transiting { .. }));
    assert!(ledger.reports(&op_id("skim_0001")).is_empty());

    // The thin slick would allow the full 2000 ft, but the skimmer is away.
    let mut thin = thin_spill();
    let later = start_time() + chrono::Duration::hours(1);
    let steps = step(&mut ops, &mut thin, &mut ledger, 3600.0, later);
    assert!((seconds_in(&steps[0].trace, "transiting") - 3600.0).abs() < 1e-6);
    assert!(ledger.reports(&op_id("skim_0001")).is_empty());

    let mut fresh = skim_ops(&cfg);
    let mut fresh_ledger = MassBalance::new();
    prepare_run(&mut fresh, &mut fresh_ledger);
    let mut thin = thin_spill();
    step(&mut fresh, &mut thin, &mut fresh_ledger, 3600.0, start_time());
    assert!(matches!(
        fresh_ledger.reports(&op_id("skim_0001")),
        [PhysicalImplausibility::OversizedSwath { .. }]
    ));
}
