use super::*;
use crate::test_fixtures::{
    burn_config, disperse_config, reference_spill, skim_config, start_time, test_catalog,
    uniform_spill,
};
use chrono::{Duration, NaiveDateTime};

mod skim;

// --- Shared test helpers ------------------------------------------------

fn op_id(name: &str) -> OperationId {
    OperationId(name.to_string())
}

fn seconds(s: f64) -> Duration {
    #[allow(clippy::cast_possible_truncation)]
    Duration::milliseconds((s * 1000.0).round() as i64)
}

/// Run `steps` steps of `time_step` seconds from `start`. Returns the time
/// after the last step.
fn run_steps(
    operations: &mut [ResponseOperation],
    spill: &mut Spill,
    ledger: &mut MassBalance,
    time_step: f64,
    steps: usize,
    start: NaiveDateTime,
) -> NaiveDateTime {
    let mut model_time = start;
    for _ in 0..steps {
        step(operations, spill, ledger, time_step, model_time);
        model_time += seconds(time_step);
    }
    model_time
}

/// One burn, one skimmer and one dispersant vessel, in that step order.
fn all_operations() -> Vec<ResponseOperation> {
    vec![
        ResponseOperation::Burn(Burn::new(op_id("burn"), &burn_config()).unwrap()),
        ResponseOperation::Skim(Skim::new(op_id("skim"), &skim_config()).unwrap()),
        ResponseOperation::Disperse(Box::new(
            Disperse::new(op_id("disperse"), &disperse_config(), &test_catalog()).unwrap(),
        )),
    ]
}

fn as_burn(operation: &ResponseOperation) -> &Burn {
    match operation {
        ResponseOperation::Burn(burn) => burn,
        other => panic!("expected a burn, got {}", other.id()),
    }
}

fn as_skim(operation: &ResponseOperation) -> &Skim {
    match operation {
        ResponseOperation::Skim(skim) => skim,
        other => panic!("expected a skim, got {}", other.id()),
    }
}

fn as_disperse(operation: &ResponseOperation) -> &Disperse {
    match operation {
        ResponseOperation::Disperse(disperse) => disperse,
        other => panic!("expected a disperse, got {}", other.id()),
    }
}

/// 0.05 mm of emulsion; thin enough that a dispersant sortie treats only part
/// of the slick.
fn thin_spill() -> Spill {
    let emulsion_m3 = 1000.0 / 900.0 / 0.8;
    uniform_spill(100, 1000.0, emulsion_m3 / 0.000_05, 0.2)
}

fn relative_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
}
