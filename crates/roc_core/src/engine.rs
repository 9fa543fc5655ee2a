use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{MassBalance, OperationId, PhaseTrace, ResponseOperation, Spill, Weatherer};

/// What one operation did during a step.
#[derive(Debug, Clone, Serialize)]
pub struct OperationStep {
    pub id: OperationId,
    pub active: bool,
    /// Phase the operation ended the step in.
    pub phase: &'static str,
    pub trace: PhaseTrace,
}

/// Reset every operation and register its ledger keys.
pub fn prepare_run(operations: &mut [ResponseOperation], ledger: &mut MassBalance) {
    for operation in operations.iter_mut() {
        operation.prepare_for_model_run(ledger);
    }
    tracing::info!(operations = operations.len(), "response run prepared");
}

/// Advance all operations by one model step.
///
/// Order of operations:
/// 1. Every operation plans its step against the spill as it stood at the
///    start of the step.
/// 2. Every operation removes its share from the spill and books it.
///
/// Returns a per-operation summary in input order.
pub fn step(
    operations: &mut [ResponseOperation],
    spill: &mut Spill,
    ledger: &mut MassBalance,
    time_step: f64,
    model_time: NaiveDateTime,
) -> Vec<OperationStep> {
    for operation in operations.iter_mut() {
        operation.prepare_for_model_step(spill, time_step, model_time);
    }
    for operation in operations.iter_mut() {
        operation.weather_elements(spill, ledger, time_step, model_time);
    }

    operations
        .iter()
        .map(|operation| OperationStep {
            id: operation.id().clone(),
            active: operation.is_active(),
            phase: operation.phase_label(),
            trace: if operation.is_active() {
                operation.last_step_trace().clone()
            } else {
                PhaseTrace::new()
            },
        })
        .collect()
}
