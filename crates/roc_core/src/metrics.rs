//! Mass-balance snapshots sampled after each step.
//!
//! `compute_snapshot` reads the spill and the ledger and returns one row for
//! time-series output. No state mutation; the CSV helpers write to any `Write`.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{MassBalance, Spill, BOOMED, BURNED, CHEM_DISPERSED, SKIMMED};

/// Bump when fields are added, removed or reordered.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MassBalanceSnapshot {
    pub step: u64,
    pub snapshot_version: u32,
    pub model_time: NaiveDateTime,

    pub element_count: u64,
    pub floating_kg: f64,

    // Removal categories
    pub burned_kg: f64,
    pub boomed_kg: f64,
    pub skimmed_kg: f64,
    pub chem_dispersed_kg: f64,
    pub total_removed_kg: f64,
}

pub fn compute_snapshot(
    step: u64,
    model_time: NaiveDateTime,
    spill: &Spill,
    ledger: &MassBalance,
) -> MassBalanceSnapshot {
    MassBalanceSnapshot {
        step,
        snapshot_version: SNAPSHOT_VERSION,
        model_time,
        element_count: spill.element_count() as u64,
        floating_kg: spill.total_mass(),
        burned_kg: ledger.mass(BURNED),
        boomed_kg: ledger.mass(BOOMED),
        skimmed_kg: ledger.mass(SKIMMED),
        chem_dispersed_kg: ledger.mass(CHEM_DISPERSED),
        total_removed_kg: ledger.total_removed(),
    }
}

/// Write the CSV header row for snapshots.
pub fn write_snapshot_header(writer: &mut impl std::io::Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "step,snapshot_version,model_time,\
         element_count,floating_kg,\
         burned_kg,boomed_kg,skimmed_kg,chem_dispersed_kg,total_removed_kg"
    )
}

/// Append a single snapshot as a CSV row.
pub fn append_snapshot_row(
    writer: &mut impl std::io::Write,
    snapshot: &MassBalanceSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{},{}",
        snapshot.step,
        snapshot.snapshot_version,
        snapshot.model_time.format("%Y-%m-%dT%H:%M:%S"),
        snapshot.element_count,
        snapshot.floating_kg,
        snapshot.burned_kg,
        snapshot.boomed_kg,
        snapshot.skimmed_kg,
        snapshot.chem_dispersed_kg,
        snapshot.total_removed_kg,
    )
}
