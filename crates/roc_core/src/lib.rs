//! `roc_core`: response options for a modeled oil spill.
//!
//! Burn, skim and dispersant operations advanced one model step at a time.
//! No IO, no network. The host owns the run loop, the spill and the ledger,
//! and hands them to each operation explicitly.

mod budget;
mod engine;
mod error;
mod id;
mod ledger;
pub mod metrics;
mod platform;
mod removal;
mod report;
mod response;
mod types;
pub mod units;
mod window;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use budget::{seconds_in, traced_seconds, PhaseSpan, PhaseTrace, TimeBudget};
pub use engine::{prepare_run, step, OperationStep};
pub use error::{ActivityWindowError, ConfigError, PhysicalImplausibility, UnitError};
pub use id::{generate_operation_id, generate_uuid};
pub use ledger::{
    DisperseRecord, LedgerEntry, MassBalance, SkimRecord, BOOMED, BURNED, CHEM_DISPERSED,
    SKIMMED,
};
pub use metrics::{compute_snapshot, MassBalanceSnapshot};
pub use platform::{
    LoadingType, Platform, PlatformCatalog, PlatformKind, PlatformParams, PlatformSpec,
    PlatformState, Sortie, TransitionTable,
};
pub use removal::{remove_from_spill, remove_mass};
pub use response::{
    Burn, BurnConfig, BurnPhase, Disperse, DisperseConfig, OperationConfig, ResponseOperation,
    Skim, SkimConfig, SkimPhase, TransitLeg, UnitAssignments, Weatherer,
};
pub use types::*;
pub use window::{ActivityWindow, Interval};

#[cfg(test)]
mod tests;
