//! Error types for `roc_core`.
//!
//! Construction-time misconfiguration is a typed error and aborts building the
//! operation. Physically implausible but computable situations found while
//! stepping are `PhysicalImplausibility` values: logged, reported, never returned.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::Quantity;
use crate::PlatformState;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("'{unit}' is not a valid {quantity} unit")]
    UnknownUnit { unit: String, quantity: Quantity },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActivityWindowError {
    #[error("interval {index} starts at {start} which is not before its stop {stop}")]
    InvertedInterval {
        index: usize,
        start: NaiveDateTime,
        stop: NaiveDateTime,
    },

    #[error("interval {index} repeats the start time {start}")]
    DuplicateStart { index: usize, start: NaiveDateTime },

    #[error("interval {index} starts at {start}, before the previous interval's start")]
    NotAscending { index: usize, start: NaiveDateTime },

    #[error("interval {index} starts at {start}, before the previous interval stops at {previous_stop}")]
    Overlap {
        index: usize,
        start: NaiveDateTime,
        previous_stop: NaiveDateTime,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid activity window: {0}")]
    Window(#[from] ActivityWindowError),

    #[error("invalid unit for '{field}': {source}")]
    Unit {
        field: String,
        #[source]
        source: UnitError,
    },

    #[error("'{field}' does not take a unit assignment")]
    UnitlessField { field: String },

    #[error("'{field}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("'{field}' must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("'{field}' is required when {reason}")]
    MissingField {
        field: &'static str,
        reason: &'static str,
    },

    #[error("platform '{0}' is not in the catalog")]
    UnknownPlatform(String),

    #[error("platform '{platform}': transition table is incomplete at '{state}'")]
    IncompleteTransitionTable {
        platform: String,
        state: PlatformState,
    },
}

/// Implausible operating conditions. The run continues with the computed value.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhysicalImplausibility {
    #[error("swath of {swath_ft:.0} ft may not be achievable in the field")]
    OversizedSwath { swath_ft: f64 },

    #[error("excessive entrainment of oil likely at {speed_kts:.2} kts")]
    ExcessiveSpeed { speed_kts: f64 },

    #[error("maximum on-site time is negative ({onsite_h:.2} h){}", spray_note(.spray_h))]
    NegativeOnsiteTime {
        onsite_h: f64,
        /// Hours needed to spray the payload on board; zero when there is none.
        spray_h: f64,
    },

    #[error("burn rate is zero at {water_pct:.0}% water; the boom cannot burn")]
    NoBurnRate { water_pct: f64 },

    #[error(
        "total fluid recovery rate {fluid_gpm:.1} gpm exceeds nameplate pump {nameplate_gpm:.1} gpm; \
         throughput efficiency reduced to {throughput:.3}"
    )]
    NameplatePumpLimited {
        fluid_gpm: f64,
        nameplate_gpm: f64,
        throughput: f64,
    },

    #[error("decant rate {decant_gpm:.1} gpm exceeds decant pump {pump_gpm:.1} gpm; excess is retained")]
    DecantPumpLimited { decant_gpm: f64, pump_gpm: f64 },

    #[error("dosage {dosage:.2} gal/acre outside platform range [{min:.2}, {max:.2}]")]
    DosageOutOfRange { dosage: f64, min: f64, max: f64 },

    #[error("desired pump rate {desired_gpm:.1} gpm exceeds platform maximum {max_gpm:.1} gpm")]
    PumpRateLimited { desired_gpm: f64, max_gpm: f64 },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn spray_note(spray_h: &f64) -> String {
    if *spray_h > 0.0 {
        format!("; too short to spray the payload ({spray_h:.2} h needed)")
    } else {
        String::new()
    }
}
