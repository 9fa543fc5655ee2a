//! Response operations and the stepping contract they share.
//!
//! Each operation is driven by the host in two calls per step:
//! `prepare_for_model_step` runs the phase loop against the step's time budget
//! and records what the operation will take out of the water;
//! `weather_elements` removes that mass from the spill and books it in the
//! ledger.

mod burn;
mod disperse;
mod skim;

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use burn::{Burn, BurnConfig, BurnPhase, TransitLeg};
pub use disperse::{Disperse, DisperseConfig};
pub use skim::{Skim, SkimConfig, SkimPhase};

use crate::report::Advisories;
use crate::units::{convert, Quantity};
use crate::{
    generate_operation_id, ActivityWindow, ConfigError, Interval, MassBalance, OperationId,
    PhaseTrace, PlatformCatalog, Spill, UnitError,
};

/// Field name → unit the configured value is expressed in.
pub type UnitAssignments = BTreeMap<String, String>;

pub trait Weatherer {
    fn id(&self) -> &OperationId;

    /// Whether the latest `prepare_for_model_step` found the operation active.
    fn is_active(&self) -> bool;

    /// Label of the phase the operation is currently in.
    fn phase_label(&self) -> &'static str;

    /// How the latest active step's time was split across phases.
    fn last_step_trace(&self) -> &PhaseTrace;

    /// Reset run state and register ledger keys. Safe to call more than once.
    fn prepare_for_model_run(&mut self, ledger: &mut MassBalance);

    fn prepare_for_model_step(&mut self, spill: &Spill, time_step: f64, model_time: NaiveDateTime);

    fn weather_elements(
        &mut self,
        spill: &mut Spill,
        ledger: &mut MassBalance,
        time_step: f64,
        model_time: NaiveDateTime,
    );
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn default_on() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationConfig {
    Burn(BurnConfig),
    Skim(SkimConfig),
    Disperse(DisperseConfig),
}

impl OperationConfig {
    pub fn id(&self) -> Option<&OperationId> {
        match self {
            OperationConfig::Burn(cfg) => cfg.id.as_ref(),
            OperationConfig::Skim(cfg) => cfg.id.as_ref(),
            OperationConfig::Disperse(cfg) => cfg.id.as_ref(),
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            OperationConfig::Burn(_) => "burn",
            OperationConfig::Skim(_) => "skim",
            OperationConfig::Disperse(_) => "disperse",
        }
    }

    /// Construct the operation. A missing id is generated from `rng`.
    pub fn build(
        &self,
        catalog: &PlatformCatalog,
        rng: &mut impl Rng,
    ) -> Result<ResponseOperation, ConfigError> {
        let id = self
            .id()
            .cloned()
            .unwrap_or_else(|| generate_operation_id(self.id_prefix(), rng));
        Ok(match self {
            OperationConfig::Burn(cfg) => ResponseOperation::Burn(Burn::new(id, cfg)?),
            OperationConfig::Skim(cfg) => ResponseOperation::Skim(Skim::new(id, cfg)?),
            OperationConfig::Disperse(cfg) => {
                ResponseOperation::Disperse(Box::new(Disperse::new(id, cfg, catalog)?))
            }
        })
    }
}

#[derive(Debug, Clone)]
pub enum ResponseOperation {
    Burn(Burn),
    Skim(Skim),
    Disperse(Box<Disperse>),
}

impl ResponseOperation {
    fn as_weatherer(&self) -> &dyn Weatherer {
        match self {
            ResponseOperation::Burn(op) => op,
            ResponseOperation::Skim(op) => op,
            ResponseOperation::Disperse(op) => op.as_ref(),
        }
    }

    fn as_weatherer_mut(&mut self) -> &mut dyn Weatherer {
        match self {
            ResponseOperation::Burn(op) => op,
            ResponseOperation::Skim(op) => op,
            ResponseOperation::Disperse(op) => op.as_mut(),
        }
    }
}

impl Weatherer for ResponseOperation {
    fn id(&self) -> &OperationId {
        self.as_weatherer().id()
    }

    fn is_active(&self) -> bool {
        self.as_weatherer().is_active()
    }

    fn phase_label(&self) -> &'static str {
        self.as_weatherer().phase_label()
    }

    fn last_step_trace(&self) -> &PhaseTrace {
        self.as_weatherer().last_step_trace()
    }

    fn prepare_for_model_run(&mut self, ledger: &mut MassBalance) {
        self.as_weatherer_mut().prepare_for_model_run(ledger);
    }

    fn prepare_for_model_step(&mut self, spill: &Spill, time_step: f64, model_time: NaiveDateTime) {
        self.as_weatherer_mut()
            .prepare_for_model_step(spill, time_step, model_time);
    }

    fn weather_elements(
        &mut self,
        spill: &mut Spill,
        ledger: &mut MassBalance,
        time_step: f64,
        model_time: NaiveDateTime,
    ) {
        self.as_weatherer_mut()
            .weather_elements(spill, ledger, time_step, model_time);
    }
}

// ---------------------------------------------------------------------------
// Shared operation state
// ---------------------------------------------------------------------------

/// Identity, gating and per-step bookkeeping common to every operation.
#[derive(Debug, Clone)]
pub(crate) struct Schedule {
    pub(crate) id: OperationId,
    pub(crate) on: bool,
    pub(crate) window: ActivityWindow,
    pub(crate) active: bool,
    pub(crate) trace: PhaseTrace,
    pub(crate) advisories: Advisories,
}

impl Schedule {
    pub(crate) fn new(id: OperationId, on: bool, window: &[Interval]) -> Result<Self, ConfigError> {
        Ok(Self {
            id,
            on,
            window: ActivityWindow::new(window.iter().copied())?,
            active: false,
            trace: PhaseTrace::new(),
            advisories: Advisories::default(),
        })
    }

    pub(crate) fn begin_run(&mut self) {
        self.active = false;
        self.trace.clear();
        self.advisories.reset();
    }

    /// Gate the step on the on flag and the activity window.
    pub(crate) fn begin_step(&mut self, time_step: f64, model_time: NaiveDateTime) -> bool {
        self.active = self.on && self.window.is_active(model_time, time_step);
        if self.active {
            self.trace.clear();
        }
        self.active
    }
}

// ---------------------------------------------------------------------------
// Unit-bearing fields
// ---------------------------------------------------------------------------

/// A configuration field that carries a unit, and the unit the operation
/// works in internally.
pub(crate) struct UnitField {
    pub(crate) name: &'static str,
    pub(crate) quantity: Quantity,
    pub(crate) working: &'static str,
}

/// Validated unit assignments for one operation's declared fields.
pub(crate) struct WorkingUnits<'a> {
    fields: &'static [UnitField],
    assigned: &'a UnitAssignments,
}

impl<'a> WorkingUnits<'a> {
    pub(crate) fn new(
        fields: &'static [UnitField],
        assigned: &'a UnitAssignments,
    ) -> Result<Self, ConfigError> {
        for (field, unit) in assigned {
            let declared = fields
                .iter()
                .find(|declared| declared.name == field)
                .ok_or_else(|| ConfigError::UnitlessField {
                    field: field.clone(),
                })?;
            if !declared.quantity.accepts(unit) {
                return Err(ConfigError::Unit {
                    field: field.clone(),
                    source: UnitError::UnknownUnit {
                        unit: unit.clone(),
                        quantity: declared.quantity,
                    },
                });
            }
        }
        Ok(Self { fields, assigned })
    }

    /// Convert a configured value into the field's working unit. Fields with
    /// no assignment are taken to be in the working unit already.
    pub(crate) fn to_working(&self, field: &'static str, value: f64) -> Result<f64, ConfigError> {
        let Some(unit) = self.assigned.get(field) else {
            return Ok(value);
        };
        let Some(declared) = self.fields.iter().find(|declared| declared.name == field) else {
            return Err(ConfigError::UnitlessField {
                field: field.to_string(),
            });
        };
        convert(declared.quantity, unit, declared.working, value).map_err(|source| {
            ConfigError::Unit {
                field: field.to_string(),
                source,
            }
        })
    }
}

/// Efficiencies and fractions must lie in [0, 1].
pub(crate) fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}

pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: f64::INFINITY,
        })
    }
}

/// Values used as divisors must be strictly positive.
pub(crate) fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}
