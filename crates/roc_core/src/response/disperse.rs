//! Dispersant application from a vessel or aircraft.
//!
//! The platform lifecycle decides when the platform is spraying; the time it
//! spends in `disperse` during a step sets how much area is treated.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{
    check_fraction, check_non_negative, check_positive, Schedule, UnitField, WorkingUnits,
};
use crate::budget::seconds_in;
use crate::units::{Quantity, FT_KTS_PER_ACRE_MIN, M2_PER_ACRE, M3_PER_GAL};
use crate::{
    remove_from_spill, ConfigError, DisperseRecord, Interval, LedgerEntry, LoadingType,
    MassBalance, OperationId, PhaseTrace, PhysicalImplausibility, Platform, PlatformCatalog,
    PlatformSpec, PlatformState, Sortie, Spill, UnitAssignments, Weatherer, CHEM_DISPERSED,
};

const DISPERSE_UNITS: &[UnitField] = &[
    UnitField {
        name: "transit",
        quantity: Quantity::Distance,
        working: "nm",
    },
    UnitField {
        name: "cascade_distance",
        quantity: Quantity::Distance,
        working: "nm",
    },
    UnitField {
        name: "dosage",
        quantity: Quantity::Concentration,
        working: "gal/acre",
    },
];

fn default_efficiency() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisperseConfig {
    #[serde(default)]
    pub id: Option<OperationId>,
    #[serde(default = "super::default_on")]
    pub on: bool,
    #[serde(default)]
    pub window: Vec<Interval>,
    #[serde(default)]
    pub units: UnitAssignments,
    pub platform: PlatformSpec,
    /// Distance from the staging base to the slick (nm).
    pub transit: f64,
    /// gal/acre
    pub dosage: f64,
    /// Start the run repositioning from a distant base.
    #[serde(default)]
    pub cascade_on: bool,
    /// nm; required with `cascade_on`.
    #[serde(default)]
    pub cascade_distance: Option<f64>,
    #[serde(default)]
    pub loading_type: LoadingType,
    /// Fraction of treated oil that disperses.
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct StepAmounts {
    /// gal
    dispersant: f64,
    /// m²
    area: f64,
    /// kg
    oil_treated: f64,
}

#[derive(Debug, Clone)]
pub struct Disperse {
    schedule: Schedule,
    platform: Platform,
    cascade_on: bool,
    /// gal/acre
    dosage: f64,
    desired_pump_gpm: f64,
    efficiency: f64,
    step: StepAmounts,
}

impl Disperse {
    pub fn new(
        id: OperationId,
        cfg: &DisperseConfig,
        catalog: &PlatformCatalog,
    ) -> Result<Self, ConfigError> {
        let units = WorkingUnits::new(DISPERSE_UNITS, &cfg.units)?;
        let transit_nm = units.to_working("transit", cfg.transit)?;
        let dosage = units.to_working("dosage", cfg.dosage)?;
        let cascade_nm = match (cfg.cascade_on, cfg.cascade_distance) {
            (_, Some(distance)) => units.to_working("cascade_distance", distance)?,
            (true, None) => {
                return Err(ConfigError::MissingField {
                    field: "cascade_distance",
                    reason: "cascade_on is set",
                })
            }
            (false, None) => 0.0,
        };

        check_non_negative("transit", transit_nm)?;
        check_non_negative("cascade_distance", cascade_nm)?;
        check_positive("dosage", dosage)?;
        check_fraction("efficiency", cfg.efficiency)?;

        let params = cfg.platform.resolve(catalog)?;
        let desired_pump_gpm = params.release_rate(dosage);
        let sortie = Sortie {
            transit_nm,
            cascade_nm,
            pump_rate_gpm: desired_pump_gpm.min(params.pump_rate_max),
            loading: cfg.loading_type,
        };

        Ok(Self {
            schedule: Schedule::new(id, cfg.on, &cfg.window)?,
            platform: Platform::new(params, sortie)?,
            cascade_on: cfg.cascade_on,
            dosage,
            desired_pump_gpm,
            efficiency: cfg.efficiency,
            step: StepAmounts::default(),
        })
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn dosage(&self) -> f64 {
        self.dosage
    }

    /// Achieved pump rate, gpm.
    pub fn pump_rate(&self) -> f64 {
        self.platform.sortie().pump_rate_gpm
    }

    /// Oil mass (kg) treated during the latest step.
    pub fn treated_this_step(&self) -> f64 {
        self.step.oil_treated
    }

    /// Dispersant (gal) sprayed during the latest step.
    pub fn dispersant_this_step(&self) -> f64 {
        self.step.dispersant
    }

    fn raise_rate_advisories(&mut self) {
        let params = self.platform.params();
        let (min, max) = (params.min_dosage(), params.max_dosage());
        let max_gpm = params.pump_rate_max;
        let id = &self.schedule.id;
        if self.dosage < min || self.dosage > max {
            self.schedule.advisories.raise(
                id,
                PhysicalImplausibility::DosageOutOfRange {
                    dosage: self.dosage,
                    min,
                    max,
                },
            );
        }
        if self.desired_pump_gpm > max_gpm {
            self.schedule.advisories.raise(
                id,
                PhysicalImplausibility::PumpRateLimited {
                    desired_gpm: self.desired_pump_gpm,
                    max_gpm,
                },
            );
        }
    }
}

impl Weatherer for Disperse {
    fn id(&self) -> &OperationId {
        &self.schedule.id
    }

    fn is_active(&self) -> bool {
        self.schedule.active
    }

    fn phase_label(&self) -> &'static str {
        self.platform.state().label()
    }

    fn last_step_trace(&self) -> &PhaseTrace {
        &self.schedule.trace
    }

    fn prepare_for_model_run(&mut self, ledger: &mut MassBalance) {
        self.schedule.begin_run();
        self.platform.reset(self.cascade_on);
        self.step = StepAmounts::default();
        self.raise_rate_advisories();

        let id = &self.schedule.id;
        if self.schedule.on {
            ledger.reset_mass(CHEM_DISPERSED);
            ledger.reset_entry(
                &id.0,
                LedgerEntry::Disperse(DisperseRecord {
                    payload_remaining: self.platform.disp_remaining() * M3_PER_GAL,
                    ..DisperseRecord::default()
                }),
            );
        }
        ledger.clear_reports(id);
        self.schedule.advisories.flush(id, ledger);
    }

    fn prepare_for_model_step(&mut self, spill: &Spill, time_step: f64, model_time: NaiveDateTime) {
        self.step = StepAmounts::default();
        if !self.schedule.begin_step(time_step, model_time) {
            return;
        }

        let trace = self.platform.advance(
            time_step,
            &self.schedule.id,
            &mut self.schedule.advisories,
        );
        let minutes = seconds_in(&trace, PlatformState::Disperse.label()) / 60.0;
        self.schedule.trace = trace;
        if minutes <= 0.0 {
            return;
        }

        let params = self.platform.params();
        let acres = params.swath_width * params.application_speed / FT_KTS_PER_ACRE_MIN * minutes;
        let area = acres * M2_PER_ACRE;
        let stats = spill.slick_stats();
        let treated = area
            * stats.thickness_m()
            * stats.oil_fraction()
            * stats.density_kg_per_m3
            * self.efficiency;

        self.step = StepAmounts {
            dispersant: self.pump_rate() * minutes,
            area,
            oil_treated: treated.min(stats.total_mass),
        };

        tracing::debug!(
            operation = %self.schedule.id,
            state = %self.platform.state(),
            spray_min = minutes,
            treated_kg = self.step.oil_treated,
            payload_gal = self.platform.disp_remaining(),
            "disperse step"
        );
    }

    fn weather_elements(
        &mut self,
        spill: &mut Spill,
        ledger: &mut MassBalance,
        _time_step: f64,
        _model_time: NaiveDateTime,
    ) {
        if !self.schedule.active {
            return;
        }
        let mut removed = 0.0;
        if self.step.oil_treated > 0.0 {
            removed = remove_from_spill(spill, self.step.oil_treated);
            ledger.add_mass(CHEM_DISPERSED, removed);
        }

        self.schedule.advisories.flush(&self.schedule.id, ledger);

        let step = self.step;
        let Some(record) = ledger.disperse_record_mut(&self.schedule.id) else {
            tracing::error!(
                operation = %self.schedule.id,
                "no dispersant record; run not prepared"
            );
            return;
        };
        record.dispersant_applied += step.dispersant * M3_PER_GAL;
        record.oil_treated += removed;
        record.area_covered += step.area;
        record.payload_remaining = self.platform.disp_remaining() * M3_PER_GAL;
        record.sorties_completed = self.platform.sorties_completed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{disperse_config, test_catalog};

    #[test]
    fn cascade_without_distance_is_rejected() {
        let mut cfg = disperse_config();
        cfg.cascade_on = true;
        cfg.cascade_distance = None;
        let err = Disperse::new(OperationId("d".to_string()), &cfg, &test_catalog()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingField {
                field: "cascade_distance",
                reason: "cascade_on is set"
            }
        );
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let mut cfg = disperse_config();
        cfg.platform = PlatformSpec::Named("Missing Boat".to_string());
        let err = Disperse::new(OperationId("d".to_string()), &cfg, &test_catalog()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownPlatform("Missing Boat".to_string()));
    }

    #[test]
    fn pump_rate_follows_dosage() {
        let disperse =
            Disperse::new(OperationId("d".to_string()), &disperse_config(), &test_catalog())
                .unwrap();
        // 5 gal/acre × 5 kts × 100 ft / 430
        assert!((disperse.pump_rate() - 2500.0 / 430.0).abs() < 1e-9);
    }

    #[test]
    fn excessive_dosage_caps_pump_and_warns() {
        let mut cfg = disperse_config();
        cfg.dosage = 100.0;
        let id = OperationId("d".to_string());
        let mut disperse = Disperse::new(id.clone(), &cfg, &test_catalog()).unwrap();
        assert!((disperse.pump_rate() - 100.0).abs() < 1e-12);

        let mut ledger = MassBalance::new();
        disperse.prepare_for_model_run(&mut ledger);
        let reports = ledger.reports(&id);
        assert_eq!(reports.len(), 2);
        assert!(matches!(
            reports[0],
            PhysicalImplausibility::DosageOutOfRange { .. }
        ));
        assert!(matches!(
            reports[1],
            PhysicalImplausibility::PumpRateLimited { .. }
        ));

        // Preparing again does not duplicate the report.
        disperse.prepare_for_model_run(&mut ledger);
        assert_eq!(ledger.reports(&id).len(), 2);
    }

    #[test]
    fn dosage_units_are_converted() {
        let mut cfg = disperse_config();
        // 5 gal/acre expressed in L/ha
        cfg.dosage = 5.0 * M3_PER_GAL * 1000.0 / (M2_PER_ACRE / 10_000.0);
        cfg.units.insert("dosage".to_string(), "L/ha".to_string());
        let disperse = Disperse::new(OperationId("d".to_string()), &cfg, &test_catalog()).unwrap();
        assert!((disperse.dosage() - 5.0).abs() < 1e-9);
    }
}
