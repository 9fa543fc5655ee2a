//! Mechanical recovery: a skimmer fills its onboard storage, transits to
//! offload, and comes back. With a barge alongside it empties into the barge
//! and keeps collecting.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{
    check_fraction, check_non_negative, check_positive, Schedule, UnitField, WorkingUnits,
};
use crate::budget::{StallGuard, TimeBudget};
use crate::units::{
    Quantity, ENCOUNTER_GPM_FACTOR, FT_KTS_PER_ACRE_MIN, GAL_PER_BBL, M2_PER_ACRE, M3_PER_BBL,
    M3_PER_GAL,
};
use crate::{
    remove_from_spill, ConfigError, Interval, LedgerEntry, MassBalance, OperationId, PhaseTrace,
    PhysicalImplausibility, SkimRecord, SlickStats, Spill, UnitAssignments, Weatherer, SKIMMED,
};

const MAX_PRACTICAL_SWATH_FT: f64 = 1000.0;

const SKIM_UNITS: &[UnitField] = &[
    UnitField {
        name: "speed",
        quantity: Quantity::Velocity,
        working: "kts",
    },
    UnitField {
        name: "storage",
        quantity: Quantity::Volume,
        working: "bbl",
    },
    UnitField {
        name: "swath_width",
        quantity: Quantity::Distance,
        working: "ft",
    },
    UnitField {
        name: "nameplate_pump",
        quantity: Quantity::Discharge,
        working: "gpm",
    },
    UnitField {
        name: "decant_pump",
        quantity: Quantity::Discharge,
        working: "gpm",
    },
    UnitField {
        name: "transit_time",
        quantity: Quantity::Time,
        working: "s",
    },
    UnitField {
        name: "offload",
        quantity: Quantity::Time,
        working: "s",
    },
    UnitField {
        name: "rig_time",
        quantity: Quantity::Time,
        working: "s",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkimConfig {
    #[serde(default)]
    pub id: Option<OperationId>,
    #[serde(default = "super::default_on")]
    pub on: bool,
    #[serde(default)]
    pub window: Vec<Interval>,
    #[serde(default)]
    pub units: UnitAssignments,
    /// kts
    pub speed: f64,
    /// Onboard storage (bbl).
    pub storage: f64,
    /// ft
    pub swath_width: f64,
    /// Fraction of encountered emulsion that is recovered.
    pub throughput: f64,
    /// gpm
    pub nameplate_pump: f64,
    /// Fraction of recovered fluid that is emulsion rather than free water.
    #[serde(alias = "recovery_ef")]
    pub recovery_efficiency: f64,
    /// Fraction of free water decanted overboard.
    pub decant: f64,
    /// gpm
    pub decant_pump: f64,
    /// Seconds to rig and de-rig for an offload.
    #[serde(default)]
    pub rig_time: f64,
    /// Seconds each way between the slick and the offload point.
    pub transit_time: f64,
    /// Seconds to pump out a full tank.
    #[serde(default)]
    pub offload: f64,
    /// From this time a barge is alongside and takes full tanks on scene.
    #[serde(default)]
    pub barge_arrival: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SkimPhase {
    Collecting,
    Transiting { remaining_s: f64 },
    Offloading { remaining_s: f64 },
}

impl SkimPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SkimPhase::Collecting => "collecting",
            SkimPhase::Transiting { .. } => "transiting",
            SkimPhase::Offloading { .. } => "offloading",
        }
    }
}

/// Recovery rates for the current slick, gpm unless noted.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SkimRates {
    retained: f64,
    emulsion: f64,
    oil: f64,
    free_water: f64,
    water_retained: f64,
    water_decanted: f64,
    /// acres/min
    coverage: f64,
}

/// What the skimmer took in during one step. Volumes in gal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct StepAmounts {
    fluid: f64,
    emulsion: f64,
    oil: f64,
    oil_kg: f64,
    water: f64,
    water_decanted: f64,
    water_retained: f64,
    acres: f64,
}

#[derive(Debug, Clone)]
pub struct Skim {
    schedule: Schedule,
    speed_kts: f64,
    storage_bbl: f64,
    swath_ft: f64,
    throughput: f64,
    nameplate_gpm: f64,
    recovery: f64,
    decant: f64,
    decant_pump_gpm: f64,
    transit_time_s: f64,
    offload_s: f64,
    barge_arrival: Option<NaiveDateTime>,

    phase: SkimPhase,
    /// bbl
    storage_remaining: f64,
    offloads_completed: u32,
    step: StepAmounts,
}

impl Skim {
    pub fn new(id: OperationId, cfg: &SkimConfig) -> Result<Self, ConfigError> {
        let units = WorkingUnits::new(SKIM_UNITS, &cfg.units)?;
        let speed_kts = units.to_working("speed", cfg.speed)?;
        let storage_bbl = units.to_working("storage", cfg.storage)?;
        let swath_ft = units.to_working("swath_width", cfg.swath_width)?;
        let nameplate_gpm = units.to_working("nameplate_pump", cfg.nameplate_pump)?;
        let decant_pump_gpm = units.to_working("decant_pump", cfg.decant_pump)?;
        let transit_time_s = units.to_working("transit_time", cfg.transit_time)?;
        let offload_s = units.to_working("offload", cfg.offload)?;
        let rig_time_s = units.to_working("rig_time", cfg.rig_time)?;

        check_positive("speed", speed_kts)?;
        check_positive("storage", storage_bbl)?;
        check_positive("swath_width", swath_ft)?;
        check_positive("nameplate_pump", nameplate_gpm)?;
        check_non_negative("decant_pump", decant_pump_gpm)?;
        check_non_negative("transit_time", transit_time_s)?;
        check_non_negative("offload", offload_s)?;
        check_non_negative("rig_time", rig_time_s)?;
        check_fraction("throughput", cfg.throughput)?;
        check_fraction("recovery_efficiency", cfg.recovery_efficiency)?;
        check_fraction("decant", cfg.decant)?;

        Ok(Self {
            schedule: Schedule::new(id, cfg.on, &cfg.window)?,
            speed_kts,
            storage_bbl,
            swath_ft,
            throughput: cfg.throughput,
            nameplate_gpm,
            recovery: cfg.recovery_efficiency,
            decant: cfg.decant,
            decant_pump_gpm,
            transit_time_s,
            offload_s: offload_s + rig_time_s,
            barge_arrival: cfg.barge_arrival,
            phase: SkimPhase::Collecting,
            storage_remaining: storage_bbl,
            offloads_completed: 0,
            step: StepAmounts::default(),
        })
    }

    pub fn phase(&self) -> SkimPhase {
        self.phase
    }

    pub fn storage(&self) -> f64 {
        self.storage_bbl
    }

    pub fn storage_remaining(&self) -> f64 {
        self.storage_remaining
    }

    pub fn offloads_completed(&self) -> u32 {
        self.offloads_completed
    }

    /// Oil mass (kg) skimmed during the latest step.
    pub fn oil_collected_this_step(&self) -> f64 {
        self.step.oil_kg
    }

    /// Total fluid (gal) taken into storage during the latest step.
    pub fn fluid_collected_this_step(&self) -> f64 {
        self.step.fluid
    }

    fn barge_alongside(&self, model_time: NaiveDateTime) -> bool {
        self.barge_arrival.is_some_and(|arrival| model_time >= arrival)
    }

    /// Rates for the step's slick, or `None` when nothing can be recovered.
    fn recovery_rates(&mut self, stats: &SlickStats) -> Option<SkimRates> {
        let thickness_in = stats.thickness_in();
        if thickness_in <= 0.0 || self.recovery <= 0.0 || self.throughput <= 0.0 {
            return None;
        }
        let id = &self.schedule.id;

        let max_effective_swath = self.nameplate_gpm * self.recovery
            / (ENCOUNTER_GPM_FACTOR * self.speed_kts * thickness_in * self.throughput);
        let swath = self.swath_ft.min(max_effective_swath);
        if swath > MAX_PRACTICAL_SWATH_FT {
            self.schedule.advisories.raise(
                id,
                PhysicalImplausibility::OversizedSwath { swath_ft: swath },
            );
        }

        let encounter = thickness_in * self.speed_kts * swath * ENCOUNTER_GPM_FACTOR;
        if encounter <= 0.0 {
            return None;
        }

        let mut throughput = self.throughput;
        let mut total_fluid = encounter * throughput / self.recovery;
        if total_fluid > self.nameplate_gpm * (1.0 + 1e-9) {
            throughput = self.nameplate_gpm * self.recovery / encounter;
            self.schedule.advisories.raise(
                id,
                PhysicalImplausibility::NameplatePumpLimited {
                    fluid_gpm: total_fluid,
                    nameplate_gpm: self.nameplate_gpm,
                    throughput,
                },
            );
            total_fluid = encounter * throughput / self.recovery;
        }

        let emulsion = encounter * throughput;
        let free_water = (1.0 - self.recovery) * total_fluid;
        let computed_decant = free_water * self.decant;
        let overflow = (computed_decant - self.decant_pump_gpm).max(0.0);
        if overflow > 0.0 {
            self.schedule.advisories.raise(
                id,
                PhysicalImplausibility::DecantPumpLimited {
                    decant_gpm: computed_decant,
                    pump_gpm: self.decant_pump_gpm,
                },
            );
        }
        let water_retained = free_water * (1.0 - self.decant) + overflow;
        let retained = emulsion + water_retained;
        if retained <= 0.0 {
            return None;
        }

        Some(SkimRates {
            retained,
            emulsion,
            oil: emulsion * stats.oil_fraction(),
            free_water,
            water_retained,
            water_decanted: computed_decant - overflow,
            coverage: swath * self.speed_kts / FT_KTS_PER_ACRE_MIN,
        })
    }

    fn accumulate(&mut self, rates: &SkimRates, minutes: f64, stats: &SlickStats) {
        let fluid = rates.retained * minutes;
        let available_kg = (stats.total_mass - self.step.oil_kg).max(0.0);
        let oil_kg = (rates.oil * minutes * M3_PER_GAL * stats.density_kg_per_m3).min(available_kg);

        self.step.fluid += fluid;
        self.step.emulsion += rates.emulsion * minutes;
        self.step.oil += oil_kg / stats.density_kg_per_m3 / M3_PER_GAL;
        self.step.oil_kg += oil_kg;
        self.step.water += rates.free_water * minutes;
        self.step.water_decanted += rates.water_decanted * minutes;
        self.step.water_retained += rates.water_retained * minutes;
        self.step.acres += rates.coverage * minutes;
        self.storage_remaining = (self.storage_remaining - fluid / GAL_PER_BBL).max(0.0);
    }

    fn collect(
        &mut self,
        rates: Option<&SkimRates>,
        stats: &SlickStats,
        budget: &mut TimeBudget,
        model_time: NaiveDateTime,
    ) -> SkimPhase {
        let Some(rates) = rates.filter(|_| stats.total_mass > self.step.oil_kg) else {
            budget.consume_all("collecting");
            return SkimPhase::Collecting;
        };

        let time_to_fill_s = self.storage_remaining * GAL_PER_BBL / rates.retained * 60.0;
        if time_to_fill_s > budget.remaining() {
            let seconds = budget.consume_all("collecting");
            self.accumulate(rates, seconds / 60.0, stats);
            return SkimPhase::Collecting;
        }

        let seconds = budget.consume("collecting", time_to_fill_s);
        self.accumulate(rates, seconds / 60.0, stats);
        self.storage_remaining = 0.0;

        if self.barge_alongside(model_time) {
            self.storage_remaining = self.storage_bbl;
            self.offloads_completed += 1;
            tracing::debug!(operation = %self.schedule.id, "storage emptied into barge");
            return SkimPhase::Collecting;
        }
        SkimPhase::Transiting {
            remaining_s: self.transit_time_s,
        }
    }

    fn transit(&mut self, remaining_s: f64, budget: &mut TimeBudget) -> SkimPhase {
        let left = remaining_s - budget.consume("transiting", remaining_s);
        if left > 0.0 {
            return SkimPhase::Transiting { remaining_s: left };
        }
        if self.storage_remaining <= 0.0 {
            SkimPhase::Offloading {
                remaining_s: self.offload_s,
            }
        } else {
            SkimPhase::Collecting
        }
    }

    fn offload(&mut self, remaining_s: f64, budget: &mut TimeBudget) -> SkimPhase {
        let left = remaining_s - budget.consume("offloading", remaining_s);
        if left > 0.0 {
            return SkimPhase::Offloading { remaining_s: left };
        }
        self.storage_remaining = self.storage_bbl;
        self.offloads_completed += 1;
        SkimPhase::Transiting {
            remaining_s: self.transit_time_s,
        }
    }
}

impl Weatherer for Skim {
    fn id(&self) -> &OperationId {
        &self.schedule.id
    }

    fn is_active(&self) -> bool {
        self.schedule.active
    }

    fn phase_label(&self) -> &'static str {
        self.phase.label()
    }

    fn last_step_trace(&self) -> &PhaseTrace {
        &self.schedule.trace
    }

    fn prepare_for_model_run(&mut self, ledger: &mut MassBalance) {
        self.schedule.begin_run();
        self.phase = SkimPhase::Collecting;
        self.storage_remaining = self.storage_bbl;
        self.offloads_completed = 0;
        self.step = StepAmounts::default();

        let id = &self.schedule.id;
        if self.schedule.on {
            ledger.reset_mass(SKIMMED);
            ledger.reset_entry(
                &id.0,
                LedgerEntry::Skim(SkimRecord {
                    storage_remaining: self.storage_bbl * M3_PER_BBL,
                    ..SkimRecord::default()
                }),
            );
        }
        ledger.clear_reports(id);
    }

    fn prepare_for_model_step(&mut self, spill: &Spill, time_step: f64, model_time: NaiveDateTime) {
        self.step = StepAmounts::default();
        if !self.schedule.begin_step(time_step, model_time) {
            return;
        }

        let stats = spill.slick_stats();
        // Rates (and their advisories) only matter once the skimmer collects.
        let mut rates: Option<Option<SkimRates>> = None;
        let mut budget = TimeBudget::new(time_step);
        let mut guard = StallGuard::new(3);
        while !budget.is_exhausted() {
            let before = budget.remaining();
            self.phase = match self.phase {
                SkimPhase::Collecting => {
                    let rates = *rates.get_or_insert_with(|| self.recovery_rates(&stats));
                    self.collect(rates.as_ref(), &stats, &mut budget, model_time)
                }
                SkimPhase::Transiting { remaining_s } => self.transit(remaining_s, &mut budget),
                SkimPhase::Offloading { remaining_s } => self.offload(remaining_s, &mut budget),
            };
            guard.check(before, &mut budget, self.phase.label(), &self.schedule.id);
        }
        self.schedule.trace = budget.into_trace();

        tracing::debug!(
            operation = %self.schedule.id,
            phase = self.phase.label(),
            oil_kg = self.step.oil_kg,
            fluid_gal = self.step.fluid,
            storage_remaining_bbl = self.storage_remaining,
            "skim step"
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
        if self.step.oil_kg > 0.0 {
            removed = remove_from_spill(spill, self.step.oil_kg);
            ledger.add_mass(SKIMMED, removed);
            tracing::debug!(operation = %self.schedule.id, skimmed_kg = removed, "oil skimmed");
        }
        self.schedule.advisories.flush(&self.schedule.id, ledger);

        // Other operations may have taken part of the oil this skimmer
        // planned on; the record only keeps what was actually recovered.
        let share = if self.step.oil_kg > 0.0 {
            (removed / self.step.oil_kg).min(1.0)
        } else {
            0.0
        };
        let step = self.step;
        let Some(record) = ledger.skim_record_mut(&self.schedule.id) else {
            tracing::error!(operation = %self.schedule.id, "no skim record; run not prepared");
            return;
        };
        record.fluid_collected += step.fluid * share * M3_PER_GAL;
        record.emulsion_collected += step.emulsion * share * M3_PER_GAL;
        record.oil_collected += step.oil * share * M3_PER_GAL;
        record.water_collected += step.water * share * M3_PER_GAL;
        record.water_decanted += step.water_decanted * share * M3_PER_GAL;
        record.water_retained += step.water_retained * share * M3_PER_GAL;
        record.area_covered += step.acres * M2_PER_ACRE;
        record.storage_remaining = self.storage_remaining * M3_PER_BBL;
    }
}
