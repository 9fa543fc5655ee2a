//! In-situ burning: a boom collects emulsion, tows it to a burn position,
//! burns it off, and returns after cleaning.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{
    check_fraction, check_non_negative, check_positive, Schedule, UnitField, WorkingUnits,
};
use crate::budget::{StallGuard, TimeBudget};
use crate::units::{
    Quantity, BBL_PER_FT3, ENCOUNTER_GPM_FACTOR, FT_KTS_PER_ACRE_MIN, GAL_PER_BBL, M3_PER_FT3,
};
use crate::{
    remove_from_spill, ConfigError, Interval, LedgerEntry, MassBalance, OperationId, PhaseTrace,
    PhysicalImplausibility, SlickStats, Spill, UnitAssignments, Weatherer, BOOMED, BURNED,
};

const CLEANING_TIME_S: f64 = 3600.0;
/// Burn rate per unit of oil fraction, in/min.
const BURN_RATE_IN_PER_MIN: f64 = 0.14;
/// Fraction of the boom draft that burns off, scaled to minutes by the rate.
const BURN_DRAFT_FACTOR: f64 = 0.33;
/// Minutes per ft of offset at one knot.
const OFFSET_MIN_PER_FT_KT: f64 = 0.00987;
const MAX_PRACTICAL_SWATH_FT: f64 = 1000.0;
const MAX_ENTRAINMENT_SPEED_KTS: f64 = 1.2;

const BURN_UNITS: &[UnitField] = &[
    UnitField {
        name: "offset",
        quantity: Quantity::Distance,
        working: "ft",
    },
    UnitField {
        name: "boom_length",
        quantity: Quantity::Distance,
        working: "ft",
    },
    UnitField {
        name: "boom_draft",
        quantity: Quantity::Distance,
        working: "in",
    },
    UnitField {
        name: "speed",
        quantity: Quantity::Velocity,
        working: "kts",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnConfig {
    #[serde(default)]
    pub id: Option<OperationId>,
    #[serde(default = "super::default_on")]
    pub on: bool,
    #[serde(default)]
    pub window: Vec<Interval>,
    #[serde(default)]
    pub units: UnitAssignments,
    /// Distance from the collection area to the burn position (ft).
    pub offset: f64,
    /// ft
    pub boom_length: f64,
    /// in
    pub boom_draft: f64,
    /// Towing speed while collecting (kts).
    pub speed: f64,
    /// Fraction of encountered emulsion retained by the boom.
    pub throughput: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitLeg {
    ToBurn,
    ToCollect,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum BurnPhase {
    Collecting,
    Transiting { remaining_s: f64, leg: TransitLeg },
    Burning { remaining_s: f64 },
    Cleaning { remaining_s: f64 },
}

impl BurnPhase {
    pub fn label(&self) -> &'static str {
        match self {
            BurnPhase::Collecting => "collecting",
            BurnPhase::Transiting { .. } => "transiting",
            BurnPhase::Burning { .. } => "burning",
            BurnPhase::Cleaning { .. } => "cleaning",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Burn {
    schedule: Schedule,
    boom_draft_in: f64,
    speed_kts: f64,
    throughput: f64,

    swath_ft: f64,
    boom_capacity_ft3: f64,
    offset_time_s: f64,
    /// acres/min
    area_coverage_rate: f64,

    phase: BurnPhase,
    /// Free boom volume, ft³.
    boom_capacity_remaining: f64,
    /// Oil mass held in the boom, kg.
    boom_oil_mass: f64,
    burn_time_s: Option<f64>,
    total_burns: u32,

    ts_collected: f64,
    ts_burned: f64,
}

impl Burn {
    pub fn new(id: OperationId, cfg: &BurnConfig) -> Result<Self, ConfigError> {
        let units = WorkingUnits::new(BURN_UNITS, &cfg.units)?;
        let offset_ft = units.to_working("offset", cfg.offset)?;
        let boom_length_ft = units.to_working("boom_length", cfg.boom_length)?;
        let boom_draft_in = units.to_working("boom_draft", cfg.boom_draft)?;
        let speed_kts = units.to_working("speed", cfg.speed)?;

        check_non_negative("offset", offset_ft)?;
        check_positive("boom_length", boom_length_ft)?;
        check_positive("boom_draft", boom_draft_in)?;
        check_positive("speed", speed_kts)?;
        check_fraction("throughput", cfg.throughput)?;

        let swath_ft = 0.3 * boom_length_ft;
        let boom_area_ft2 = swath_ft * (0.4125 * boom_length_ft / 3.0) * 2.0 / 3.0;
        let boom_capacity_ft3 = boom_draft_in / 36.0 * boom_area_ft2;

        Ok(Self {
            schedule: Schedule::new(id, cfg.on, &cfg.window)?,
            boom_draft_in,
            speed_kts,
            throughput: cfg.throughput,
            swath_ft,
            boom_capacity_ft3,
            offset_time_s: offset_ft * OFFSET_MIN_PER_FT_KT / speed_kts * 60.0,
            area_coverage_rate: swath_ft * speed_kts / FT_KTS_PER_ACRE_MIN,
            phase: BurnPhase::Collecting,
            boom_capacity_remaining: boom_capacity_ft3,
            boom_oil_mass: 0.0,
            burn_time_s: None,
            total_burns: 0,
            ts_collected: 0.0,
            ts_burned: 0.0,
        })
    }

    pub fn phase(&self) -> BurnPhase {
        self.phase
    }

    pub fn swath_width(&self) -> f64 {
        self.swath_ft
    }

    pub fn boom_capacity(&self) -> f64 {
        self.boom_capacity_ft3
    }

    pub fn boom_capacity_remaining(&self) -> f64 {
        self.boom_capacity_remaining
    }

    pub fn boom_oil_mass(&self) -> f64 {
        self.boom_oil_mass
    }

    pub fn offset_time(&self) -> f64 {
        self.offset_time_s
    }

    pub fn area_coverage_rate(&self) -> f64 {
        self.area_coverage_rate
    }

    pub fn burn_time(&self) -> Option<f64> {
        self.burn_time_s
    }

    pub fn total_burns(&self) -> u32 {
        self.total_burns
    }

    /// Oil mass (kg) collected during the latest step.
    pub fn collected_this_step(&self) -> f64 {
        self.ts_collected
    }

    /// Oil mass (kg) burned during the latest step.
    pub fn burned_this_step(&self) -> f64 {
        self.ts_burned
    }

    fn compute_burn_time(&mut self, stats: &SlickStats) -> f64 {
        let water_pct = stats.mean_frac_water * 100.0;
        let rate = BURN_RATE_IN_PER_MIN * (100.0 - water_pct) / 100.0;
        if rate <= 0.0 {
            self.schedule.advisories.raise(
                &self.schedule.id,
                PhysicalImplausibility::NoBurnRate { water_pct },
            );
            return f64::INFINITY;
        }
        BURN_DRAFT_FACTOR * self.boom_draft_in / rate * 60.0
    }

    fn boom_contents(&self) -> f64 {
        (self.boom_capacity_ft3 - self.boom_capacity_remaining).max(0.0)
    }

    fn take_into_boom(&mut self, ft3: f64, kg_per_ft3: f64, available_kg: f64) {
        let ft3 = ft3.clamp(0.0, self.boom_capacity_remaining);
        let kg = (ft3 * kg_per_ft3).min(available_kg);
        self.boom_capacity_remaining -= ft3;
        self.boom_oil_mass += kg;
        self.ts_collected += kg;
    }

    /// Burn `ft3` of boom contents; the oil mass goes with its volume share.
    fn burn_from_boom(&mut self, ft3: f64) {
        let contents = self.boom_contents();
        if contents <= 0.0 || ft3 <= 0.0 {
            return;
        }
        let share = (ft3 / contents).min(1.0);
        let kg = self.boom_oil_mass * share;
        self.boom_oil_mass -= kg;
        self.boom_capacity_remaining =
            (self.boom_capacity_remaining + ft3.min(contents)).min(self.boom_capacity_ft3);
        self.ts_burned += kg;
    }

    fn collect(&mut self, stats: &SlickStats, budget: &mut TimeBudget) -> BurnPhase {
        if self.burn_time_s.is_none() {
            self.burn_time_s = Some(self.compute_burn_time(stats));
        }

        let rate_gpm = ENCOUNTER_GPM_FACTOR
            * self.swath_ft
            * stats.thickness_in()
            * self.speed_kts
            * self.throughput;
        let available_kg = (stats.total_mass - self.ts_collected).max(0.0);
        if rate_gpm <= 0.0 || available_kg <= 0.0 {
            budget.consume_all("collecting");
            return BurnPhase::Collecting;
        }

        let kg_per_ft3 = M3_PER_FT3 * stats.oil_kg_per_emulsion_m3();
        let remaining_gal = self.boom_capacity_remaining * BBL_PER_FT3 * GAL_PER_BBL;
        let time_to_fill_s = remaining_gal / rate_gpm * 60.0;

        if time_to_fill_s > budget.remaining() {
            let minutes = budget.consume_all("collecting") / 60.0;
            let ft3 = rate_gpm * minutes / GAL_PER_BBL / BBL_PER_FT3;
            self.take_into_boom(ft3, kg_per_ft3, available_kg);
            return BurnPhase::Collecting;
        }

        budget.consume("collecting", time_to_fill_s);
        self.take_into_boom(self.boom_capacity_remaining, kg_per_ft3, available_kg);
        self.boom_capacity_remaining = 0.0;
        BurnPhase::Transiting {
            remaining_s: self.offset_time_s,
            leg: TransitLeg::ToBurn,
        }
    }

    fn transit(&mut self, remaining_s: f64, leg: TransitLeg, budget: &mut TimeBudget) -> BurnPhase {
        let left = remaining_s - budget.consume("transiting", remaining_s);
        if left > 0.0 {
            return BurnPhase::Transiting {
                remaining_s: left,
                leg,
            };
        }
        match leg {
            TransitLeg::ToBurn => BurnPhase::Burning {
                remaining_s: self.burn_time_s.unwrap_or(f64::INFINITY),
            },
            TransitLeg::ToCollect => BurnPhase::Collecting,
        }
    }

    fn burn(&mut self, remaining_s: f64, budget: &mut TimeBudget) -> BurnPhase {
        let spent = budget.consume("burning", remaining_s);
        let left = remaining_s - spent;
        if left > 0.0 {
            let burn_time = self.burn_time_s.unwrap_or(f64::INFINITY);
            self.burn_from_boom(self.boom_capacity_ft3 * spent / burn_time);
            return BurnPhase::Burning { remaining_s: left };
        }

        self.burn_from_boom(self.boom_contents());
        self.boom_capacity_remaining = self.boom_capacity_ft3;
        self.boom_oil_mass = 0.0;
        self.burn_time_s = None;
        self.total_burns += 1;
        BurnPhase::Cleaning {
            remaining_s: CLEANING_TIME_S,
        }
    }

    fn clean(&mut self, remaining_s: f64, budget: &mut TimeBudget) -> BurnPhase {
        let left = remaining_s - budget.consume("cleaning", remaining_s);
        if left > 0.0 {
            return BurnPhase::Cleaning { remaining_s: left };
        }
        BurnPhase::Transiting {
            remaining_s: self.offset_time_s,
            leg: TransitLeg::ToCollect,
        }
    }
}

impl Weatherer for Burn {
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
        self.phase = BurnPhase::Collecting;
        self.boom_capacity_remaining = self.boom_capacity_ft3;
        self.boom_oil_mass = 0.0;
        self.burn_time_s = None;
        self.total_burns = 0;
        self.ts_collected = 0.0;
        self.ts_burned = 0.0;

        let id = &self.schedule.id;
        if self.swath_ft > MAX_PRACTICAL_SWATH_FT {
            self.schedule.advisories.raise(
                id,
                PhysicalImplausibility::OversizedSwath {
                    swath_ft: self.swath_ft,
                },
            );
        }
        if self.speed_kts > MAX_ENTRAINMENT_SPEED_KTS {
            self.schedule.advisories.raise(
                id,
                PhysicalImplausibility::ExcessiveSpeed {
                    speed_kts: self.speed_kts,
                },
            );
        }

        if self.schedule.on {
            ledger.reset_mass(BURNED);
            ledger.reset_mass(BOOMED);
            ledger.reset_entry(&id.0, LedgerEntry::Mass(0.0));
        }
        ledger.clear_reports(id);
        self.schedule.advisories.flush(id, ledger);
    }

    fn prepare_for_model_step(&mut self, spill: &Spill, time_step: f64, model_time: NaiveDateTime) {
        self.ts_collected = 0.0;
        self.ts_burned = 0.0;
        if !self.schedule.begin_step(time_step, model_time) {
            return;
        }

        let stats = spill.slick_stats();
        let mut budget = TimeBudget::new(time_step);
        let mut guard = StallGuard::new(4);
        while !budget.is_exhausted() {
            let before = budget.remaining();
            self.phase = match self.phase {
                BurnPhase::Collecting => self.collect(&stats, &mut budget),
                BurnPhase::Transiting { remaining_s, leg } => {
                    self.transit(remaining_s, leg, &mut budget)
                }
                BurnPhase::Burning { remaining_s } => self.burn(remaining_s, &mut budget),
                BurnPhase::Cleaning { remaining_s } => self.clean(remaining_s, &mut budget),
            };
            guard.check(before, &mut budget, self.phase.label(), &self.schedule.id);
        }
        self.schedule.trace = budget.into_trace();

        tracing::debug!(
            operation = %self.schedule.id,
            phase = self.phase.label(),
            collected_kg = self.ts_collected,
            burned_kg = self.ts_burned,
            boom_remaining_ft3 = self.boom_capacity_remaining,
            "burn step"
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
        if self.ts_collected > 0.0 {
            let removed = remove_from_spill(spill, self.ts_collected);
            ledger.add_mass(BOOMED, removed);
            ledger.add_mass(&self.schedule.id.0, removed);
            tracing::debug!(operation = %self.schedule.id, boomed_kg = removed, "oil boomed");

            // Other operations got to the oil first; the boom holds only what
            // actually left the water.
            let shortfall = self.ts_collected - removed;
            if shortfall > 0.0 {
                let from_boom = shortfall.min(self.boom_oil_mass);
                self.boom_oil_mass -= from_boom;
                self.ts_burned = (self.ts_burned - (shortfall - from_boom)).max(0.0);
            }
        }
        if self.ts_burned > 0.0 {
            ledger.add_mass(BURNED, self.ts_burned);
            ledger.add_mass(BOOMED, -self.ts_burned);
        }
        self.schedule.advisories.flush(&self.schedule.id, ledger);
    }
}
