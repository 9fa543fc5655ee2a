//! Response platforms: catalog entries and the operating-state lifecycle.
//!
//! A platform cycles through the states of its `TransitionTable`. Each state
//! lasts a duration derived from the platform's parameters and the sortie it
//! flies (distances, pump rate, loading arrangement). Catalog units are the
//! ones response planners use: nm, kts, minutes, hours, gal, gpm, ft.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::budget::{StallGuard, TimeBudget};
use crate::report::Advisories;
use crate::units::FT_KTS_PER_ACRE_MIN;
use crate::{ConfigError, OperationId, PhaseTrace, PhysicalImplausibility};

/// Payload below this many gallons counts as empty.
const PAYLOAD_EPSILON_GAL: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    #[default]
    Vessel,
    Aircraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformState {
    Cascade,
    Refuel,
    Reload,
    TaxiTakeoff,
    EnRoute,
    AtSite,
    Disperse,
    Return,
    LandingTaxi,
}

impl PlatformState {
    pub fn label(self) -> &'static str {
        match self {
            PlatformState::Cascade => "cascade",
            PlatformState::Refuel => "refuel",
            PlatformState::Reload => "reload",
            PlatformState::TaxiTakeoff => "taxi_takeoff",
            PlatformState::EnRoute => "en_route",
            PlatformState::AtSite => "at_site",
            PlatformState::Disperse => "disperse",
            PlatformState::Return => "return",
            PlatformState::LandingTaxi => "landing_taxi",
        }
    }
}

impl std::fmt::Display for PlatformState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Transition tables
// ---------------------------------------------------------------------------

/// State → successor mapping. Data, not code: a new platform type only needs
/// a new table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionTable {
    edges: BTreeMap<PlatformState, PlatformState>,
}

impl TransitionTable {
    pub fn new(edges: impl IntoIterator<Item = (PlatformState, PlatformState)>) -> Self {
        Self {
            edges: edges.into_iter().collect(),
        }
    }

    pub fn aircraft() -> Self {
        use PlatformState::{
            AtSite, Cascade, Disperse, EnRoute, LandingTaxi, Refuel, Reload, Return, TaxiTakeoff,
        };
        Self::new([
            (Cascade, Refuel),
            (Refuel, Reload),
            (Reload, TaxiTakeoff),
            (TaxiTakeoff, EnRoute),
            (EnRoute, AtSite),
            (AtSite, Disperse),
            (Disperse, Return),
            (Return, LandingTaxi),
            (LandingTaxi, Refuel),
        ])
    }

    pub fn vessel() -> Self {
        use PlatformState::{AtSite, Cascade, Disperse, EnRoute, Refuel, Reload, Return};
        Self::new([
            (Cascade, Refuel),
            (Refuel, Reload),
            (Reload, EnRoute),
            (EnRoute, AtSite),
            (AtSite, Disperse),
            (Disperse, Return),
            (Return, Refuel),
        ])
    }

    pub fn for_kind(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Vessel => Self::vessel(),
            PlatformKind::Aircraft => Self::aircraft(),
        }
    }

    pub fn next(&self, state: PlatformState) -> Option<PlatformState> {
        self.edges.get(&state).copied()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Walking from `cascade` and from `en_route` must never dead-end and
    /// must reach `disperse`.
    fn validate(&self, platform: &str) -> Result<(), ConfigError> {
        for start in [PlatformState::Cascade, PlatformState::EnRoute] {
            let mut visited = BTreeSet::new();
            let mut state = start;
            while visited.insert(state) {
                state = self.next(state).ok_or_else(|| ConfigError::IncompleteTransitionTable {
                    platform: platform.to_string(),
                    state,
                })?;
            }
            if !visited.contains(&PlatformState::Disperse) {
                return Err(ConfigError::IncompleteTransitionTable {
                    platform: platform.to_string(),
                    state: PlatformState::Disperse,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Platform parameters and catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformParams {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: PlatformKind,
    /// kts
    pub transit_speed: f64,
    /// kts
    pub application_speed: f64,
    pub cascade_transit_speed_with_payload: f64,
    pub cascade_transit_speed_without_payload: f64,
    /// nm
    pub max_range_with_payload: f64,
    pub max_range_no_payload: f64,
    /// Minutes lost to each landing/departure during transit.
    #[serde(default)]
    pub taxi_land_depart: f64,
    #[serde(default)]
    pub taxi_time_takeoff: f64,
    #[serde(default)]
    pub taxi_time_landing: f64,
    /// Minutes to refuel.
    pub fuel_load: f64,
    /// Minutes to reload dispersant.
    pub dispersant_load: f64,
    /// Minutes to position on scene before the first pass.
    #[serde(default)]
    pub u_turn_time: f64,
    /// Hours a sortie may last.
    pub max_op_time: f64,
    /// Dispersant payload, gal.
    pub payload: f64,
    /// gpm
    pub pump_rate_max: f64,
    pub pump_rate_min: f64,
    /// ft
    pub swath_width: f64,
    #[serde(default)]
    pub swath_width_min: Option<f64>,
    #[serde(default)]
    pub swath_width_max: Option<f64>,
    #[serde(default)]
    pub application_speed_min: Option<f64>,
    #[serde(default)]
    pub application_speed_max: Option<f64>,
    /// Overrides the default table for `kind`.
    #[serde(default)]
    pub transitions: Option<TransitionTable>,
}

impl PlatformParams {
    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("transit_speed", self.transit_speed),
            ("application_speed", self.application_speed),
            (
                "cascade_transit_speed_with_payload",
                self.cascade_transit_speed_with_payload,
            ),
            (
                "cascade_transit_speed_without_payload",
                self.cascade_transit_speed_without_payload,
            ),
            ("max_range_with_payload", self.max_range_with_payload),
            ("max_range_no_payload", self.max_range_no_payload),
            ("max_op_time", self.max_op_time),
            ("payload", self.payload),
            ("pump_rate_max", self.pump_rate_max),
            ("swath_width", self.swath_width),
        ];
        for (field, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        let non_negative = [
            ("taxi_land_depart", self.taxi_land_depart),
            ("taxi_time_takeoff", self.taxi_time_takeoff),
            ("taxi_time_landing", self.taxi_time_landing),
            ("fuel_load", self.fuel_load),
            ("dispersant_load", self.dispersant_load),
            ("u_turn_time", self.u_turn_time),
            ("pump_rate_min", self.pump_rate_min),
        ];
        for (field, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: f64::INFINITY,
                });
            }
        }
        Ok(())
    }

    pub fn transition_table(&self) -> TransitionTable {
        self.transitions
            .clone()
            .unwrap_or_else(|| TransitionTable::for_kind(self.kind))
    }

    /// Pump rate (gpm) needed to lay down `dosage` gal/acre.
    pub fn release_rate(&self, dosage: f64) -> f64 {
        dosage * self.application_speed * self.swath_width / FT_KTS_PER_ACRE_MIN
    }

    /// Largest dosage (gal/acre) the pump can deliver at the slowest, narrowest pass.
    pub fn max_dosage(&self) -> f64 {
        let speed = self.application_speed_min.unwrap_or(self.application_speed);
        let swath = self.swath_width_min.unwrap_or(self.swath_width);
        self.pump_rate_max * FT_KTS_PER_ACRE_MIN / (speed * swath)
    }

    /// Smallest dosage (gal/acre) at the fastest, widest pass.
    pub fn min_dosage(&self) -> f64 {
        let speed = self.application_speed_max.unwrap_or(self.application_speed);
        let swath = self.swath_width_max.unwrap_or(self.swath_width);
        self.pump_rate_min * FT_KTS_PER_ACRE_MIN / (speed * swath)
    }

    /// One-way transit to the spill, seconds. Aircraft pay a taxi overhead.
    pub fn one_way_transit_s(&self, distance_nm: f64) -> f64 {
        let mut hours = distance_nm / self.transit_speed;
        if self.kind == PlatformKind::Aircraft {
            hours += self.taxi_land_depart / 60.0;
        }
        hours * 3600.0
    }

    /// Time to reposition the platform over `distance_nm`, seconds.
    ///
    /// Beyond its range the platform flies full legs with a refuelling stop
    /// after each, then the fractional remainder.
    pub fn cascade_time_s(&self, distance_nm: f64, has_payload: bool) -> f64 {
        let (max_range, speed) = if has_payload {
            (
                self.max_range_with_payload,
                self.cascade_transit_speed_with_payload,
            )
        } else {
            (
                self.max_range_no_payload,
                self.cascade_transit_speed_without_payload,
            )
        };
        let taxi_h = self.taxi_land_depart / 60.0;
        let leg_h = max_range / speed;

        let hours = if distance_nm > max_range {
            let legs = distance_nm / max_range;
            let full_legs = legs.floor();
            let fractional_leg = legs - full_legs;
            let inter_stop_h = (2.0 * self.taxi_land_depart + self.fuel_load) / 60.0;
            taxi_h + full_legs * (leg_h + inter_stop_h) + fractional_leg * leg_h + taxi_h
        } else {
            2.0 * taxi_h + distance_nm / speed
        };
        hours * 3600.0
    }

    /// Sortie time left on scene after the round trip, seconds. May be negative.
    pub fn max_onsite_time_s(&self, distance_nm: f64) -> f64 {
        self.max_op_time * 3600.0 - 2.0 * self.one_way_transit_s(distance_nm)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformCatalog {
    #[serde(default)]
    pub vessel: Vec<PlatformParams>,
    #[serde(default)]
    pub aircraft: Vec<PlatformParams>,
}

impl PlatformCatalog {
    /// Stamp each entry with the kind of the list it was loaded from.
    pub fn with_kinds(mut self) -> Self {
        for params in &mut self.vessel {
            params.kind = PlatformKind::Vessel;
        }
        for params in &mut self.aircraft {
            params.kind = PlatformKind::Aircraft;
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformParams> {
        self.vessel.iter().chain(&self.aircraft)
    }

    pub fn get(&self, name: &str) -> Option<&PlatformParams> {
        self.iter().find(|params| params.name == name)
    }
}

/// Either a catalog name or a full parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlatformSpec {
    Named(String),
    Explicit(Box<PlatformParams>),
}

impl PlatformSpec {
    pub fn resolve(&self, catalog: &PlatformCatalog) -> Result<PlatformParams, ConfigError> {
        match self {
            PlatformSpec::Named(name) => catalog
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownPlatform(name.clone())),
            PlatformSpec::Explicit(params) => Ok(params.as_ref().clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingType {
    /// Fuel and dispersant load at the same time.
    #[default]
    Simultaneous,
    Sequential,
}

/// What one sortie asks of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sortie {
    pub transit_nm: f64,
    pub cascade_nm: f64,
    /// Achieved dispersant pump rate, gpm.
    pub pump_rate_gpm: f64,
    pub loading: LoadingType,
}

#[derive(Debug, Clone, Serialize)]
pub struct Platform {
    params: PlatformParams,
    table: TransitionTable,
    sortie: Sortie,
    state: PlatformState,
    time_to_next_state: f64,
    has_payload: bool,
    /// gal
    disp_remaining: f64,
    /// Seconds of the current sortie's on-scene window still unused.
    onsite_remaining: f64,
    sorties_completed: u32,
}

impl Platform {
    pub fn new(params: PlatformParams, sortie: Sortie) -> Result<Self, ConfigError> {
        params.validate()?;
        let table = params.transition_table();
        table.validate(&params.name)?;
        Ok(Self {
            params,
            table,
            sortie,
            state: PlatformState::Cascade,
            time_to_next_state: 0.0,
            has_payload: false,
            disp_remaining: 0.0,
            onsite_remaining: 0.0,
            sorties_completed: 0,
        })
    }

    /// Put the platform at its run-start state: repositioning from afar when
    /// `cascade` is set, otherwise already loaded and heading out.
    pub fn reset(&mut self, cascade: bool) {
        self.sorties_completed = 0;
        self.onsite_remaining = 0.0;
        if cascade {
            self.state = PlatformState::Cascade;
            self.has_payload = false;
            self.disp_remaining = 0.0;
        } else {
            self.state = PlatformState::EnRoute;
            self.has_payload = true;
            self.disp_remaining = self.params.payload;
        }
        self.time_to_next_state = self.state_duration(self.state);
    }

    pub fn params(&self) -> &PlatformParams {
        &self.params
    }

    pub fn sortie(&self) -> &Sortie {
        &self.sortie
    }

    pub fn state(&self) -> PlatformState {
        self.state
    }

    pub fn time_to_next_state(&self) -> f64 {
        self.time_to_next_state
    }

    pub fn has_payload(&self) -> bool {
        self.has_payload
    }

    pub fn disp_remaining(&self) -> f64 {
        self.disp_remaining
    }

    pub fn sorties_completed(&self) -> u32 {
        self.sorties_completed
    }

    /// Duration of `state` for the current sortie, seconds.
    pub fn state_duration(&self, state: PlatformState) -> f64 {
        let p = &self.params;
        match state {
            PlatformState::Cascade => p.cascade_time_s(self.sortie.cascade_nm, self.has_payload),
            PlatformState::Refuel => p.fuel_load * 60.0,
            PlatformState::Reload => match self.sortie.loading {
                LoadingType::Sequential => p.dispersant_load * 60.0,
                LoadingType::Simultaneous => (p.dispersant_load - p.fuel_load).max(0.0) * 60.0,
            },
            PlatformState::TaxiTakeoff => p.taxi_time_takeoff * 60.0,
            PlatformState::LandingTaxi => p.taxi_time_landing * 60.0,
            PlatformState::EnRoute | PlatformState::Return => {
                p.one_way_transit_s(self.sortie.transit_nm)
            }
            PlatformState::AtSite => (p.u_turn_time * 60.0).min(self.onsite_remaining),
            PlatformState::Disperse => self.time_to_empty_s().min(self.onsite_remaining),
        }
    }

    /// Hours to spray what is on board, zero with an empty tank or a dead pump.
    fn payload_spray_h(&self) -> f64 {
        let seconds = self.time_to_empty_s();
        if self.has_payload && seconds.is_finite() {
            seconds / 3600.0
        } else {
            0.0
        }
    }

    fn time_to_empty_s(&self) -> f64 {
        if self.sortie.pump_rate_gpm <= 0.0 {
            return f64::INFINITY;
        }
        self.disp_remaining / self.sortie.pump_rate_gpm * 60.0
    }

    /// Run the lifecycle forward by `elapsed` seconds.
    ///
    /// Overshoot past a state's end carries into the next state, so the
    /// returned trace always sums to `elapsed`.
    pub(crate) fn advance(
        &mut self,
        elapsed: f64,
        operation: &OperationId,
        advisories: &mut Advisories,
    ) -> PhaseTrace {
        let mut budget = TimeBudget::new(elapsed);
        let mut guard = StallGuard::new(u32::try_from(self.table.len()).unwrap_or(u32::MAX));
        while !budget.is_exhausted() {
            let before = budget.remaining();
            let spent = budget.consume(self.state.label(), self.time_to_next_state);
            self.spend(spent);
            self.time_to_next_state -= spent;
            if self.time_to_next_state <= 0.0 {
                self.goto_next_state(operation, advisories);
            }
            guard.check(before, &mut budget, self.state.label(), operation);
        }
        budget.into_trace()
    }

    fn spend(&mut self, seconds: f64) {
        match self.state {
            PlatformState::AtSite => {
                self.onsite_remaining = (self.onsite_remaining - seconds).max(0.0);
            }
            PlatformState::Disperse => {
                let used = self.sortie.pump_rate_gpm * seconds / 60.0;
                self.disp_remaining = (self.disp_remaining - used).max(0.0);
                self.onsite_remaining = (self.onsite_remaining - seconds).max(0.0);
            }
            _ => {}
        }
    }

    fn goto_next_state(&mut self, operation: &OperationId, advisories: &mut Advisories) {
        let leaving = self.state;
        match leaving {
            PlatformState::Reload => {
                self.has_payload = true;
                self.disp_remaining = self.params.payload;
            }
            PlatformState::Disperse => {
                if self.disp_remaining <= PAYLOAD_EPSILON_GAL {
                    self.disp_remaining = 0.0;
                    self.has_payload = false;
                }
                self.sorties_completed += 1;
            }
            _ => {}
        }

        let Some(next) = self.table.next(leaving) else {
            tracing::error!(%operation, state = %leaving, "no successor state; platform parked");
            self.time_to_next_state = f64::INFINITY;
            return;
        };
        if next == PlatformState::AtSite {
            self.open_onsite_window(operation, advisories);
        }
        self.state = next;
        self.time_to_next_state = self.state_duration(next);
        tracing::debug!(
            %operation,
            from = %leaving,
            to = %next,
            duration_s = self.time_to_next_state,
            "platform state change"
        );
    }

    fn open_onsite_window(&mut self, operation: &OperationId, advisories: &mut Advisories) {
        let onsite = self.params.max_onsite_time_s(self.sortie.transit_nm);
        if onsite < 0.0 {
            advisories.raise(
                operation,
                PhysicalImplausibility::NegativeOnsiteTime {
                    onsite_h: onsite / 3600.0,
                    spray_h: self.payload_spray_h(),
                },
            );
        }
        self.onsite_remaining = onsite.max(0.0);
    }
}
