//! Type definitions for `roc_core`.
//!
//! Identity newtypes, the substance batches the host hands to each operation,
//! and the aggregate slick statistics the schedulers read.

use serde::{Deserialize, Serialize};

use crate::units::INCHES_PER_METER;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(OperationId);

// ---------------------------------------------------------------------------
// Substance state (owned by the host)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    pub name: String,
    pub density_kg_per_m3: f64,
}

/// Per-element arrays for every element of one substance.
///
/// `mass[i]` is kept equal to the sum of `mass_components[i]`; the core only
/// scales the component rows and re-derives `mass`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstanceBatch {
    pub substance: Substance,
    pub mass: Vec<f64>,
    pub mass_components: Vec<Vec<f64>>,
    /// Surface area per element, m².
    pub area: Vec<f64>,
    /// Water fraction of the emulsion per element, 0..1.
    pub frac_water: Vec<f64>,
}

impl SubstanceBatch {
    pub fn len(&self) -> usize {
        self.mass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    pub fn total_mass(&self) -> f64 {
        self.mass.iter().sum()
    }
}

/// Every floating element the host currently tracks, grouped by substance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spill {
    pub batches: Vec<SubstanceBatch>,
}

impl Spill {
    pub fn element_count(&self) -> usize {
        self.batches.iter().map(SubstanceBatch::len).sum()
    }

    pub fn total_mass(&self) -> f64 {
        self.batches.iter().map(SubstanceBatch::total_mass).sum()
    }

    /// Aggregate statistics over all elements.
    ///
    /// Response operations only know total amounts, so a spill holding more
    /// than one substance is reduced with the first substance's density.
    pub fn slick_stats(&self) -> SlickStats {
        let populated: Vec<&SubstanceBatch> =
            self.batches.iter().filter(|b| !b.is_empty()).collect();
        let Some(first) = populated.first() else {
            return SlickStats::default();
        };
        if populated
            .iter()
            .any(|b| b.substance.name != first.substance.name)
        {
            tracing::error!(
                substances = populated.len(),
                "more than one substance present; response results use '{}'",
                first.substance.name
            );
        }

        let count = populated.iter().map(|b| b.len()).sum::<usize>() as f64;
        let total_mass: f64 = populated.iter().map(|b| b.total_mass()).sum();
        let area_sum: f64 = populated.iter().flat_map(|b| &b.area).sum();
        let water_sum: f64 = populated.iter().flat_map(|b| &b.frac_water).sum();
        let any_area = populated.iter().flat_map(|b| &b.area).any(|a| *a > 0.0);

        SlickStats {
            mean_mass: total_mass / count,
            total_mass,
            mean_area: area_sum / count,
            mean_frac_water: water_sum / count,
            density_kg_per_m3: first.substance.density_kg_per_m3,
            any_area,
        }
    }
}

// ---------------------------------------------------------------------------
// Slick statistics
// ---------------------------------------------------------------------------

/// Snapshot of the slick taken at the start of a step. Read-only input to the
/// phase handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlickStats {
    pub mean_mass: f64,
    pub total_mass: f64,
    pub mean_area: f64,
    pub mean_frac_water: f64,
    pub density_kg_per_m3: f64,
    pub any_area: bool,
}

impl SlickStats {
    /// Emulsion thickness in meters; zero when there is no floating oil.
    pub fn thickness_m(&self) -> f64 {
        let oil_fraction = self.oil_fraction();
        if !self.any_area
            || self.mean_area <= 0.0
            || self.density_kg_per_m3 <= 0.0
            || oil_fraction <= 0.0
        {
            return 0.0;
        }
        let emulsion_volume = (self.mean_mass / self.density_kg_per_m3) / oil_fraction;
        emulsion_volume / self.mean_area
    }

    pub fn thickness_in(&self) -> f64 {
        self.thickness_m() * INCHES_PER_METER
    }

    /// Fraction of the emulsion that is oil.
    pub fn oil_fraction(&self) -> f64 {
        (1.0 - self.mean_frac_water).clamp(0.0, 1.0)
    }

    /// Oil mass carried by one cubic meter of emulsion.
    pub fn oil_kg_per_emulsion_m3(&self) -> f64 {
        self.density_kg_per_m3 * self.oil_fraction()
    }
}
