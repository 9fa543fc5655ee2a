//! Unit tables for the physical quantities response operations are configured in.
//!
//! Every quantity category owns a static list of accepted unit names and the
//! factor that takes one of that unit to the category's SI base. Conversion is
//! a ratio of two factors; there is no dynamic lookup beyond the table.

use serde::{Deserialize, Serialize};

use crate::UnitError;

// Fixed factors used by the response formulas themselves.
pub const INCHES_PER_METER: f64 = 39.370_078_740_157_48;
pub const GAL_PER_BBL: f64 = 42.0;
/// Barrels per cubic foot as used by the boom fill equation.
pub const BBL_PER_FT3: f64 = 0.178_11;
pub const M3_PER_GAL: f64 = 0.003_785_411_784;
pub const M3_PER_BBL: f64 = M3_PER_GAL * GAL_PER_BBL;
pub const M3_PER_FT3: f64 = 0.028_316_846_592;
pub const M2_PER_ACRE: f64 = 4_046.856_422_4;
/// `ft × kts / 430` gives acres per minute.
pub const FT_KTS_PER_ACRE_MIN: f64 = 430.0;
/// `63.13 × ft × in × kts` gives gallons per minute of encountered oil.
pub const ENCOUNTER_GPM_FACTOR: f64 = 63.13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Distance,
    Velocity,
    Volume,
    Discharge,
    Time,
    Concentration,
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Quantity::Distance => "distance",
            Quantity::Velocity => "velocity",
            Quantity::Volume => "volume",
            Quantity::Discharge => "discharge",
            Quantity::Time => "time",
            Quantity::Concentration => "concentration",
        })
    }
}

struct UnitDef {
    names: &'static [&'static str],
    to_si: f64,
}

// SI base: m
const DISTANCE: &[UnitDef] = &[
    UnitDef {
        names: &["m", "meter", "meters"],
        to_si: 1.0,
    },
    UnitDef {
        names: &["cm", "centimeters"],
        to_si: 0.01,
    },
    UnitDef {
        names: &["km", "kilometers"],
        to_si: 1000.0,
    },
    UnitDef {
        names: &["in", "inch", "inches"],
        to_si: 0.0254,
    },
    UnitDef {
        names: &["ft", "foot", "feet"],
        to_si: 0.3048,
    },
    UnitDef {
        names: &["yd", "yards"],
        to_si: 0.9144,
    },
    UnitDef {
        names: &["mi", "miles"],
        to_si: 1609.344,
    },
    UnitDef {
        names: &["nm", "nmi", "nautical miles"],
        to_si: 1852.0,
    },
];

// SI base: m/s
const VELOCITY: &[UnitDef] = &[
    UnitDef {
        names: &["m/s", "meters per second"],
        to_si: 1.0,
    },
    UnitDef {
        names: &["cm/s"],
        to_si: 0.01,
    },
    UnitDef {
        names: &["km/h", "kph"],
        to_si: 1000.0 / 3600.0,
    },
    UnitDef {
        names: &["kts", "knots", "knot"],
        to_si: 1852.0 / 3600.0,
    },
    UnitDef {
        names: &["mph"],
        to_si: 0.447_04,
    },
    UnitDef {
        names: &["ft/s"],
        to_si: 0.3048,
    },
];

// SI base: m³
const VOLUME: &[UnitDef] = &[
    UnitDef {
        names: &["m^3", "m3", "cubic meters"],
        to_si: 1.0,
    },
    UnitDef {
        names: &["l", "L", "liters"],
        to_si: 0.001,
    },
    UnitDef {
        names: &["gal", "gallons"],
        to_si: M3_PER_GAL,
    },
    UnitDef {
        names: &["bbl", "barrels"],
        to_si: M3_PER_BBL,
    },
    UnitDef {
        names: &["ft^3", "ft3", "cubic feet"],
        to_si: M3_PER_FT3,
    },
];

// SI base: m³/s
const DISCHARGE: &[UnitDef] = &[
    UnitDef {
        names: &["m^3/s", "cms"],
        to_si: 1.0,
    },
    UnitDef {
        names: &["m^3/hr", "m3/hr"],
        to_si: 1.0 / 3600.0,
    },
    UnitDef {
        names: &["l/s", "L/s"],
        to_si: 0.001,
    },
    UnitDef {
        names: &["l/min", "L/min"],
        to_si: 0.001 / 60.0,
    },
    UnitDef {
        names: &["gpm", "gal/min"],
        to_si: M3_PER_GAL / 60.0,
    },
    UnitDef {
        names: &["bbl/hr"],
        to_si: M3_PER_BBL / 3600.0,
    },
    UnitDef {
        names: &["bbl/day", "bpd"],
        to_si: M3_PER_BBL / 86_400.0,
    },
];

// SI base: s
const TIME: &[UnitDef] = &[
    UnitDef {
        names: &["sec", "s", "seconds"],
        to_si: 1.0,
    },
    UnitDef {
        names: &["min", "minutes"],
        to_si: 60.0,
    },
    UnitDef {
        names: &["hr", "hours", "h"],
        to_si: 3600.0,
    },
    UnitDef {
        names: &["day", "days"],
        to_si: 86_400.0,
    },
];

// SI base: m³ of liquid per m² of sea surface
const CONCENTRATION: &[UnitDef] = &[
    UnitDef {
        names: &["m^3/m^2"],
        to_si: 1.0,
    },
    UnitDef {
        names: &["gal/acre"],
        to_si: M3_PER_GAL / M2_PER_ACRE,
    },
    UnitDef {
        names: &["l/ha", "L/ha"],
        to_si: 0.001 / 10_000.0,
    },
    UnitDef {
        names: &["ml/m^2", "mL/m^2"],
        to_si: 1e-6,
    },
    UnitDef {
        names: &["micron", "microns"],
        to_si: 1e-6,
    },
];

impl Quantity {
    fn table(self) -> &'static [UnitDef] {
        match self {
            Quantity::Distance => DISTANCE,
            Quantity::Velocity => VELOCITY,
            Quantity::Volume => VOLUME,
            Quantity::Discharge => DISCHARGE,
            Quantity::Time => TIME,
            Quantity::Concentration => CONCENTRATION,
        }
    }

    fn factor(self, unit: &str) -> Result<f64, UnitError> {
        self.table()
            .iter()
            .find(|def| def.names.contains(&unit))
            .map(|def| def.to_si)
            .ok_or_else(|| UnitError::UnknownUnit {
                unit: unit.to_string(),
                quantity: self,
            })
    }

    /// True if `unit` is an accepted name for this quantity.
    pub fn accepts(self, unit: &str) -> bool {
        self.factor(unit).is_ok()
    }

    /// All accepted unit names, aliases included.
    pub fn unit_names(self) -> impl Iterator<Item = &'static str> {
        self.table().iter().flat_map(|def| def.names.iter().copied())
    }
}

/// Convert `value` from one unit of `quantity` to another.
pub fn convert(quantity: Quantity, from: &str, to: &str, value: f64) -> Result<f64, UnitError> {
    let from_si = quantity.factor(from)?;
    let to_si = quantity.factor(to)?;
    Ok(value * from_si / to_si)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_nautical_miles_to_feet() {
        let feet = convert(Quantity::Distance, "nm", "ft", 1.0).unwrap();
        assert!((feet - 6076.115).abs() < 1e-3);
    }

    #[test]
    fn barrel_is_42_gallons() {
        let gal = convert(Quantity::Volume, "bbl", "gal", 1.0).unwrap();
        assert!((gal - 42.0).abs() < 1e-9);
    }

    #[test]
    fn aliases_share_a_factor() {
        let a = convert(Quantity::Velocity, "kts", "m/s", 3.0).unwrap();
        let b = convert(Quantity::Velocity, "knots", "m/s", 3.0).unwrap();
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn rejects_unit_from_another_category() {
        let err = convert(Quantity::Distance, "gal", "ft", 1.0).unwrap_err();
        assert_eq!(
            err,
            UnitError::UnknownUnit {
                unit: "gal".to_string(),
                quantity: Quantity::Distance
            }
        );
        assert!(!Quantity::Time.accepts("ft"));
        assert!(Quantity::Discharge.accepts("gpm"));
    }

    #[test]
    fn knots_times_feet_over_430_is_acres_per_minute() {
        // 1 kt sweeping a 1 ft swath for one minute.
        let swept_m2 = convert(Quantity::Velocity, "kts", "m/s", 1.0).unwrap() * 60.0 * 0.3048;
        let acres = swept_m2 / M2_PER_ACRE;
        assert!((acres - 1.0 / FT_KTS_PER_ACRE_MIN).abs() / acres < 0.01);
    }

    #[test]
    fn every_category_lists_names() {
        for quantity in [
            Quantity::Distance,
            Quantity::Velocity,
            Quantity::Volume,
            Quantity::Discharge,
            Quantity::Time,
            Quantity::Concentration,
        ] {
            assert!(quantity.unit_names().count() > 2, "{quantity} has too few units");
        }
    }
}
