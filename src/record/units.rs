//! Unit systems and conversions
//!
//! Values are converted through a base unit per group (degC, m/s, mbar, mm),
//! so any system can be converted to any other.

use serde::{Deserialize, Serialize};

const MPH_TO_MPS: f64 = 0.44704;
const KPH_TO_MPS: f64 = 1.0 / 3.6;
const INHG_TO_MBAR: f64 = 33.863_886_666_7;
const INCH_TO_MM: f64 = 25.4;
const CM_TO_MM: f64 = 10.0;

/// Unit convention a record is expressed in, tagged the way the host tags it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UnitSystem {
    /// degF, mph, inHg, inch
    #[default]
    Us,
    /// degC, km/h, mbar, cm
    Metric,
    /// degC, m/s, mbar, mm
    MetricWx,
}

impl TryFrom<u8> for UnitSystem {
    type Error = String;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::Us),
            16 => Ok(Self::Metric),
            17 => Ok(Self::MetricWx),
            other => Err(format!("unknown unit system tag: {}", other)),
        }
    }
}

impl From<UnitSystem> for u8 {
    fn from(units: UnitSystem) -> u8 {
        match units {
            UnitSystem::Us => 1,
            UnitSystem::Metric => 16,
            UnitSystem::MetricWx => 17,
        }
    }
}

/// Physical quantity a field measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitGroup {
    Temperature,
    Speed,
    Pressure,
    Rain,
}

impl UnitGroup {
    /// Group for an observation field, or None if it has no unit to convert
    pub fn for_field(name: &str) -> Option<Self> {
        match name {
            "outTemp" | "inTemp" | "dewpoint" | "windchill" | "heatindex" | "appTemp" => Some(Self::Temperature),
            "windSpeed" | "windGust" => Some(Self::Speed),
            "barometer" | "pressure" | "altimeter" => Some(Self::Pressure),
            "hourRain" | "rain" | "rain24" | "dayRain" => Some(Self::Rain),
            _ => None,
        }
    }

    fn to_base(self, value: f64, units: UnitSystem) -> f64 {
        match (self, units) {
            (Self::Temperature, UnitSystem::Us) => (value - 32.0) * 5.0 / 9.0,
            (Self::Temperature, _) => value,
            (Self::Speed, UnitSystem::Us) => value * MPH_TO_MPS,
            (Self::Speed, UnitSystem::Metric) => value * KPH_TO_MPS,
            (Self::Speed, UnitSystem::MetricWx) => value,
            (Self::Pressure, UnitSystem::Us) => value * INHG_TO_MBAR,
            (Self::Pressure, _) => value,
            (Self::Rain, UnitSystem::Us) => value * INCH_TO_MM,
            (Self::Rain, UnitSystem::Metric) => value * CM_TO_MM,
            (Self::Rain, UnitSystem::MetricWx) => value,
        }
    }

    fn from_base(self, value: f64, units: UnitSystem) -> f64 {
        match (self, units) {
            (Self::Temperature, UnitSystem::Us) => value * 9.0 / 5.0 + 32.0,
            (Self::Temperature, _) => value,
            (Self::Speed, UnitSystem::Us) => value / MPH_TO_MPS,
            (Self::Speed, UnitSystem::Metric) => value / KPH_TO_MPS,
            (Self::Speed, UnitSystem::MetricWx) => value,
            (Self::Pressure, UnitSystem::Us) => value / INHG_TO_MBAR,
            (Self::Pressure, _) => value,
            (Self::Rain, UnitSystem::Us) => value / INCH_TO_MM,
            (Self::Rain, UnitSystem::Metric) => value / CM_TO_MM,
            (Self::Rain, UnitSystem::MetricWx) => value,
        }
    }

    /// Convert a value of this group between unit systems
    pub fn convert(self, value: f64, from: UnitSystem, to: UnitSystem) -> f64 {
        if from == to {
            return value;
        }
        self.from_base(self.to_base(value, from), to)
    }
}
