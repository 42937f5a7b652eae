//! Observation records
//!
//! A record is a timestamp, a unit-system tag and a set of named
//! measurements. Presence and value are tracked separately: a field missing
//! from the input is absent from `fields`, while an explicit `null` is present
//! with a `None` value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod units;

pub use units::{UnitGroup, UnitSystem};

use crate::delivery::Timestamped;

/// A single weather observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unix epoch seconds
    #[serde(rename = "dateTime")]
    pub date_time: i64,
    /// Unit convention of the values
    #[serde(rename = "usUnits", default)]
    pub units: UnitSystem,
    /// Measurements by host field name
    #[serde(flatten)]
    pub fields: BTreeMap<String, Option<f64>>,
}

impl Record {
    pub fn new(date_time: i64, units: UnitSystem) -> Self {
        Self {
            date_time,
            units,
            fields: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with(mut self, name: &str, value: Option<f64>) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Parse a record from one line of JSON
    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Outer None: field absent. Inner None: field present but null.
    pub fn get(&self, name: &str) -> Option<Option<f64>> {
        self.fields.get(name).copied()
    }

    /// Copy of this record expressed in another unit system
    pub fn converted(&self, target: UnitSystem) -> Record {
        if self.units == target {
            return self.clone();
        }

        let fields = self
            .fields
            .iter()
            .map(|(name, value)| {
                let converted = match (value, UnitGroup::for_field(name)) {
                    (Some(v), Some(group)) => Some(group.convert(*v, self.units, target)),
                    (other, _) => *other,
                };
                (name.clone(), converted)
            })
            .collect();

        Record {
            date_time: self.date_time,
            units: target,
            fields,
        }
    }
}

impl Timestamped for Record {
    fn timestamp(&self) -> i64 {
        self.date_time
    }
}
