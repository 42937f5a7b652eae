//! JSON-body variant: metric units, one observation per request

use chrono::DateTime;
use indexmap::IndexMap;
use serde_json::{Number, Value, json};

use crate::delivery::DeliveryError;
use crate::record::{Record, UnitSystem};

/// Source field -> body field, with a multiplier applied after unit conversion
const FIELD_MAP: &[(&str, &str, f64)] = &[
    ("outTemp", "temp", 1.0),
    ("windSpeed", "wind", 1.0),
    ("windDir", "winddir", 1.0),
    ("windGust", "gust", 1.0),
    ("outHumidity", "rh", 1.0),
    ("dewpoint", "dewpoint", 1.0),
    // sea-level pressure arrives in mbar, the body wants Pa
    ("barometer", "pressure", 100.0),
    ("hourRain", "precip", 1.0),
    ("UV", "uv", 1.0),
];

/// Integral values become JSON integers so `32.0` is sent as `32`
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// The observation object for a record
pub fn fields(record: &Record, station: i64) -> Result<IndexMap<&'static str, Value>, DeliveryError> {
    let metric = record.converted(UnitSystem::MetricWx);
    let timestamp = DateTime::from_timestamp(metric.date_time, 0)
        .ok_or_else(|| DeliveryError::Build(format!("timestamp out of range: {}", metric.date_time)))?;

    let mut data = IndexMap::new();
    data.insert("station", json!(station));
    data.insert("dateutc", json!(timestamp.format("%Y-%m-%d %H:%M:%S").to_string()));

    for (source, field, scale) in FIELD_MAP {
        if let Some(value) = metric.get(source) {
            data.insert(*field, value.map(|v| number(v * scale)).unwrap_or(Value::Null));
        }
    }

    Ok(data)
}

/// `{"observations": [<fields>]}` serialized
pub fn body(record: &Record, station: i64) -> Result<String, DeliveryError> {
    let observation = fields(record, station)?;
    serde_json::to_string(&json!({ "observations": [observation] }))
        .map_err(|e| DeliveryError::Build(format!("failed to serialize body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_record() -> Record {
        Record::new(1_554_000_000, UnitSystem::Us)
            .with("outTemp", Some(32.5))
            .with("windSpeed", Some(10.0))
            .with("windDir", Some(32.0))
            .with("outHumidity", Some(24.0))
    }

    #[test]
    fn test_example_record_fields() {
        let data = fields(&example_record(), 0).unwrap();

        let keys: Vec<&str> = data.keys().copied().collect();
        assert_eq!(keys, vec!["station", "dateutc", "temp", "wind", "winddir", "rh"]);
        assert_eq!(data["station"], json!(0));
        assert_eq!(data["dateutc"], json!("2019-03-31 02:40:00"));
        assert!((data["temp"].as_f64().unwrap() - 0.2777777).abs() < 1e-6);
        assert!((data["wind"].as_f64().unwrap() - 4.4704).abs() < 1e-9);
        assert_eq!(data["winddir"], json!(32));
        assert_eq!(data["rh"], json!(24));
    }

    #[test]
    fn test_body_wraps_single_observation() {
        let body: Value = serde_json::from_str(&body(&example_record(), 42).unwrap()).unwrap();
        let observations = body["observations"].as_array().unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0]["station"], json!(42));
    }

    #[test]
    fn test_null_field_emitted_as_null() {
        let record = Record::new(0, UnitSystem::MetricWx).with("dewpoint", None);
        let data = fields(&record, 0).unwrap();
        assert_eq!(data.get("dewpoint"), Some(&Value::Null));
        assert!(!data.contains_key("temp"));
    }

    #[test]
    fn test_barometer_sent_in_pascals() {
        let record = Record::new(0, UnitSystem::Metric).with("barometer", Some(1013.25));
        let data = fields(&record, 0).unwrap();
        assert!((data["pressure"].as_f64().unwrap() - 101_325.0).abs() < 1e-6);
    }

    #[test]
    fn test_hour_rain_in_millimetres() {
        let record = Record::new(0, UnitSystem::Us).with("hourRain", Some(0.5));
        let data = fields(&record, 0).unwrap();
        assert!((data["precip"].as_f64().unwrap() - 12.7).abs() < 1e-9);
    }

    #[test]
    fn test_unrepresentable_timestamp_fails() {
        let record = Record::new(i64::MAX, UnitSystem::Us);
        assert!(matches!(fields(&record, 0), Err(DeliveryError::Build(_))));
    }
}
