//! Query-string variant: US units, parameters appended to the URL

use indexmap::IndexMap;

use crate::record::{Record, UnitSystem};

/// Source field -> query parameter
const FIELD_MAP: &[(&str, &str)] = &[
    ("outTemp", "tempf"),
    ("windSpeed", "windspeedmph"),
    ("windDir", "winddir"),
    ("windGust", "windgustmph"),
    ("outHumidity", "rh"),
    ("dewpoint", "dewptf"),
    ("barometer", "baromin"),
    ("hourRain", "rainin"),
    ("UV", "uv"),
];

/// Query parameters for a record, in a stable order.
///
/// Absent source fields produce no parameter; null ones produce a parameter
/// with no value. A zero station is left out since the destination assumes it.
pub fn fields(record: &Record, station: i64) -> IndexMap<&'static str, Option<f64>> {
    let us = record.converted(UnitSystem::Us);
    let mut params = IndexMap::new();

    if station != 0 {
        params.insert("station", Some(station as f64));
    }

    for (source, param) in FIELD_MAP {
        if let Some(value) = us.get(source) {
            params.insert(*param, value);
        }
    }

    params
}

/// `key=value&key=value`, values percent-encoded
pub fn encode(params: &IndexMap<&'static str, Option<f64>>) -> String {
    params
        .iter()
        .map(|(key, value)| match value {
            Some(v) => format!("{}={}", key, urlencoding::encode(&v.to_string())),
            None => format!("{}=", key),
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_omitted() {
        let record = Record::new(0, UnitSystem::Us)
            .with("outTemp", Some(32.5))
            .with("windSpeed", Some(10.0))
            .with("windDir", Some(32.0))
            .with("outHumidity", Some(24.0));

        let params = fields(&record, 0);

        assert_eq!(params.len(), 4);
        for missing in ["dewptf", "baromin", "rainin", "uv", "windgustmph", "station"] {
            assert!(!params.contains_key(missing), "{} should be omitted", missing);
        }
        assert_eq!(encode(&params), "tempf=32.5&windspeedmph=10&winddir=32&rh=24");
    }

    #[test]
    fn test_null_field_kept_without_value() {
        let record = Record::new(0, UnitSystem::Us)
            .with("outTemp", Some(50.0))
            .with("dewpoint", None);

        let params = fields(&record, 0);

        assert_eq!(params.get("dewptf"), Some(&None));
        assert_eq!(encode(&params), "tempf=50&dewptf=");
    }

    #[test]
    fn test_metric_record_converted_to_us() {
        let record = Record::new(0, UnitSystem::MetricWx)
            .with("outTemp", Some(100.0))
            .with("windGust", Some(0.44704))
            .with("hourRain", Some(25.4));

        let params = fields(&record, 0);

        assert!((params["tempf"].unwrap() - 212.0).abs() < 1e-9);
        assert!((params["windgustmph"].unwrap() - 1.0).abs() < 1e-9);
        assert!((params["rainin"].unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_nonzero_station_included() {
        let record = Record::new(0, UnitSystem::Us).with("UV", Some(4.0));
        assert_eq!(encode(&fields(&record, 3)), "station=3&uv=4");
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let record = Record::new(0, UnitSystem::Us).with("outTemp", Some(1e-7));
        assert_eq!(encode(&fields(&record, 0)), "tempf=0.0000001");

        let record = Record::new(0, UnitSystem::Us).with("outTemp", Some(-4.5));
        assert_eq!(encode(&fields(&record, 0)), "tempf=-4.5");
    }
}
