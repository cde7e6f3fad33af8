//! Data models for Airly measurements.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::normalize::normalize;

// ---

/// Particulate sensors republished to the consumer layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sensor {
    Pm25,
    Pm10,
}

impl Sensor {
    pub const ALL: [Sensor; 2] = [Sensor::Pm25, Sensor::Pm10];

    /// Name used by the upstream `values` list.
    pub fn api_name(self) -> &'static str {
        match self {
            Sensor::Pm25 => "PM25",
            Sensor::Pm10 => "PM10",
        }
    }
}

/// One entry of the `current.values` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorEntry {
    pub name: Option<String>,
    /// `None` when the upstream value is missing or not a number.
    pub value: Option<f64>,
}

/// One entry of the `current.indexes` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub name: Option<String>,
    pub value: Option<f64>,
    pub level: Option<String>,
    pub description: Option<String>,
}

/// The `current` section of a measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentMeasurement {
    pub values: Vec<SensorEntry>,
    pub indexes: Vec<IndexEntry>,
}

/// Canonical measurement, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub current: CurrentMeasurement,
}

impl Measurement {
    /// Normalize a raw response and build a measurement from it.
    ///
    /// Returns `None` when the payload holds no canonical object or the object
    /// lacks a `current` section. Mistyped fields inside `current` degrade to
    /// empty lists and absent values instead of failing the whole reading.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        // ---
        let canonical = normalize(payload)?;
        Self::from_canonical(canonical)
    }

    fn from_canonical(canonical: &Map<String, Value>) -> Option<Self> {
        // ---
        let current = canonical.get("current")?.as_object()?;

        let values = list(current, "values")
            .map(|item| SensorEntry {
                name: string_field(item, "name"),
                value: number_field(item, "value"),
            })
            .collect();

        let indexes = list(current, "indexes")
            .map(|item| IndexEntry {
                name: string_field(item, "name"),
                value: number_field(item, "value"),
                level: string_field(item, "level"),
                description: string_field(item, "description"),
            })
            .collect();

        Some(Measurement {
            current: CurrentMeasurement { values, indexes },
        })
    }

    /// First numeric value reported under `name`; `None` rather than zero
    /// when the sensor is not present.
    pub fn sensor_value(&self, name: &str) -> Option<f64> {
        // ---
        self.current
            .values
            .iter()
            .find(|entry| entry.name.as_deref() == Some(name) && entry.value.is_some())
            .and_then(|entry| entry.value)
    }

    /// Value of the first index entry, or 0 when it carries no number.
    ///
    /// A description-only entry (no stations nearby) is logged as a warning.
    pub fn index_value(&self) -> f64 {
        // ---
        let Some(index) = self.current.indexes.first() else {
            return 0.0;
        };
        if let Some(value) = index.value {
            return value;
        }
        if let Some(description) = &index.description {
            tracing::warn!("{}", description);
        }
        0.0
    }

    /// Diagnostic text attached to the first index entry, if any.
    pub fn description(&self) -> Option<&str> {
        self.current
            .indexes
            .first()
            .and_then(|index| index.description.as_deref())
    }
}

fn list<'a>(object: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    object
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(String::from)
}

fn number_field(item: &Value, key: &str) -> Option<f64> {
    item.get(key).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    use crate::test_support::CapturedLogs;

    fn create_test_measurement() -> Measurement {
        // ---
        let payload = json!({
            "current": {
                "indexes": [
                    { "name": "AIRLY_CAQI", "value": 75, "level": "MEDIUM" },
                    { "name": "OTHER", "value": 5 }
                ],
                "values": [
                    { "name": "PM1", "value": 4.2 },
                    { "name": "PM25", "value": 12 },
                    { "name": "PM10", "value": 20.5 },
                    { "name": "PM25", "value": 99 }
                ]
            }
        });
        Measurement::from_payload(&payload).unwrap()
    }

    #[test]
    fn test_sensor_value_first_match_wins() {
        // ---
        let m = create_test_measurement();
        assert_eq!(m.sensor_value("PM25"), Some(12.0));
        assert_eq!(m.sensor_value("PM10"), Some(20.5));
    }

    #[test]
    fn test_sensor_value_absent_is_none_not_zero() {
        // ---
        let m = create_test_measurement();
        assert_eq!(m.sensor_value("NO2"), None);
        assert_eq!(m.sensor_value("pm25"), None);
    }

    #[test]
    fn test_sensor_value_skips_non_numeric_entries() {
        // ---
        let payload = json!({
            "current": {
                "values": [
                    { "name": "PM25", "value": "12" },
                    { "name": "PM25", "value": 8 },
                    { "name": "PM10", "value": null }
                ]
            }
        });
        let m = Measurement::from_payload(&payload).unwrap();
        assert_eq!(m.sensor_value("PM25"), Some(8.0));
        assert_eq!(m.sensor_value("PM10"), None);
    }

    #[test]
    fn test_index_value_uses_first_entry_only() {
        // ---
        let m = create_test_measurement();
        assert_eq!(m.index_value(), 75.0);
    }

    #[test]
    fn test_index_value_defaults_to_zero() {
        // ---
        let empty = Measurement::from_payload(&json!({ "current": { "indexes": [] } })).unwrap();
        assert_eq!(empty.index_value(), 0.0);

        let missing = Measurement::from_payload(&json!({ "current": {} })).unwrap();
        assert_eq!(missing.index_value(), 0.0);

        let mistyped =
            Measurement::from_payload(&json!({ "current": { "indexes": "AIRLY_CAQI" } })).unwrap();
        assert_eq!(mistyped.index_value(), 0.0);
    }

    #[test]
    fn test_no_coverage_description_yields_zero() {
        // ---
        let payload = json!({
            "current": {
                "indexes": [
                    { "description": "There are no Airly sensors in this area yet." },
                    { "value": 30 }
                ]
            }
        });
        let m = Measurement::from_payload(&payload).unwrap();
        assert_eq!(m.index_value(), 0.0);
        assert_eq!(
            m.description(),
            Some("There are no Airly sensors in this area yet.")
        );
    }

    #[test]
    fn test_no_coverage_description_logged_at_warn() {
        // ---
        let payload = json!({ "current": { "indexes": [{ "description": "No sensors nearby" }] } });
        let m = Measurement::from_payload(&payload).unwrap();
        let logs = CapturedLogs::default();

        let index = tracing::dispatcher::with_default(&logs.subscriber(), || m.index_value());

        assert_eq!(index, 0.0);
        assert!(logs.has_warning("No sensors nearby"), "{}", logs.contents());
    }

    #[test]
    fn test_missing_current_section_is_rejected() {
        // ---
        assert!(Measurement::from_payload(&json!({ "history": [] })).is_none());
        assert!(Measurement::from_payload(&json!({ "current": 5 })).is_none());
        assert!(Measurement::from_payload(&Value::Null).is_none());
    }

    #[test]
    fn test_wrapped_payload_is_normalized() {
        // ---
        let payload = json!({ "data": [{ "current": { "indexes": [{ "value": 30 }] } }] });
        let m = Measurement::from_payload(&payload).unwrap();
        assert_eq!(m.index_value(), 30.0);
    }
}
