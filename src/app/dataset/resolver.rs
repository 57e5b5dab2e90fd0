//! Measurement type to module resolution

use crate::app::models::Station;

/// Finds the module of `station` that reports `measurement_type`
///
/// Modules are scanned in the order the API listed them and the first match
/// wins. `None` means the station has no such sensor, which is routine.
pub fn resolve_module<'a>(station: &'a Station, measurement_type: &str) -> Option<&'a str> {
    station
        .measures
        .iter()
        .find(|(_, descriptor)| descriptor.reports(measurement_type))
        .map(|(module_id, _)| module_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(measures: &str) -> Station {
        serde_json::from_str(&format!(
            r#"{{"_id": "70:ee:50:00:00:01", "place": {{"location": [4.9, 52.3]}}, "measures": {}}}"#,
            measures
        ))
        .unwrap()
    }

    #[test]
    fn test_first_module_in_api_order_wins() {
        // Both modules report temperature; the later id sorts first
        let station = station(
            r#"{
                "02:00:00:aa:00:02": {"type": ["temperature", "humidity"]},
                "02:00:00:aa:00:01": {"type": ["temperature"]},
                "70:ee:50:00:00:01": {"type": ["pressure"]}
            }"#,
        );

        assert_eq!(
            resolve_module(&station, "temperature"),
            Some("02:00:00:aa:00:02")
        );
        assert_eq!(resolve_module(&station, "pressure"), Some("70:ee:50:00:00:01"));
    }

    #[test]
    fn test_missing_type_is_none() {
        let station = station(
            r#"{
                "70:ee:50:00:00:01": {"type": ["pressure"]},
                "05:00:00:00:00:07": {"rain_60min": 0, "rain_24h": 1.2}
            }"#,
        );

        assert_eq!(resolve_module(&station, "co2"), None);
        assert_eq!(resolve_module(&station, "rain"), None);
    }

    #[test]
    fn test_station_without_modules() {
        let station: Station = serde_json::from_str(
            r#"{"_id": "70:ee:50:00:00:02", "place": {"location": [0.0, 0.0]}}"#,
        )
        .unwrap();
        assert_eq!(resolve_module(&station, "pressure"), None);
    }
}
