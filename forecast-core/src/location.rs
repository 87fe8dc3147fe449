use serde::{Deserialize, Serialize};

use crate::error::RefreshError;

/// A dashboard location and the Environment Canada station that covers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Province directory on the city-page server, e.g. `ON`.
    pub province: String,
    /// City-page identifier, e.g. `s0000458`.
    pub station_code: String,
}

const KNOWN: &[(&str, f64, f64, &str, &str)] = &[
    ("Toronto", 43.6532, -79.3832, "ON", "s0000458"),
    ("Markham", 43.8561, -79.3370, "ON", "s0000430"),
    ("Richmond Hill", 43.8828, -79.4403, "ON", "s0000623"),
    ("Vaughan", 43.8361, -79.4983, "ON", "s0000098"),
];

impl Location {
    /// All locations the dashboard knows a station for, in menu order.
    pub fn all() -> Vec<Location> {
        KNOWN
            .iter()
            .map(|&(name, latitude, longitude, province, code)| Location {
                name: name.to_string(),
                latitude,
                longitude,
                province: province.to_string(),
                station_code: code.to_string(),
            })
            .collect()
    }

    /// The first entry of [`Location::all`].
    pub fn default_location() -> Location {
        let mut all = Self::all();
        all.swap_remove(0)
    }

    /// `"lat,lon"` with four decimals, the key the station table is indexed by.
    pub fn coordinate_key(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }

    /// Resolve a location by name (`"richmond-hill"`, `"Richmond Hill"`) or by
    /// coordinate key (`"43.8828,-79.4403"`).
    pub fn find(query: &str) -> Result<Location, RefreshError> {
        let wanted = squash(query);

        Self::all()
            .into_iter()
            .find(|loc| squash(&loc.name) == wanted || loc.coordinate_key() == query.trim())
            .ok_or_else(|| {
                let supported: Vec<String> = Self::all().into_iter().map(|l| l.name).collect();
                RefreshError::UnknownLocation(format!(
                    "'{query}'. Supported locations: {}.",
                    supported.join(", ")
                ))
            })
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_fixed_stations() {
        let codes: Vec<String> = Location::all().into_iter().map(|l| l.station_code).collect();
        assert_eq!(codes, vec!["s0000458", "s0000430", "s0000623", "s0000098"]);
    }

    #[test]
    fn find_by_name_ignores_case_and_separators() {
        let loc = Location::find("richmond-hill").expect("known location");
        assert_eq!(loc.station_code, "s0000623");

        let loc = Location::find("  TORONTO ").expect("known location");
        assert_eq!(loc.station_code, "s0000458");
    }

    #[test]
    fn find_by_coordinate_key() {
        let loc = Location::find("43.8361,-79.4983").expect("known coordinates");
        assert_eq!(loc.name, "Vaughan");
        assert_eq!(loc.coordinate_key(), "43.8361,-79.4983");
    }

    #[test]
    fn unknown_location_lists_supported() {
        let err = Location::find("Ottawa").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Ottawa"));
        assert!(msg.contains("Markham"));
    }
}
