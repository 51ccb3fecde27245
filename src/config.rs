//! Feed endpoint configuration.

use std::collections::BTreeMap;

use crate::error::ConfigError;

const MTA_BASE_URL: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2F";

/// The feed group used when neither a feed nor a route is requested.
pub const DEFAULT_GROUP: &str = "nqrw";

/// Maps feed group keys (e.g. `"nqrw"`) to endpoint URLs.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "nqrw": "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-nqrw",
///   "local": "feeds/nqrw.pb"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    entries: BTreeMap<String, String>,
}

impl Default for FeedEndpoints {
    /// The NYCT subway feeds.
    fn default() -> Self {
        let entries = [
            ("1234567", "gtfs"),
            ("ace", "gtfs-ace"),
            ("bdfm", "gtfs-bdfm"),
            ("g", "gtfs-g"),
            ("jz", "gtfs-jz"),
            ("l", "gtfs-l"),
            ("nqrw", "gtfs-nqrw"),
            ("si", "gtfs-si"),
        ]
        .into_iter()
        .map(|(group, path)| (group.to_string(), format!("{MTA_BASE_URL}{path}")))
        .collect();
        Self { entries }
    }
}

impl FeedEndpoints {
    /// Loads the mapping from a JSON file at `path`. Group keys are
    /// case-insensitive and stored lowercased.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&content)?;
        let entries = raw
            .into_iter()
            .map(|(group, endpoint)| (group.to_ascii_lowercase(), endpoint))
            .collect();
        Ok(Self { entries })
    }

    /// Adds or replaces the groups in `other`.
    pub fn merge(&mut self, other: FeedEndpoints) {
        self.entries.extend(other.entries);
    }

    /// Returns the endpoint configured for `group`, if any.
    pub fn get(&self, group: &str) -> Option<&str> {
        self.entries
            .get(&group.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Resolves a group key or passes through a literal URL or file path.
    pub fn resolve(&self, group_or_endpoint: &str) -> Result<String, ConfigError> {
        if let Some(endpoint) = self.get(group_or_endpoint) {
            return Ok(endpoint.to_string());
        }
        if group_or_endpoint.contains('/') || group_or_endpoint.contains('.') {
            return Ok(group_or_endpoint.to_string());
        }
        Err(ConfigError::UnknownFeedGroup(group_or_endpoint.to_string()))
    }

    /// Iterates over all `(group, endpoint)` pairs, sorted by group.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The NYCT feed group carrying `route`.
pub fn group_for_route(route: &str) -> Option<&'static str> {
    let group = match route.to_ascii_uppercase().as_str() {
        "1" | "2" | "3" | "4" | "5" | "6" | "6X" | "7" | "7X" | "GS" => "1234567",
        "A" | "C" | "E" | "H" | "FS" => "ace",
        "B" | "D" | "F" | "FX" | "M" => "bdfm",
        "G" => "g",
        "J" | "Z" => "jz",
        "L" => "l",
        "N" | "Q" | "R" | "W" => "nqrw",
        "SI" | "SIR" => "si",
        _ => return None,
    };
    Some(group)
}
