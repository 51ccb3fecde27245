//! Stop id to display name lookup.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Resolves a stop id into a human-readable label.
pub trait StopLabels {
    fn lookup(&self, stop_id: &str) -> Option<&str>;

    /// The label for `stop_id`, falling back to the id itself.
    fn label_for<'a>(&'a self, stop_id: &'a str) -> &'a str {
        self.lookup(stop_id).unwrap_or(stop_id)
    }
}

/// A lookup that knows no names; every stop is shown by id.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLabels;

impl StopLabels for NoLabels {
    fn lookup(&self, _stop_id: &str) -> Option<&str> {
        None
    }
}

/// Map-backed stop names.
#[derive(Debug, Default, Clone)]
pub struct StopNames {
    names: HashMap<String, String>,
}

/// One row of a GTFS `stops.txt`; other columns are ignored.
#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    stop_name: String,
}

impl StopNames {
    /// The Queens Plaza platforms shipped with the tool.
    pub fn builtin() -> Self {
        [
            ("718S", "Queensboro Plaza"),
            ("G21S", "Queens Plaza"),
            ("R09S", "Queensboro Plaza"),
        ]
        .into_iter()
        .collect()
    }

    /// Loads names from a GTFS static `stops.txt`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;
        let mut names = HashMap::new();
        for row in reader.deserialize() {
            let row: StopRow = row?;
            names.insert(row.stop_id, row.stop_name);
        }
        debug!(path = %path.display(), stops = names.len(), "Loaded stop names");
        Ok(Self { names })
    }

    /// Adds `other`'s names, replacing existing entries.
    pub fn extend(&mut self, other: StopNames) {
        self.names.extend(other.names);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StopNames {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl StopLabels for StopNames {
    fn lookup(&self, stop_id: &str) -> Option<&str> {
        self.names.get(stop_id).map(String::as_str)
    }
}
