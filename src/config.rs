//! Destination configuration files.
//!
//! A catalog is a JSON document listing destinations as flat key,value
//! objects:
//!
//! ```json
//! {
//!   "destinations": [
//!     { "NAME": "DEV", "ASHOST": "192.168.8.4", "SYSNR": "00", "CLIENT": "001",
//!       "USER": "bobpage", "PASSWD": "secret", "LANG": "EN" }
//!   ]
//! }
//! ```
//!
//! Values may be strings, numbers or booleans; keys are case insensitive.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::connparams::DestinationConfig;
use crate::error::{ConnectorError, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Setting {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl Setting {
    fn into_string(self) -> String {
        match self {
            Setting::Text(s) => s,
            Setting::Number(n) => n.to_string(),
            Setting::Flag(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    destinations: Vec<BTreeMap<String, Setting>>,
}

/// The destinations of a configuration file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationCatalog {
    destinations: Vec<DestinationConfig>,
}

impl DestinationCatalog {
    pub fn new(destinations: Vec<DestinationConfig>) -> DestinationCatalog {
        DestinationCatalog { destinations }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<DestinationCatalog> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConnectorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = DestinationCatalog::from_json(&text)?;
        log::debug!(
            "read {} destinations from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn from_json(text: &str) -> Result<DestinationCatalog> {
        let file: CatalogFile =
            serde_json::from_str(text).map_err(|source| ConnectorError::ConfigParse { source })?;
        let destinations = file
            .destinations
            .into_iter()
            .map(|entry| {
                entry
                    .into_iter()
                    .map(|(k, v)| (k, v.into_string()))
                    .collect::<DestinationConfig>()
            })
            .collect();
        Ok(DestinationCatalog { destinations })
    }

    /// The destination named `name`, or the first one listed when no name
    /// is given.
    pub fn destination(&self, name: Option<&str>) -> Result<&DestinationConfig> {
        if self.destinations.is_empty() {
            return Err(ConnectorError::Configuration(
                "no destinations are configured".to_string(),
            ));
        }
        match name {
            None => Ok(&self.destinations[0]),
            Some(name) => self
                .destinations
                .iter()
                .find(|d| d.name() == Some(name))
                .ok_or_else(|| {
                    ConnectorError::Configuration(format!(
                        "destination '{}' is not configured",
                        name
                    ))
                }),
        }
    }

    /// Names of the named destinations.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.destinations.iter().filter_map(DestinationConfig::name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DestinationConfig> {
        self.destinations.iter()
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}
