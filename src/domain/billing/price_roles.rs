//! Price → entitlement role mapping.
//!
//! The table is built once at startup and shared read-only. An unknown price
//! is a normal lookup miss, not an error.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

/// Prices sold today. Every plan currently grants `premium`.
pub const BUILTIN_PRICE_ROLES: &[(&str, &str)] = &[
    ("price_1SfKHZP1mCgTuXtUMhCioSyC", "premium"),
    ("price_1SfKIFP1mCgTuXtUVMe9Vewl", "premium"),
    ("price_1SfJn1P1mCgTuXtUUrNs0bpU", "premium"),
    ("price_1SFj04P1mCgTuXtUrB6xIJ87", "premium"),
];

/// Errors loading a price table file.
#[derive(Debug, Error)]
pub enum PriceTableError {
    #[error("Failed to read price table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse price table: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Price table contains no entries")]
    Empty,

    #[error("Price {0} maps to a blank role")]
    BlankRole(String),
}

#[derive(Debug, Deserialize)]
struct PriceTableFile {
    prices: HashMap<String, String>,
}

/// Immutable price id → role lookup.
#[derive(Debug, Clone)]
pub struct PriceRoleMap {
    entries: Arc<HashMap<String, String>>,
}

impl PriceRoleMap {
    /// The compiled-in table.
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_PRICE_ROLES.iter().copied())
    }

    fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: Arc::new(
                pairs
                    .into_iter()
                    .map(|(price, role)| (price.to_string(), role.to_string()))
                    .collect(),
            ),
        }
    }

    /// Builds a table from owned entries, rejecting empty tables and blank roles.
    pub fn from_entries(entries: HashMap<String, String>) -> Result<Self, PriceTableError> {
        if entries.is_empty() {
            return Err(PriceTableError::Empty);
        }
        if let Some((price, _)) = entries.iter().find(|(_, role)| role.trim().is_empty()) {
            return Err(PriceTableError::BlankRole(price.clone()));
        }
        Ok(Self {
            entries: Arc::new(entries),
        })
    }

    /// Parses a YAML document of the form:
    ///
    /// ```yaml
    /// prices:
    ///   price_abc: premium
    ///   price_def: basic
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PriceTableError> {
        let file: PriceTableFile = serde_yaml::from_str(yaml)?;
        Self::from_entries(file.prices)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PriceTableError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| PriceTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Role granted by `price_id`, if the price is known.
    pub fn role_for(&self, price_id: &str) -> Option<&str> {
        self.entries.get(price_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PriceRoleMap {
    fn default() -> Self {
        Self::builtin()
    }
}
