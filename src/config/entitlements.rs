//! Price-to-role table configuration

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::billing::{PriceRoleMap, PriceTableError};

/// Entitlement configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitlementsConfig {
    /// YAML file with a `prices:` map; the built-in table is used when unset
    pub price_roles_path: Option<PathBuf>,
}

impl EntitlementsConfig {
    /// Load the price-to-role table
    pub fn load_price_roles(&self) -> Result<PriceRoleMap, PriceTableError> {
        match &self.price_roles_path {
            Some(path) => PriceRoleMap::from_yaml_file(path),
            None => Ok(PriceRoleMap::builtin()),
        }
    }
}
