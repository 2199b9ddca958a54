//! GeoDatabase configuration.
//!
//! Loadable from JSON; every field has a default, so a partial document
//! overrides only what it names:
//!
//! ```json
//! { "enforce_crs": false, "catalog": { "strict_metadata": true } }
//! ```

use geodb_catalog::CatalogConfig;
use geodb_storage::FileStoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Configuration for [`GeoDatabase`](crate::GeoDatabase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoDbConfig {
    /// Catalog scan settings used by `open`.
    pub catalog: CatalogConfig,

    /// Settings for the default file record store.
    pub store: FileStoreConfig,

    /// Enforce CRS on named datasets discovered by `open`.
    /// The root dataset never enforces.
    /// Default: true
    pub enforce_crs: bool,

    /// Suffix `save` appends to a store path that lacks it.
    /// Default: `.gdb`
    pub store_suffix: String,

    /// Passed to the record store on every write.
    /// Default: true
    pub compatibility: bool,

    /// Passed to the record store on every write.
    pub reindex: bool,
}

impl Default for GeoDbConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            store: FileStoreConfig::default(),
            enforce_crs: true,
            store_suffix: ".gdb".to_string(),
            compatibility: true,
            reindex: false,
        }
    }
}

impl GeoDbConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GeoDbConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.system_file_name.is_empty() {
            return Err(ApiError::config("catalog.system_file_name must not be empty"));
        }
        if self.catalog.system_file_name != self.store.system_file_name {
            return Err(ApiError::config(format!(
                "catalog reads '{}' but the store writes '{}'",
                self.catalog.system_file_name, self.store.system_file_name
            )));
        }
        Ok(())
    }

    pub fn with_catalog(mut self, catalog: CatalogConfig) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_store(mut self, store: FileStoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_enforce_crs(mut self, enforce: bool) -> Self {
        self.enforce_crs = enforce;
        self
    }

    pub fn with_store_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.store_suffix = suffix.into();
        self
    }

    pub fn with_compatibility(mut self, compatibility: bool) -> Self {
        self.compatibility = compatibility;
        self
    }

    pub fn with_reindex(mut self, reindex: bool) -> Self {
        self.reindex = reindex;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            GeoDbConfig::from_json(r#"{"enforce_crs": false, "catalog": {"strict_metadata": true}}"#)
                .unwrap();
        assert!(!config.enforce_crs);
        assert!(config.catalog.strict_metadata);
        assert_eq!(config.store_suffix, ".gdb");
        assert!(config.compatibility);
    }

    #[test]
    fn test_mismatched_system_file_rejected() {
        let err = GeoDbConfig::from_json(r#"{"catalog": {"system_file_name": "other.bin"}}"#)
            .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn test_builders() {
        let config = GeoDbConfig::default()
            .with_store_suffix(".store")
            .with_reindex(true);
        assert_eq!(config.store_suffix, ".store");
        assert!(config.reindex);
        assert!(config.validate().is_ok());
    }
}
