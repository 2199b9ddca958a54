//! Catalog scan configuration.

use geodb_storage::SYSTEM_FILE_NAME;
use serde::{Deserialize, Serialize};

/// Root elements collected by `get_info`, in scan order.
pub const DEFAULT_ROOT_ELEMENTS: &[&str] = &[
    "DEFeatureClassInfo",
    "DEFeatureDataset",
    "DERasterDataset",
    "DETableInfo",
    "DEWorkspace",
    "ESRI_ItemInformation",
    "metadata",
    "typens:DEFeatureClassInfo",
    "typens:DEFeatureDataset",
    "typens:DERasterDataset",
    "typens:DETableInfo",
    "typens:DEWorkspace",
    "typens:ESRI_ItemInformation",
    "typens:metadata",
];

/// Configuration for [`CatalogIndex`](crate::CatalogIndex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// System table file name inside the store.
    pub system_file_name: String,

    /// Root element names `get_info` looks for.
    pub root_elements: Vec<String>,

    /// Fail `get_info` on the first malformed fragment instead of skipping it.
    pub strict_metadata: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            system_file_name: SYSTEM_FILE_NAME.to_string(),
            root_elements: DEFAULT_ROOT_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            strict_metadata: false,
        }
    }
}

impl CatalogConfig {
    pub fn with_system_file_name(mut self, name: impl Into<String>) -> Self {
        self.system_file_name = name.into();
        self
    }

    pub fn with_root_elements<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.root_elements = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strict_metadata(mut self, strict: bool) -> Self {
        self.strict_metadata = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.system_file_name, "a00000004.gdbtable");
        assert_eq!(config.root_elements.len(), 14);
        assert!(!config.strict_metadata);
    }

    #[test]
    fn test_partial_json() {
        let config: CatalogConfig =
            serde_json::from_str(r#"{"strict_metadata": true, "root_elements": ["metadata"]}"#)
                .unwrap();
        assert!(config.strict_metadata);
        assert_eq!(config.root_elements, vec!["metadata".to_string()]);
        assert_eq!(config.system_file_name, SYSTEM_FILE_NAME);
    }
}
