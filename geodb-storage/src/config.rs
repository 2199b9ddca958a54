//! File store configuration.

use serde::{Deserialize, Serialize};

/// File name of the catalog system table inside a store directory.
pub const SYSTEM_FILE_NAME: &str = "a00000004.gdbtable";

/// Configuration for [`FileRecordStore`](crate::FileRecordStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Suffix appended to a table name to form its file name.
    /// Default: `gdbtable.json`
    pub table_extension: String,

    /// Name of the regenerated catalog system file.
    /// Default: `a00000004.gdbtable`
    pub system_file_name: String,

    /// Pretty-print table files.
    pub pretty: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            table_extension: "gdbtable.json".to_string(),
            system_file_name: SYSTEM_FILE_NAME.to_string(),
            pretty: false,
        }
    }
}

impl FileStoreConfig {
    pub fn with_table_extension(mut self, extension: impl Into<String>) -> Self {
        self.table_extension = extension.into();
        self
    }

    pub fn with_system_file_name(mut self, name: impl Into<String>) -> Self {
        self.system_file_name = name.into();
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// File name for `table`.
    pub(crate) fn table_file_name(&self, table: &str) -> String {
        format!("{}.{}", table, self.table_extension)
    }

    /// Table name for `file_name`, if it carries the table extension.
    pub(crate) fn table_name<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name
            .strip_suffix(self.table_extension.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        let config = FileStoreConfig::default();
        assert_eq!(config.table_file_name("Parcels"), "Parcels.gdbtable.json");
        assert_eq!(config.table_name("Parcels.gdbtable.json"), Some("Parcels"));
        assert_eq!(config.table_name(".gdbtable.json"), None);
        assert_eq!(config.table_name("a00000004.gdbtable"), None);
        assert_eq!(config.table_name("notes.txt"), None);
    }

    #[test]
    fn test_config_from_json() {
        let config: FileStoreConfig = serde_json::from_str(r#"{"pretty": true}"#).unwrap();
        assert!(config.pretty);
        assert_eq!(config.system_file_name, SYSTEM_FILE_NAME);
    }
}
