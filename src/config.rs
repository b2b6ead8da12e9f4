//! Database configuration

use crate::persistence::{PersistenceError, PersistenceResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for opening a [`GraphDatabase`](crate::GraphDatabase)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory for persisted databases (None = in-memory only)
    pub data_path: Option<PathBuf>,
    /// Database selected when the handle is opened
    pub default_database: String,
    /// Write indented JSON files
    pub pretty: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            default_database: "default".to_string(),
            pretty: true,
        }
    }
}

impl DatabaseConfig {
    /// In-memory configuration; `save` is a no-op
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed configuration rooted at `path`
    pub fn with_data_path(path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn default_database(mut self, name: impl Into<String>) -> Self {
        self.default_database = name.into();
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.data_path.is_some()
    }

    /// Parse a YAML document; missing keys take their defaults
    pub fn from_yaml_str(yaml: &str) -> PersistenceResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(PersistenceError::Io)?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.data_path, None);
        assert_eq!(config.default_database, "default");
        assert!(config.pretty);
        assert!(!config.is_persistent());
    }

    #[test]
    fn test_builder() {
        let config = DatabaseConfig::with_data_path("/tmp/graphs")
            .default_database("social")
            .pretty(false);
        assert_eq!(config.data_path, Some(PathBuf::from("/tmp/graphs")));
        assert_eq!(config.default_database, "social");
        assert!(!config.pretty);
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = DatabaseConfig::from_yaml_str("data_path: ./data\n").unwrap();
        assert_eq!(config.data_path, Some(PathBuf::from("./data")));
        assert_eq!(config.default_database, "default");
        assert!(config.pretty);
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = "data_path: /var/lib/coffy\ndefault_database: movies\npretty: false\n";
        let config = DatabaseConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.default_database, "movies");
        assert!(!config.pretty);
    }

    #[test]
    fn test_from_yaml_rejects_bad_type() {
        let result = DatabaseConfig::from_yaml_str("pretty: [1, 2]\n");
        assert!(matches!(result, Err(PersistenceError::Yaml(_))));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("coffy.yaml");
        std::fs::write(&path, "default_database: graph1\n").unwrap();
        let config = DatabaseConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.default_database, "graph1");
    }
}
