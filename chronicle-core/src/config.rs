//! Store configuration.

use crate::id::IdScheme;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming the data file.
pub const DATA_PATH_VAR: &str = "CHRONICLE_DATA_PATH";

/// Environment variable selecting the id scheme.
pub const ID_SCHEME_VAR: &str = "CHRONICLE_ID_SCHEME";

/// Data file used when nothing else is configured.
pub const DEFAULT_DATA_PATH: &str = "chronicle.json";

/// Errors from reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Configuration for opening a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Where `Store::open_file` keeps the document.
    pub data_path: PathBuf,

    /// How new ids are minted.
    pub id_scheme: IdScheme,

    /// Load the example dataset when storage is empty or unreadable.
    pub seed_on_empty: bool,

    /// Label shown for references that resolve to nothing.
    pub fallback_label: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            id_scheme: IdScheme::default(),
            seed_on_empty: true,
            fallback_label: "Unknown".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read overrides through `lookup`, which maps a variable name to its value.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(DATA_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }

        if let Some(scheme) = lookup(ID_SCHEME_VAR).filter(|s| !s.trim().is_empty()) {
            config.id_scheme = scheme
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    var: ID_SCHEME_VAR,
                    reason,
                })?;
        }

        Ok(config)
    }

    /// Set the data file path.
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the id scheme.
    pub fn with_id_scheme(mut self, scheme: IdScheme) -> Self {
        self.id_scheme = scheme;
        self
    }

    /// Start empty instead of seeding.
    pub fn without_seed(mut self) -> Self {
        self.seed_on_empty = false;
        self
    }

    /// Set the label for dangling references.
    pub fn with_fallback_label(mut self, label: impl Into<String>) -> Self {
        self.fallback_label = label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new();
        assert_eq!(config.data_path, PathBuf::from("chronicle.json"));
        assert_eq!(config.id_scheme, IdScheme::Timestamp);
        assert!(config.seed_on_empty);
        assert_eq!(config.fallback_label, "Unknown");
    }

    #[test]
    fn test_from_vars() {
        let config = StoreConfig::from_vars(vars(&[
            (DATA_PATH_VAR, "/var/lib/chronicle/data.json"),
            (ID_SCHEME_VAR, "uuid"),
        ]))
        .unwrap();
        assert_eq!(config.data_path, PathBuf::from("/var/lib/chronicle/data.json"));
        assert_eq!(config.id_scheme, IdScheme::Uuid);
    }

    #[test]
    fn test_blank_vars_ignored() {
        let config = StoreConfig::from_vars(vars(&[(DATA_PATH_VAR, "  ")])).unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_bad_scheme_rejected() {
        let err = StoreConfig::from_vars(vars(&[(ID_SCHEME_VAR, "snowflake")])).unwrap_err();
        assert!(err.to_string().contains(ID_SCHEME_VAR));
    }

    #[test]
    fn test_builder() {
        let config = StoreConfig::new()
            .with_data_path("campaign.json")
            .with_id_scheme(IdScheme::Uuid)
            .without_seed()
            .with_fallback_label("???");
        assert_eq!(config.data_path, PathBuf::from("campaign.json"));
        assert!(!config.seed_on_empty);
        assert_eq!(config.fallback_label, "???");
    }
}
