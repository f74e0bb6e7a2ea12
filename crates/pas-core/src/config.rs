//! Configuration for a [`crate::Pas`] instance.
//!
//! Provides `pas.toml` file support, `PAS_*` environment variable overrides,
//! and runtime defaults, layered with `figment` the same way the rest of
//! this family of crates loads configuration.
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`PAS_*`)
//! 2. Configuration file (`pas.toml`)
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Initial size of the data area for a freshly created image, in bytes.
pub const DEFAULT_INITIAL_DATA_SIZE: u64 = 10 * 1024;
/// Initial capacity of the slot map, in entries.
pub const DEFAULT_INITIAL_SLOT_CAPACITY: u64 = 16;
/// Initial capacity of the type vector, in entries.
pub const DEFAULT_INITIAL_TYPE_CAPACITY: u64 = 16;
/// Initial capacity of the name map, in entries.
pub const DEFAULT_INITIAL_NAME_CAPACITY: u64 = 16;
/// Initial capacity of the free list, in entries.
pub const DEFAULT_INITIAL_FREE_CAPACITY: u64 = 16;
/// Maximum length of a stored type identifier, including the terminator.
pub const TYPE_ID_SIZE: usize = 64;
/// Maximum length of a stored object name, including the terminator.
pub const NAME_SIZE: usize = 64;

/// Configuration governing the size and growth of a [`crate::Pas`] image.
///
/// `PasConfig::default()` reproduces every constant documented for the
/// allocator; the fields only need overriding in tests that want to
/// exercise growth/reuse behavior on a smaller image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasConfig {
    /// Initial size of the data area, in bytes. Doubles on overflow.
    pub initial_data_size: u64,
    /// Initial capacity of the slot map.
    pub initial_slot_capacity: u64,
    /// Initial capacity of the type vector.
    pub initial_type_capacity: u64,
    /// Initial capacity of the name map.
    pub initial_name_capacity: u64,
    /// Initial capacity of the free list.
    pub initial_free_capacity: u64,
}

impl Default for PasConfig {
    fn default() -> Self {
        Self {
            initial_data_size: DEFAULT_INITIAL_DATA_SIZE,
            initial_slot_capacity: DEFAULT_INITIAL_SLOT_CAPACITY,
            initial_type_capacity: DEFAULT_INITIAL_TYPE_CAPACITY,
            initial_name_capacity: DEFAULT_INITIAL_NAME_CAPACITY,
            initial_free_capacity: DEFAULT_INITIAL_FREE_CAPACITY,
        }
    }
}

impl PasConfig {
    /// Loads configuration from `pas.toml` in the current directory, merged
    /// with any `PAS_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or environment values fail to parse.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("pas.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or environment values fail to parse.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("PAS_"));

        figment
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any capacity is zero, which would leave the
    /// first allocation with no array to grow into.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&str, u64); 5] = [
            ("initial_data_size", self.initial_data_size),
            ("initial_slot_capacity", self.initial_slot_capacity),
            ("initial_type_capacity", self.initial_type_capacity),
            ("initial_name_capacity", self.initial_name_capacity),
            ("initial_free_capacity", self.initial_free_capacity),
        ];
        for (key, value) in checks {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_constants() {
        let cfg = PasConfig::default();
        assert_eq!(cfg.initial_data_size, 10 * 1024);
        assert_eq!(cfg.initial_slot_capacity, 16);
        assert_eq!(cfg.initial_type_capacity, 16);
        assert_eq!(cfg.initial_name_capacity, 16);
        assert_eq!(cfg.initial_free_capacity, 16);
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut cfg = PasConfig::default();
        cfg.initial_slot_capacity = 0;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn from_toml_overrides_defaults() {
        let figment = Figment::new()
            .merge(Serialized::defaults(PasConfig::default()))
            .merge(Toml::string("initial_data_size = 4096"));
        let cfg: PasConfig = figment.extract().unwrap();
        assert_eq!(cfg.initial_data_size, 4096);
        assert_eq!(cfg.initial_slot_capacity, 16);
    }
}
