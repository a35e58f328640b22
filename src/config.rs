//! Machine configuration.
//!
//! A [`MachineConfig`] fixes the tape geometry and arithmetic policy for an
//! [`Engine`](crate::vm::Engine). The defaults describe the paged 4096-cell
//! machine; [`MachineConfig::legacy`] reproduces the original 256-cell tape
//! whose cells rejected out-of-range values instead of wrapping.

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of cells on the default tape.
pub const TAPE_SIZE: usize = 4096;

/// Number of cells on the legacy, unpaged tape.
pub const LEGACY_TAPE_SIZE: usize = 256;

/// Size of one addressing page.
pub const PAGE_SIZE: usize = 256;

/// Largest capacity the paging scheme can address: operand 255 on page 255.
pub const MAX_TAPE_SIZE: usize = PAGE_SIZE * PAGE_SIZE;

/// How out-of-range results are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the low bytes (two's-complement wraparound).
    #[default]
    Wrap,
    /// Fail the write with an overflow fault, and fail inexact division.
    Trap,
}

/// Tape geometry and run limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Number of byte cells on the tape.
    pub capacity: usize,
    /// Overflow handling for writes and division.
    pub overflow: OverflowPolicy,
    /// Address of the first instruction.
    pub entry: usize,
    /// Stop after this many instructions, if set.
    pub max_steps: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            capacity: TAPE_SIZE,
            overflow: OverflowPolicy::Wrap,
            entry: 0,
            max_steps: None,
        }
    }
}

impl MachineConfig {
    /// The original 256-cell trapping machine.
    pub fn legacy() -> Self {
        Self {
            capacity: LEGACY_TAPE_SIZE,
            overflow: OverflowPolicy::Trap,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json(&text)
    }

    /// Check that the geometry is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < 4 {
            return Err(ConfigError::Invalid(format!(
                "capacity {} cannot hold a single row",
                self.capacity
            )));
        }
        if self.capacity > MAX_TAPE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "capacity {} exceeds the addressable {} cells",
                self.capacity, MAX_TAPE_SIZE
            )));
        }
        if self.entry >= self.capacity {
            return Err(ConfigError::Invalid(format!(
                "entry point {} is outside the tape (0-{})",
                self.entry,
                self.capacity - 1
            )));
        }
        Ok(())
    }
}

/// Errors produced while loading a configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid configuration file: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MachineConfig::default();
        assert_eq!(config.capacity, 4096);
        assert_eq!(config.overflow, OverflowPolicy::Wrap);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_profile() {
        let config = MachineConfig::legacy();
        assert_eq!(config.capacity, 256);
        assert_eq!(config.overflow, OverflowPolicy::Trap);
    }

    #[test]
    fn test_from_json_partial() {
        let config = MachineConfig::from_json(r#"{ "overflow": "trap", "max_steps": 100 }"#).unwrap();
        assert_eq!(config.capacity, TAPE_SIZE);
        assert_eq!(config.overflow, OverflowPolicy::Trap);
        assert_eq!(config.max_steps, Some(100));
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let err = MachineConfig::from_json(r#"{ "speed": 3 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate() {
        let tiny = MachineConfig { capacity: 2, ..MachineConfig::default() };
        assert!(tiny.validate().is_err());

        let huge = MachineConfig { capacity: MAX_TAPE_SIZE + 1, ..MachineConfig::default() };
        assert!(huge.validate().is_err());

        let bad_entry = MachineConfig { entry: 256, ..MachineConfig::legacy() };
        assert!(bad_entry.validate().is_err());
    }
}
