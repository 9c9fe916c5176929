//! Compiler configuration (`nevec.toml`)
//!
//! ```toml
//! [compile]
//! optimize = true
//! registers = 16
//! max_sweeps = 10
//! debug_graph = false
//! debug_info = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::error::CompileError;

/// Default physical register palette size
pub const DEFAULT_REGISTERS: u8 = 16;

/// Largest palette size; the three registers above it are spill scratch
pub const MAX_REGISTERS: u8 = 253;

/// Default cap on optimizer sweeps
pub const DEFAULT_MAX_SWEEPS: usize = 10;

/// Errors that can occur while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed but out of range
    #[error("Invalid config: {0}")]
    Invalid(#[from] CompileError),
}

/// Options controlling one compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Run the optional optimization passes
    pub optimize: bool,
    /// Physical register palette size (K)
    pub registers: u8,
    /// Optimizer sweep cap
    pub max_sweeps: usize,
    /// Surface the interference graph for inspection
    pub debug_graph: bool,
    /// Emit a per-instruction line table
    pub debug_info: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            registers: DEFAULT_REGISTERS,
            max_sweeps: DEFAULT_MAX_SWEEPS,
            debug_graph: false,
            debug_info: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    compile: CompileOptions,
}

impl CompileOptions {
    /// Options with every optional pass disabled
    pub fn unoptimized() -> Self {
        Self {
            optimize: false,
            ..Self::default()
        }
    }

    /// Load options from a `nevec.toml` file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from the contents of a `nevec.toml` file
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.compile.validate()?;
        Ok(file.compile)
    }

    /// Check that every option is in range
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.registers == 0 || self.registers > MAX_REGISTERS {
            return Err(CompileError::InvalidConfig {
                message: format!(
                    "registers must be between 1 and {}, got {}",
                    MAX_REGISTERS, self.registers
                ),
            });
        }
        if self.max_sweeps == 0 {
            return Err(CompileError::InvalidConfig {
                message: "max_sweeps must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompileOptions::default();
        assert!(options.optimize);
        assert_eq!(options.registers, 16);
        assert_eq!(options.max_sweeps, 10);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let options = CompileOptions::from_toml("[compile]\nregisters = 4\n").unwrap();
        assert_eq!(options.registers, 4);
        assert!(options.optimize);
        assert!(options.debug_info);
    }

    #[test]
    fn test_empty_file() {
        let options = CompileOptions::from_toml("").unwrap();
        assert_eq!(options, CompileOptions::default());
    }

    #[test]
    fn test_out_of_range_registers() {
        assert!(matches!(
            CompileOptions::from_toml("[compile]\nregisters = 0\n"),
            Err(ConfigError::Invalid(CompileError::InvalidConfig { .. }))
        ));
        assert!(matches!(
            CompileOptions::from_toml("[compile]\nregisters = 254\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            CompileOptions::from_toml("[compile\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
