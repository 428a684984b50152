//! Configuration file structures for hostlink.
//!
//! This module defines structures for TOML configuration files:
//! - [`ConfigFile`]: Top-level configuration file structure
//! - [`LoggingConfig`]: Log output settings
//! - [`ProgramEntry`]: A named guest module that `hostlink run` can start by id

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::RuntimeConfig;

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [runtime.execution]
/// max_fuel = 10_000_000
/// timeout_ms = 100
///
/// [runtime.wasi]
/// inherit_stdout = false
/// preopen_dir = "./out"
///
/// [logging]
/// format = "json"
///
/// [[programs]]
/// id = "wasi-log"
/// path = "./demos/wasi_log.wasm"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Runtime configuration (engine + execution + WASI settings).
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Guest programs addressable by id.
    #[serde(default)]
    pub programs: Vec<ProgramEntry>,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigFileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })
    }

    /// Look up a program entry by id.
    pub fn program(&self, id: &str) -> Option<&ProgramEntry> {
        self.programs.iter().find(|p| p.id == id)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

/// A guest program entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgramEntry {
    /// Unique identifier for the program.
    pub id: String,

    /// Path to the WebAssembly module (`.wasm` or `.wat`).
    pub path: String,

    /// Entry point override for this program.
    #[serde(default)]
    pub entry_point: Option<String>,
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();

        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.logging.filter.is_none());
        assert!(config.programs.is_empty());
        assert_eq!(config.runtime.execution.entry_point, "_start");
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [runtime.wasi]
            inherit_stdout = false
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert!(!config.runtime.wasi.inherit_stdout);
        // Defaults applied
        assert_eq!(config.runtime.wasi.guest_dir, ".");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [runtime.engine]
            pooling_allocator = true
            max_instances = 4

            [runtime.execution]
            max_fuel = 5_000_000
            timeout_ms = 50
            entry_point = "main"

            [runtime.wasi]
            inherit_stdout = false
            preopen_dir = "/tmp/out"
            read_only = true
            args = ["--verbose"]

            [logging]
            format = "json"
            filter = "warn"

            [[programs]]
            id = "dom-facade"
            path = "./dom_facade.wasm"

            [[programs]]
            id = "wasi-log"
            path = "./wasi_log.wasm"
            entry_point = "_start"
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert!(config.runtime.engine.pooling_allocator);
        assert_eq!(config.runtime.engine.max_instances, 4);
        assert_eq!(config.runtime.execution.max_fuel, 5_000_000);
        assert_eq!(config.runtime.execution.entry_point, "main");
        assert_eq!(config.runtime.wasi.preopen_dir.as_deref(), Some("/tmp/out"));
        assert!(config.runtime.wasi.read_only);
        assert_eq!(config.runtime.wasi.args, vec!["--verbose".to_string()]);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter.as_deref(), Some("warn"));
        assert_eq!(config.programs.len(), 2);
        assert_eq!(config.programs[0].id, "dom-facade");
        assert!(config.programs[0].entry_point.is_none());
        assert_eq!(config.programs[1].entry_point.as_deref(), Some("_start"));
    }

    #[test]
    fn test_program_lookup() {
        let toml = r#"
            [[programs]]
            id = "dom-raw"
            path = "./dom_raw.wasm"
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert_eq!(config.program("dom-raw").unwrap().path, "./dom_raw.wasm");
        assert!(config.program("missing").is_none());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let invalid = "this is not valid toml [";
        let result = ConfigFile::from_toml(invalid);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_missing_file() {
        let result = ConfigFile::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigFileError::Io { .. })));
    }
}
