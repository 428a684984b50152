//! Common types, errors, and configuration for hostlink.
//!
//! This crate provides shared functionality used across the hostlink workspace:
//! - Error types using `thiserror` for type-safe error handling
//! - Configuration structures for runtime and WASI settings
//! - The TOML configuration file format used by the CLI

pub mod config;
pub mod config_file;
pub mod error;

pub use config::{EngineConfig, ExecutionConfig, RuntimeConfig, WasiConfig};
pub use config_file::{ConfigFile, ConfigFileError, LogFormat, LoggingConfig, ProgramEntry};
pub use error::{HostError, RuntimeError, WasiError};
