//! Configuration structures for hostlink.
//!
//! This module defines configuration options for various components:
//! - [`RuntimeConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Wasmtime engine settings
//! - [`ExecutionConfig`]: Per-run execution limits (fuel, timeout, entry point)
//! - [`WasiConfig`]: What the WASI host exposes to a guest

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
///
/// This structure contains all configuration options for running a guest.
/// It can be loaded from TOML or JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Wasmtime engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-run execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// WASI host configuration.
    #[serde(default)]
    pub wasi: WasiConfig,
}

/// Wasmtime engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Enable pooling allocator for instance creation.
    ///
    /// Off by default: a single program run gains nothing from
    /// pre-reserving a pool of instance slots.
    #[serde(default = "defaults::pooling_allocator")]
    pub pooling_allocator: bool,

    /// Maximum concurrent instances in the pool.
    ///
    /// Only effective when `pooling_allocator` is enabled.
    #[serde(default = "defaults::max_instances")]
    pub max_instances: u32,

    /// Memory per instance slot in megabytes.
    #[serde(default = "defaults::instance_memory_mb")]
    pub instance_memory_mb: u32,

    /// Enable epoch-based interruption.
    ///
    /// The runner ticks the epoch once per millisecond, so
    /// `execution.timeout_ms` becomes a wall-clock limit.
    #[serde(default = "defaults::epoch_interruption")]
    pub epoch_interruption: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pooling_allocator: defaults::pooling_allocator(),
            max_instances: defaults::max_instances(),
            instance_memory_mb: defaults::instance_memory_mb(),
            epoch_interruption: defaults::epoch_interruption(),
        }
    }
}

/// Per-run execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Maximum fuel (CPU instructions) per run.
    #[serde(default = "defaults::max_fuel")]
    pub max_fuel: u64,

    /// Execution timeout in milliseconds.
    #[serde(default = "defaults::timeout_ms")]
    pub timeout_ms: u64,

    /// Enable fuel metering.
    #[serde(default = "defaults::fuel_metering")]
    pub fuel_metering: bool,

    /// Exported function to run.
    #[serde(default = "defaults::entry_point")]
    pub entry_point: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_fuel: defaults::max_fuel(),
            timeout_ms: defaults::timeout_ms(),
            fuel_metering: defaults::fuel_metering(),
            entry_point: defaults::entry_point(),
        }
    }
}

impl ExecutionConfig {
    /// Get the timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// WASI host configuration.
///
/// A guest sees nothing of the host file system except `preopen_dir`,
/// mounted at `guest_dir`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WasiConfig {
    /// Forward guest stdout to the process stdout.
    ///
    /// When disabled, stdout is captured in memory and returned with
    /// the run result.
    #[serde(default = "defaults::inherit_stdout")]
    pub inherit_stdout: bool,

    /// Capacity of the in-memory stdout capture in bytes.
    #[serde(default = "defaults::stdout_capacity")]
    pub stdout_capacity: usize,

    /// Host directory exposed to the guest.
    #[serde(default = "defaults::preopen_dir")]
    pub preopen_dir: Option<String>,

    /// Path under which the guest sees `preopen_dir`.
    #[serde(default = "defaults::guest_dir")]
    pub guest_dir: String,

    /// Expose `preopen_dir` without write permissions.
    #[serde(default)]
    pub read_only: bool,

    /// Arguments passed to the guest (`argv[1..]`).
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for WasiConfig {
    fn default() -> Self {
        Self {
            inherit_stdout: defaults::inherit_stdout(),
            stdout_capacity: defaults::stdout_capacity(),
            preopen_dir: defaults::preopen_dir(),
            guest_dir: defaults::guest_dir(),
            read_only: false,
            args: Vec::new(),
        }
    }
}

/// Default value functions for serde.
mod defaults {
    pub const fn pooling_allocator() -> bool {
        false
    }

    pub const fn max_instances() -> u32 {
        16
    }

    pub const fn instance_memory_mb() -> u32 {
        64
    }

    pub const fn epoch_interruption() -> bool {
        true
    }

    pub const fn max_fuel() -> u64 {
        100_000_000
    }

    pub const fn timeout_ms() -> u64 {
        5_000
    }

    pub const fn fuel_metering() -> bool {
        true
    }

    pub fn entry_point() -> String {
        "_start".to_string()
    }

    pub const fn inherit_stdout() -> bool {
        true
    }

    pub const fn stdout_capacity() -> usize {
        64 * 1024
    }

    #[allow(clippy::unnecessary_wraps)]
    pub fn preopen_dir() -> Option<String> {
        Some(".".to_string())
    }

    pub fn guest_dir() -> String {
        ".".to_string()
    }
}
