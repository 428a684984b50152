//! Per-run execution context and store management.
//!
//! This module provides:
//! - [`WorkerContext`]: Per-run state reachable from host functions
//! - [`ExecutionMetrics`]: Fuel, host call count and duration of a run
//! - [`create_store`]: A fresh [`Store`] with fuel and deadline applied

use std::time::{Duration, Instant};

use tracing::debug;
use wasmtime::Store;
use wasmtime_wasi::pipe::MemoryOutputPipe;
use wasmtime_wasi::preview1::WasiP1Ctx;
use wasmtime_wasi::{DirPerms, FilePerms, WasiCtxBuilder};

use crate::WasmEngine;
use hostlink_bindings::{DomHost, HostValue, RefTable};
use hostlink_common::{RuntimeConfig, RuntimeError, WasiConfig, WasiError};

/// Per-run execution context.
///
/// Holds everything a single guest run can reach through its imports: the
/// WASI preview 1 context, the page it manipulates and the table of
/// references it holds into that page. Created for each run and dropped
/// with the store.
pub struct WorkerContext {
    wasi: WasiP1Ctx,

    /// Page the `hostlink` imports operate on.
    pub dom: DomHost,

    /// References handed to the guest. Slot 0 is the window.
    pub refs: RefTable,

    /// Unique run identifier for tracing.
    pub run_id: String,

    /// Captured guest stdout, when not inherited.
    stdout: Option<MemoryOutputPipe>,

    pub metrics: ExecutionMetrics,

    start_time: Instant,
}

/// Execution metrics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionMetrics {
    /// Fuel consumed during execution.
    pub fuel_consumed: u64,

    /// Number of `hostlink` imports the guest called.
    pub host_calls: u64,

    /// Total execution duration.
    pub duration: Option<Duration>,
}

impl WorkerContext {
    /// Create a new context for one run.
    ///
    /// # Errors
    ///
    /// Returns [`WasiError::InitializationFailed`] if the pre-opened
    /// directory cannot be opened.
    pub fn new(config: &WasiConfig, run_id: String) -> Result<Self, WasiError> {
        let mut builder = WasiCtxBuilder::new();
        builder.inherit_stderr();

        let stdout = if config.inherit_stdout {
            builder.inherit_stdout();
            None
        } else {
            let pipe = MemoryOutputPipe::new(config.stdout_capacity);
            builder.stdout(pipe.clone());
            Some(pipe)
        };

        if !config.args.is_empty() {
            builder.args(config.args.as_slice());
        }

        if let Some(dir) = &config.preopen_dir {
            let (dir_perms, file_perms) = if config.read_only {
                (DirPerms::READ, FilePerms::READ)
            } else {
                (DirPerms::all(), FilePerms::all())
            };

            builder
                .preopened_dir(dir, &config.guest_dir, dir_perms, file_perms)
                .map_err(|e| WasiError::InitializationFailed {
                    reason: format!("cannot pre-open {dir}: {e}"),
                })?;

            debug!(
                host_dir = %dir,
                guest_dir = %config.guest_dir,
                read_only = config.read_only,
                "Directory pre-opened"
            );
        }

        let dom = DomHost::new();
        let refs = RefTable::with_pinned([HostValue::Object(dom.window())]);

        Ok(Self {
            wasi: builder.build_p1(),
            dom,
            refs,
            run_id,
            stdout,
            metrics: ExecutionMetrics::default(),
            start_time: Instant::now(),
        })
    }

    /// WASI context, as handed to the preview 1 linker.
    pub fn wasi_mut(&mut self) -> &mut WasiP1Ctx {
        &mut self.wasi
    }

    /// Bytes the guest wrote to stdout, if stdout is captured.
    pub fn stdout(&self) -> Option<Vec<u8>> {
        self.stdout.as_ref().map(|pipe| pipe.contents().to_vec())
    }

    /// Finalize metrics after execution.
    pub fn finalize_metrics(&mut self) {
        self.metrics.duration = Some(self.start_time.elapsed());
    }
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("run_id", &self.run_id)
            .field("refs", &self.refs.len())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// Create a new Wasmtime store for one run.
///
/// Fuel is set when metering is on; with epoch interruption the deadline is
/// `timeout_ms` ticks ahead of the current epoch.
///
/// # Errors
///
/// Returns an error if the WASI context cannot be built or fuel cannot be
/// set on the store.
pub fn create_store(
    engine: &WasmEngine,
    config: &RuntimeConfig,
    run_id: String,
) -> Result<Store<WorkerContext>, RuntimeError> {
    let context = WorkerContext::new(&config.wasi, run_id)?;
    let mut store = Store::new(engine.inner(), context);

    if config.execution.fuel_metering {
        store
            .set_fuel(config.execution.max_fuel)
            .map_err(|e| RuntimeError::invalid_config(format!("Failed to set fuel: {e}")))?;
    } else {
        // The engine always meters fuel; unmetered runs get the maximum
        store
            .set_fuel(u64::MAX)
            .map_err(|e| RuntimeError::invalid_config(format!("Failed to set fuel: {e}")))?;
    }

    if engine.config().epoch_interruption {
        store.set_epoch_deadline(config.execution.timeout_ms);
    }

    Ok(store)
}

/// Get remaining fuel from a store.
pub fn get_remaining_fuel(store: &Store<WorkerContext>) -> Option<u64> {
    store.get_fuel().ok()
}

/// Calculate fuel consumed.
pub fn calculate_fuel_consumed(initial_fuel: u64, store: &Store<WorkerContext>) -> u64 {
    let remaining = get_remaining_fuel(store).unwrap_or(0);
    initial_fuel.saturating_sub(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlink_bindings::Host;
    use hostlink_common::{EngineConfig, ExecutionConfig};

    fn captured() -> WasiConfig {
        WasiConfig {
            inherit_stdout: false,
            preopen_dir: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_worker_context_creation() {
        let ctx = WorkerContext::new(&captured(), "test-run-123".into()).unwrap();

        assert_eq!(ctx.run_id, "test-run-123");
        assert_eq!(ctx.metrics.fuel_consumed, 0);
        assert_eq!(ctx.stdout(), Some(Vec::new()));
    }

    #[test]
    fn test_window_is_pinned_at_zero() {
        let mut ctx = WorkerContext::new(&captured(), "test".into()).unwrap();

        assert_eq!(
            ctx.refs.get(0).unwrap(),
            &HostValue::Object(ctx.dom.global())
        );
        assert!(!ctx.refs.release(0));
        assert_eq!(ctx.refs.len(), 1);
    }

    #[test]
    fn test_inherited_stdout_is_not_captured() {
        let config = WasiConfig {
            inherit_stdout: true,
            preopen_dir: None,
            ..Default::default()
        };
        let ctx = WorkerContext::new(&config, "test".into()).unwrap();

        assert_eq!(ctx.stdout(), None);
    }

    #[test]
    fn test_missing_preopen_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = WasiConfig {
            preopen_dir: Some(dir.path().join("absent").display().to_string()),
            ..captured()
        };

        let err = WorkerContext::new(&config, "test".into()).unwrap_err();
        assert!(matches!(err, WasiError::InitializationFailed { .. }));
    }

    #[test]
    fn test_store_creation() {
        let engine = WasmEngine::new(&EngineConfig::default()).unwrap();
        let config = RuntimeConfig {
            wasi: captured(),
            ..Default::default()
        };

        let store = create_store(&engine, &config, "test-123".into());
        assert!(store.is_ok());
    }

    #[test]
    fn test_store_fuel() {
        let engine = WasmEngine::new(&EngineConfig::default()).unwrap();
        let config = RuntimeConfig {
            execution: ExecutionConfig {
                max_fuel: 1000,
                fuel_metering: true,
                ..Default::default()
            },
            wasi: captured(),
            ..Default::default()
        };

        let store = create_store(&engine, &config, "test".into()).unwrap();

        assert_eq!(get_remaining_fuel(&store), Some(1000));
    }
}
