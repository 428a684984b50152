//! Guest instance lifecycle.
//!
//! [`InstanceRunner`] executes a guest in four steps:
//!
//! 1. Instantiate the module against the linker's host functions
//! 2. Look up the entry point
//! 3. Run it under the store's fuel and epoch limits
//! 4. Classify the outcome and record metrics

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};
use wasmtime::{Engine, Linker, Store, Trap};
use wasmtime_wasi::I32Exit;

use crate::CompiledModule;
use crate::store::{WorkerContext, calculate_fuel_consumed, get_remaining_fuel};
use hostlink_common::RuntimeError;

/// Outcome of running a guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The entry point returned, or the guest called `proc_exit(0)`.
    Success,

    /// The guest called `proc_exit` with a non-zero status.
    Exit {
        code: i32,
    },

    /// Execution stopped with a trap.
    Trap {
        /// Description of the trap.
        message: String,
        /// Trap code if available.
        code: Option<String>,
    },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success)
    }

    pub fn is_trap(&self) -> bool {
        matches!(self, ExecutionResult::Trap { .. })
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecutionResult::Success => 0,
            ExecutionResult::Exit { code } => *code,
            ExecutionResult::Trap { .. } => 1,
        }
    }
}

/// Instance lifecycle manager.
///
/// Holds the linker shared by every run; each execution brings its own
/// [`Store`].
pub struct InstanceRunner {
    engine: Arc<Engine>,
    linker: Linker<WorkerContext>,
}

impl InstanceRunner {
    pub fn new(engine: Arc<Engine>) -> Self {
        let linker = Linker::new(&engine);
        Self { engine, linker }
    }

    /// Linker to register host functions on before the first run.
    pub fn linker_mut(&mut self) -> &mut Linker<WorkerContext> {
        &mut self.linker
    }

    /// Execute a core WebAssembly module.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Instantiation fails (for example an unresolved import)
    /// - The entry point is not exported
    /// - Fuel is exhausted
    #[instrument(
        skip(self, module, store),
        fields(entry_point = %entry_point, run_id = %store.data().run_id)
    )]
    pub async fn execute_core(
        &self,
        module: &CompiledModule,
        store: &mut Store<WorkerContext>,
        entry_point: &str,
    ) -> Result<ExecutionResult, RuntimeError> {
        let start = Instant::now();
        let initial_fuel = get_remaining_fuel(store).unwrap_or(0);

        debug!(content_hash = %module.content_hash(), "Instantiating core module");

        let instance = self
            .linker
            .instantiate_async(&mut *store, module.as_core_module())
            .await
            .map_err(|e| RuntimeError::compilation_failed(format!("Instantiation failed: {e}")))?;

        let func = instance
            .get_typed_func::<(), ()>(&mut *store, entry_point)
            .map_err(|_| {
                RuntimeError::module_not_found(format!("Entry point '{entry_point}' not found"))
            })?;

        debug!("Executing entry point");

        let result = func.call_async(&mut *store, ()).await;

        let fuel_consumed = calculate_fuel_consumed(initial_fuel, store);
        store.data_mut().metrics.fuel_consumed = fuel_consumed;
        store.data_mut().finalize_metrics();

        let duration = start.elapsed();
        let host_calls = store.data().metrics.host_calls;

        let err = match result {
            Ok(()) => {
                info!(
                    duration_ms = duration.as_millis(),
                    fuel_consumed = fuel_consumed,
                    host_calls = host_calls,
                    "Execution completed successfully"
                );
                return Ok(ExecutionResult::Success);
            }
            Err(err) => err,
        };

        if let Some(exit) = err.downcast_ref::<I32Exit>() {
            let code = exit.0;
            info!(
                duration_ms = duration.as_millis(),
                fuel_consumed = fuel_consumed,
                exit_code = code,
                "Guest exited"
            );
            return Ok(if code == 0 {
                ExecutionResult::Success
            } else {
                ExecutionResult::Exit { code }
            });
        }

        if is_out_of_fuel(&err) {
            warn!(
                duration_ms = duration.as_millis(),
                fuel_consumed = fuel_consumed,
                "Execution terminated: fuel exhausted"
            );
            return Err(RuntimeError::FuelExhausted);
        }

        let (message, code) = extract_trap_info(&err);

        error!(
            duration_ms = duration.as_millis(),
            fuel_consumed = fuel_consumed,
            trap_message = %message,
            "Execution trapped"
        );

        Ok(ExecutionResult::Trap { message, code })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

/// Extract human-readable trap information.
fn extract_trap_info(error: &wasmtime::Error) -> (String, Option<String>) {
    let message = format!("{error:#}");
    let code = error.downcast_ref::<Trap>().map(|trap| format!("{trap:?}"));

    (message, code)
}

fn is_out_of_fuel(error: &wasmtime::Error) -> bool {
    error
        .downcast_ref::<Trap>()
        .is_some_and(|trap| *trap == Trap::OutOfFuel)
}

impl std::fmt::Debug for InstanceRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRunner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WasmEngine, create_store};
    use hostlink_common::{EngineConfig, RuntimeConfig, WasiConfig};

    #[test]
    fn test_execute_without_host_functions() {
        let engine = WasmEngine::new(&EngineConfig {
            epoch_interruption: false,
            ..Default::default()
        })
        .unwrap();
        let runner = InstanceRunner::new(engine.shared());
        let module = CompiledModule::from_wat(
            engine.inner(),
            r#"(module (func (export "_start") (drop (i32.add (i32.const 1) (i32.const 2)))))"#,
        )
        .unwrap();
        let config = RuntimeConfig {
            wasi: WasiConfig {
                preopen_dir: None,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut store = create_store(&engine, &config, "unit".into()).unwrap();

        let result =
            tokio_test::block_on(runner.execute_core(&module, &mut store, "_start")).unwrap();

        assert!(result.is_success());
        assert_eq!(store.data().metrics.host_calls, 0);
    }

    #[test]
    fn test_execution_result_success() {
        let result = ExecutionResult::Success;
        assert!(result.is_success());
        assert!(!result.is_trap());
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn test_execution_result_exit() {
        let result = ExecutionResult::Exit { code: 3 };
        assert!(!result.is_success());
        assert!(!result.is_trap());
        assert_eq!(result.exit_code(), 3);
    }

    #[test]
    fn test_execution_result_trap() {
        let result = ExecutionResult::Trap {
            message: "unreachable".into(),
            code: Some("UnreachableCodeReached".into()),
        };
        assert!(!result.is_success());
        assert!(result.is_trap());
        assert_eq!(result.exit_code(), 1);
    }
}
