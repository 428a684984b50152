//! Wasmtime engine configuration and creation.
//!
//! The [`WasmEngine`] is shared by every run. It is set up with fuel
//! metering, optional epoch interruption and, when asked for, the pooling
//! allocator.

use std::sync::Arc;

use tracing::info;
use wasmtime::{Config, Engine, InstanceAllocationStrategy, PoolingAllocationConfig};

use hostlink_common::{EngineConfig, RuntimeError};

/// Thread-safe WebAssembly engine wrapper.
///
/// The engine holds no per-run state; every guest gets its own
/// [`Store`](wasmtime::Store) from [`create_store`](crate::store::create_store).
///
/// # Example
///
/// ```
/// use hostlink_common::EngineConfig;
/// use hostlink_core::WasmEngine;
///
/// let engine = WasmEngine::new(&EngineConfig::default())?;
/// assert!(!engine.is_pooling_enabled());
/// # Ok::<(), hostlink_common::RuntimeError>(())
/// ```
#[derive(Clone)]
pub struct WasmEngine {
    engine: Arc<Engine>,
    config: EngineConfig,
}

impl WasmEngine {
    /// Create a new WebAssembly engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidConfig`] if Wasmtime rejects the
    /// configuration (for example a pooling allocator the host cannot
    /// reserve memory for).
    pub fn new(config: &EngineConfig) -> Result<Self, RuntimeError> {
        let mut wasmtime_config = Config::new();

        // Host functions are registered through the async linker API
        wasmtime_config.async_support(true);
        wasmtime_config.consume_fuel(true);

        if config.epoch_interruption {
            wasmtime_config.epoch_interruption(true);
        }

        wasmtime_config.cranelift_opt_level(wasmtime::OptLevel::Speed);

        if config.pooling_allocator {
            let pooling_config = Self::create_pooling_config(config);

            wasmtime_config
                .allocation_strategy(InstanceAllocationStrategy::Pooling(pooling_config));

            info!(
                max_instances = config.max_instances,
                instance_memory_mb = config.instance_memory_mb,
                "Pooling allocator enabled"
            );
        }

        let engine = Engine::new(&wasmtime_config).map_err(|e| {
            RuntimeError::invalid_config(format!("Failed to create Wasmtime engine: {e}"))
        })?;

        info!(
            epoch_interruption = config.epoch_interruption,
            "Wasmtime engine initialized"
        );

        Ok(Self {
            engine: Arc::new(engine),
            config: config.clone(),
        })
    }

    fn create_pooling_config(config: &EngineConfig) -> PoolingAllocationConfig {
        let mut pooling = PoolingAllocationConfig::default();

        pooling.total_core_instances(config.max_instances);
        pooling.total_memories(config.max_instances);
        pooling.total_tables(config.max_instances);

        let max_memory_bytes = (config.instance_memory_mb as usize) * 1024 * 1024;
        pooling.max_memory_size(max_memory_bytes);

        pooling
    }

    /// Get a reference to the inner Wasmtime engine.
    pub fn inner(&self) -> &Engine {
        &self.engine
    }

    /// Shared handle to the inner engine, as taken by
    /// [`InstanceRunner::new`](crate::InstanceRunner::new).
    pub fn shared(&self) -> Arc<Engine> {
        Arc::clone(&self.engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Increment the epoch counter.
    ///
    /// The binary ticks this once per millisecond so that
    /// `ExecutionConfig::timeout_ms` reads as a deadline in milliseconds.
    pub fn increment_epoch(&self) {
        self.engine.increment_epoch();
    }

    pub fn is_pooling_enabled(&self) -> bool {
        self.config.pooling_allocator
    }
}

impl std::fmt::Debug for WasmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmEngine")
            .field("pooling_allocator", &self.config.pooling_allocator)
            .field("epoch_interruption", &self.config.epoch_interruption)
            .field("instance_memory_mb", &self.config.instance_memory_mb)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_creation_default() {
        let engine = WasmEngine::new(&EngineConfig::default()).unwrap();
        assert!(!engine.is_pooling_enabled());
        assert!(engine.config().epoch_interruption);
    }

    #[test]
    fn test_engine_creation_with_pooling() {
        let config = EngineConfig {
            pooling_allocator: true,
            max_instances: 2,
            instance_memory_mb: 16,
            ..Default::default()
        };
        let engine = WasmEngine::new(&config).unwrap();

        assert!(engine.is_pooling_enabled());
    }

    #[test]
    fn test_engine_epoch_increment() {
        let engine = WasmEngine::new(&EngineConfig::default()).unwrap();

        engine.increment_epoch();
        engine.increment_epoch();
    }

    #[test]
    fn test_shared_engine_is_the_same_engine() {
        let engine = WasmEngine::new(&EngineConfig::default()).unwrap();
        let shared = engine.shared();

        assert!(Engine::same(&shared, engine.inner()));
    }

    #[test]
    fn test_engine_debug() {
        let engine = WasmEngine::new(&EngineConfig::default()).unwrap();

        let debug_str = format!("{engine:?}");
        assert!(debug_str.contains("WasmEngine"));
        assert!(debug_str.contains("pooling_allocator"));
    }
}
