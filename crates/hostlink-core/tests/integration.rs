//! Integration tests for hostlink-core.
//!
//! These tests verify the execution pipeline:
//! - WAT compilation to module
//! - Store creation with fuel metering and epoch deadlines
//! - Host function registration
//! - Instance execution and outcome classification

use std::time::Duration;

use hostlink_common::{EngineConfig, ExecutionConfig, RuntimeConfig, RuntimeError, WasiConfig};
use hostlink_core::{CompiledModule, ExecutionResult, InstanceRunner, WasmEngine, create_store};
use hostlink_host::linker::register_all;

fn engine(epoch_interruption: bool) -> WasmEngine {
    WasmEngine::new(&EngineConfig {
        epoch_interruption,
        ..Default::default()
    })
    .unwrap()
}

fn runtime_config(execution: ExecutionConfig) -> RuntimeConfig {
    RuntimeConfig {
        execution,
        wasi: WasiConfig {
            inherit_stdout: false,
            preopen_dir: None,
            ..Default::default()
        },
        ..Default::default()
    }
}

// ============================================================================
// Test: Basic Execution
// ============================================================================

#[tokio::test]
async fn test_basic_execution() {
    let wat = r#"
        (module
            (func (export "_start"))
        )
    "#;

    let engine = engine(false);
    let runner = InstanceRunner::new(engine.shared());
    let compiled = CompiledModule::from_wat(engine.inner(), wat).unwrap();

    let config = runtime_config(ExecutionConfig::default());
    let mut store = create_store(&engine, &config, "test-basic".into()).unwrap();

    let result = runner
        .execute_core(&compiled, &mut store, "_start")
        .await
        .unwrap();

    assert!(result.is_success());
    assert!(store.data().metrics.duration.is_some());
}

#[tokio::test]
async fn test_missing_entry_point() {
    let wat = r#"
        (module
            (func (export "main"))
        )
    "#;

    let engine = engine(false);
    let runner = InstanceRunner::new(engine.shared());
    let compiled = CompiledModule::from_wat(engine.inner(), wat).unwrap();

    let config = runtime_config(ExecutionConfig::default());
    let mut store = create_store(&engine, &config, "test-entry".into()).unwrap();

    let err = runner
        .execute_core(&compiled, &mut store, "_start")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

// ============================================================================
// Test: Fuel Consumption
// ============================================================================

#[tokio::test]
async fn test_fuel_consumption() {
    let wat = r#"
        (module
            (func (export "_start")
                (local $i i32)
                (local.set $i (i32.const 0))
                (block $break
                    (loop $continue
                        (local.set $i (i32.add (local.get $i) (i32.const 1)))
                        (br_if $continue (i32.lt_u (local.get $i) (i32.const 100)))
                    )
                )
            )
        )
    "#;

    let engine = engine(false);
    let runner = InstanceRunner::new(engine.shared());
    let compiled = CompiledModule::from_wat(engine.inner(), wat).unwrap();

    let config = runtime_config(ExecutionConfig {
        max_fuel: 100_000,
        fuel_metering: true,
        ..Default::default()
    });
    let mut store = create_store(&engine, &config, "test-fuel".into()).unwrap();

    let result = runner
        .execute_core(&compiled, &mut store, "_start")
        .await
        .unwrap();

    assert!(result.is_success());
    assert!(
        store.data().metrics.fuel_consumed > 0,
        "Expected fuel to be consumed, got 0"
    );
}

// ============================================================================
// Test: Fuel Exhaustion
// ============================================================================

#[tokio::test]
async fn test_fuel_exhaustion() {
    let wat = r#"
        (module
            (func (export "_start")
                (loop $forever
                    (br $forever)
                )
            )
        )
    "#;

    let engine = engine(false);
    let runner = InstanceRunner::new(engine.shared());
    let compiled = CompiledModule::from_wat(engine.inner(), wat).unwrap();

    let config = runtime_config(ExecutionConfig {
        max_fuel: 1000,
        fuel_metering: true,
        ..Default::default()
    });
    let mut store = create_store(&engine, &config, "test-exhaustion".into()).unwrap();

    let result = runner.execute_core(&compiled, &mut store, "_start").await;

    assert!(matches!(result.unwrap_err(), RuntimeError::FuelExhausted));
}

// ============================================================================
// Test: Epoch Deadline
// ============================================================================

#[tokio::test]
async fn test_epoch_deadline_interrupts() {
    let wat = r#"
        (module
            (func (export "_start")
                (loop $forever
                    (br $forever)
                )
            )
        )
    "#;

    let engine = engine(true);
    let runner = InstanceRunner::new(engine.shared());
    let compiled = CompiledModule::from_wat(engine.inner(), wat).unwrap();

    let config = runtime_config(ExecutionConfig {
        fuel_metering: false,
        timeout_ms: 5,
        ..Default::default()
    });
    let mut store = create_store(&engine, &config, "test-epoch".into()).unwrap();

    let ticker = engine.clone();
    std::thread::spawn(move || {
        for _ in 0..10_000 {
            std::thread::sleep(Duration::from_millis(1));
            ticker.increment_epoch();
        }
    });

    let result = runner
        .execute_core(&compiled, &mut store, "_start")
        .await
        .unwrap();

    assert!(result.is_trap(), "Expected trap, got {result:?}");
}

// ============================================================================
// Test: Trap Handling
// ============================================================================

#[tokio::test]
async fn test_trap_unreachable() {
    let wat = r#"
        (module
            (func (export "_start")
                unreachable
            )
        )
    "#;

    let engine = engine(false);
    let runner = InstanceRunner::new(engine.shared());
    let compiled = CompiledModule::from_wat(engine.inner(), wat).unwrap();

    let config = runtime_config(ExecutionConfig::default());
    let mut store = create_store(&engine, &config, "test-trap".into()).unwrap();

    let result = runner
        .execute_core(&compiled, &mut store, "_start")
        .await
        .unwrap();

    assert!(result.is_trap(), "Expected trap, got {result:?}");
    if let ExecutionResult::Trap { message, code } = result {
        assert!(
            message.contains("wasm backtrace") || code.as_deref() == Some("UnreachableCodeReached"),
            "Expected wasm trap, got message: {message} (code: {code:?})"
        );
    }
}

// ============================================================================
// Test: WASI Exit Status
// ============================================================================

const EXIT_GUEST: &str = r#"
    (module
        (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
        (memory (export "memory") 1)
        (global $status (export "status") (mut i32) (i32.const 0))
        (func (export "_start")
            (call $proc_exit (global.get $status)))
        (func (export "exit_seven")
            (call $proc_exit (i32.const 7)))
    )
"#;

#[tokio::test]
async fn test_proc_exit_status() {
    let engine = engine(false);
    let mut runner = InstanceRunner::new(engine.shared());
    register_all(runner.linker_mut()).unwrap();
    let compiled = CompiledModule::from_wat(engine.inner(), EXIT_GUEST).unwrap();

    let config = runtime_config(ExecutionConfig::default());

    let mut store = create_store(&engine, &config, "test-exit-zero".into()).unwrap();
    let result = runner
        .execute_core(&compiled, &mut store, "_start")
        .await
        .unwrap();
    assert_eq!(result, ExecutionResult::Success);

    let mut store = create_store(&engine, &config, "test-exit-seven".into()).unwrap();
    let result = runner
        .execute_core(&compiled, &mut store, "exit_seven")
        .await
        .unwrap();
    assert_eq!(result, ExecutionResult::Exit { code: 7 });
}
