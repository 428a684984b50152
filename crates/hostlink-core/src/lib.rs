//! Wasmtime runtime for hostlink guests.
//!
//! This crate provides the WebAssembly execution side:
//! - [`WasmEngine`]: Configured Wasmtime engine
//! - [`WorkerContext`]: Per-run context (WASI, page, reference table)
//! - [`CompiledModule`]: Compiled guest module
//! - [`InstanceRunner`]: Instance lifecycle management
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     WasmEngine                          │
//! │  (Shared across runs, thread-safe)                      │
//! │  - Fuel metering, epoch interruption                    │
//! │  - Optional pooling allocator                           │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                   CompiledModule                        │
//! │  (Compiled once from .wasm or .wat)                     │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │            Store<WorkerContext> + Instance              │
//! │  (Per run, isolated)                                    │
//! │  - WASI preview 1 context                               │
//! │  - DomHost page + RefTable                              │
//! │  - Fuel, metrics                                        │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod engine;
pub mod instance;
pub mod module;
pub mod store;

pub use engine::WasmEngine;
pub use instance::{ExecutionResult, InstanceRunner};
pub use module::CompiledModule;
pub use store::{ExecutionMetrics, WorkerContext, create_store};
