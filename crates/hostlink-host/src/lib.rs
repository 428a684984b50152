//! Host functions for hostlink guests.
//!
//! A guest imports two modules:
//!
//! - `wasi_snapshot_preview1`: console output and file access through the
//!   run's WASI context (pre-opened directory, captured or inherited stdout)
//! - `hostlink`: the page, reached through `i32` references (see
//!   [`hostlink_bindings::abi`])
//!
//! [`linker::register_all`] registers both. [`objects`] holds the reference
//! semantics and [`memory`] the bounds-checked guest memory access.

pub mod linker;
pub mod memory;
pub mod objects;

pub use linker::{register_all, register_dom, register_wasi};
