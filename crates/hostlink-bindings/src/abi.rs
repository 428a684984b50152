//! Names shared by the guest imports and the host linker.
//!
//! Every import returns an `i32`. Non-negative values are references (or
//! byte counts); negative values are [`HostError`](hostlink_common::HostError)
//! codes. Strings travel as `(ptr, len)` pairs into the guest's exported
//! `memory`.

/// Wasm import module holding the host object functions.
pub const IMPORT_MODULE: &str = "hostlink";

/// Export the host reads guest memory from.
pub const MEMORY_EXPORT: &str = "memory";

pub const GLOBAL: &str = "global";
pub const GET: &str = "get";
pub const SET: &str = "set";
pub const CALL: &str = "call";
pub const STRING: &str = "string";
pub const NUMBER: &str = "number";
pub const BOOL: &str = "bool";
pub const NULL: &str = "null";
pub const UNDEFINED: &str = "undefined";
pub const KIND: &str = "kind";
pub const NUMBER_VALUE: &str = "number_value";
pub const STRING_LEN: &str = "string_len";
pub const STRING_LOAD: &str = "string_load";
pub const DROP: &str = "drop";

/// Status returned by `set` on success.
pub const OK: i32 = 0;
