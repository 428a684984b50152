//! Host function registration for Wasmtime linkers.
//!
//! [`register_all`] links a guest against WASI preview 1 and the `hostlink`
//! import module. Every `hostlink` import answers failures with a negative
//! [`HostError`](hostlink_common::HostError) code; none of them traps.

use tracing::debug;
use wasmtime::{Caller, Linker};

use hostlink_bindings::abi;
use hostlink_bindings::HostValue;
use hostlink_common::{HostError, RuntimeError};
use hostlink_core::WorkerContext;

use crate::memory;
use crate::objects;

type Ctx<'a> = Caller<'a, WorkerContext>;

/// Register all host functions on a core module linker:
/// - `wasi_snapshot_preview1::*` backed by the run's WASI context
/// - `hostlink::*`, see [`register_dom`]
///
/// # Errors
///
/// Returns an error if function registration fails.
pub fn register_all(linker: &mut Linker<WorkerContext>) -> Result<(), RuntimeError> {
    register_wasi(linker)?;
    register_dom(linker)?;
    Ok(())
}

/// Register WASI preview 1.
pub fn register_wasi(linker: &mut Linker<WorkerContext>) -> Result<(), RuntimeError> {
    wasmtime_wasi::preview1::add_to_linker_async(linker, WorkerContext::wasi_mut)
        .map_err(|e| RuntimeError::invalid_config(format!("Failed to register WASI: {e}")))
}

fn registration_failed(name: &str) -> impl FnOnce(wasmtime::Error) -> RuntimeError + '_ {
    move |e| {
        RuntimeError::invalid_config(format!(
            "Failed to register {}::{name}: {e}",
            abi::IMPORT_MODULE
        ))
    }
}

/// Count the call and hand out the context.
fn enter<'a>(caller: &'a mut Ctx<'_>) -> &'a mut WorkerContext {
    let ctx = caller.data_mut();
    ctx.metrics.host_calls += 1;
    ctx
}

fn new_primitive(caller: &mut Ctx<'_>, value: HostValue) -> i32 {
    objects::status(objects::new_ref(enter(caller), value))
}

/// Register the `hostlink` import module.
///
/// # Memory Protocol
///
/// Names and strings are passed as `(ptr, len)` into the guest's exported
/// `memory`, UTF-8 encoded. `call` takes its arguments as `args_len`
/// little-endian `u32` references starting at `args_ptr`. Out-of-bounds
/// pointers answer the memory-fault code.
pub fn register_dom(linker: &mut Linker<WorkerContext>) -> Result<(), RuntimeError> {
    let module = abi::IMPORT_MODULE;

    linker
        .func_wrap(module, abi::GLOBAL, |mut caller: Ctx<'_>| -> i32 {
            enter(&mut caller);
            objects::WINDOW_REF
        })
        .map_err(registration_failed(abi::GLOBAL))?;

    linker
        .func_wrap(
            module,
            abi::GET,
            |mut caller: Ctx<'_>, target: i32, name_ptr: i32, name_len: i32| -> i32 {
                let result = memory::read_str(&mut caller, name_ptr, name_len)
                    .and_then(|name| objects::get(enter(&mut caller), target, &name));
                objects::status(result)
            },
        )
        .map_err(registration_failed(abi::GET))?;

    linker
        .func_wrap(
            module,
            abi::SET,
            |mut caller: Ctx<'_>, target: i32, name_ptr: i32, name_len: i32, value: i32| -> i32 {
                let result = memory::read_str(&mut caller, name_ptr, name_len).and_then(|name| {
                    objects::set(enter(&mut caller), target, &name, value).map(|()| abi::OK)
                });
                objects::status(result)
            },
        )
        .map_err(registration_failed(abi::SET))?;

    linker
        .func_wrap(
            module,
            abi::CALL,
            |mut caller: Ctx<'_>,
             target: i32,
             name_ptr: i32,
             name_len: i32,
             args_ptr: i32,
             args_len: i32|
             -> i32 {
                let result = memory::read_str(&mut caller, name_ptr, name_len).and_then(|name| {
                    let args = memory::read_u32s(&mut caller, args_ptr, args_len)?;
                    objects::call(enter(&mut caller), target, &name, &args)
                });
                objects::status(result)
            },
        )
        .map_err(registration_failed(abi::CALL))?;

    linker
        .func_wrap(
            module,
            abi::STRING,
            |mut caller: Ctx<'_>, ptr: i32, len: i32| -> i32 {
                match memory::read_str(&mut caller, ptr, len) {
                    Ok(s) => new_primitive(&mut caller, HostValue::String(s)),
                    Err(e) => objects::status(Err(e)),
                }
            },
        )
        .map_err(registration_failed(abi::STRING))?;

    linker
        .func_wrap(module, abi::NUMBER, |mut caller: Ctx<'_>, value: f64| -> i32 {
            new_primitive(&mut caller, HostValue::Number(value))
        })
        .map_err(registration_failed(abi::NUMBER))?;

    linker
        .func_wrap(module, abi::BOOL, |mut caller: Ctx<'_>, value: i32| -> i32 {
            new_primitive(&mut caller, HostValue::Bool(value != 0))
        })
        .map_err(registration_failed(abi::BOOL))?;

    linker
        .func_wrap(module, abi::NULL, |mut caller: Ctx<'_>| -> i32 {
            new_primitive(&mut caller, HostValue::Null)
        })
        .map_err(registration_failed(abi::NULL))?;

    linker
        .func_wrap(module, abi::UNDEFINED, |mut caller: Ctx<'_>| -> i32 {
            new_primitive(&mut caller, HostValue::Undefined)
        })
        .map_err(registration_failed(abi::UNDEFINED))?;

    linker
        .func_wrap(module, abi::KIND, |mut caller: Ctx<'_>, reference: i32| -> i32 {
            let result = objects::kind(enter(&mut caller), reference).map(|k| k as i32);
            objects::status(result)
        })
        .map_err(registration_failed(abi::KIND))?;

    linker
        .func_wrap(
            module,
            abi::NUMBER_VALUE,
            |mut caller: Ctx<'_>, reference: i32| -> f64 {
                objects::number_value(enter(&mut caller), reference)
            },
        )
        .map_err(registration_failed(abi::NUMBER_VALUE))?;

    linker
        .func_wrap(
            module,
            abi::STRING_LEN,
            |mut caller: Ctx<'_>, reference: i32| -> i32 {
                let result = objects::string_value(enter(&mut caller), reference).and_then(|s| {
                    i32::try_from(s.len())
                        .map_err(|_| HostError::invalid_argument("string too long"))
                });
                objects::status(result)
            },
        )
        .map_err(registration_failed(abi::STRING_LEN))?;

    linker
        .func_wrap(
            module,
            abi::STRING_LOAD,
            |mut caller: Ctx<'_>, reference: i32, ptr: i32, len: i32| -> i32 {
                objects::status(string_load(&mut caller, reference, ptr, len))
            },
        )
        .map_err(registration_failed(abi::STRING_LOAD))?;

    linker
        .func_wrap(module, abi::DROP, |mut caller: Ctx<'_>, reference: i32| {
            objects::release(enter(&mut caller), reference);
        })
        .map_err(registration_failed(abi::DROP))?;

    debug!(module, "Host object imports registered");
    Ok(())
}

/// Copy up to `len` bytes of a string reference into guest memory at `ptr`.
/// Returns the number of bytes copied.
fn string_load(
    caller: &mut Ctx<'_>,
    reference: i32,
    ptr: i32,
    len: i32,
) -> Result<i32, HostError> {
    let guest_memory = memory::guest_memory(caller)?;
    let (data, ctx) = guest_memory.data_and_store_mut(&mut *caller);
    ctx.metrics.host_calls += 1;

    let bytes = objects::string_value(ctx, reference)?.as_bytes();
    let range = memory::checked_range(ptr, len, data.len())?;
    let count = bytes.len().min(range.len());
    data[range.start..range.start + count].copy_from_slice(&bytes[..count]);

    // count <= len, which is a non-negative i32
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    Ok(count as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlink_common::EngineConfig;
    use hostlink_core::WasmEngine;

    #[test]
    fn test_register_dom() {
        let engine = WasmEngine::new(&EngineConfig::default()).unwrap();
        let mut linker = Linker::new(engine.inner());

        assert!(register_dom(&mut linker).is_ok());
    }

    #[test]
    fn test_register_all() {
        let engine = WasmEngine::new(&EngineConfig::default()).unwrap();
        let mut linker = Linker::new(engine.inner());

        assert!(register_all(&mut linker).is_ok());
    }

    #[test]
    fn test_register_twice_fails() {
        let engine = WasmEngine::new(&EngineConfig::default()).unwrap();
        let mut linker = Linker::new(engine.inner());

        register_dom(&mut linker).unwrap();
        let err = register_dom(&mut linker).unwrap_err();
        assert!(err.to_string().contains("hostlink::global"));
    }
}
