//! Reference-level operations behind the `hostlink` imports.
//!
//! Everything here works on a [`WorkerContext`] and plain integers, so the
//! import semantics can be tested without instantiating a guest. The linker
//! only adds guest memory access on top.

use tracing::{debug, trace};

use hostlink_bindings::{Host, HostHandle, HostValue, ValueKind};
use hostlink_common::HostError;
use hostlink_core::WorkerContext;

/// Reference the window is pinned at.
pub const WINDOW_REF: i32 = 0;

#[allow(clippy::cast_sign_loss)]
fn resolve(ctx: &WorkerContext, reference: i32) -> Result<&HostValue, HostError> {
    let raw = u32::try_from(reference).map_err(|_| HostError::InvalidHandle {
        handle: reference as u32,
    })?;
    ctx.refs.get(raw)
}

fn resolve_object(ctx: &WorkerContext, reference: i32) -> Result<HostHandle, HostError> {
    resolve(ctx, reference)?.as_handle()
}

/// Store `value` in the reference table and hand back its reference.
pub fn new_ref(ctx: &mut WorkerContext, value: HostValue) -> Result<i32, HostError> {
    let raw = ctx.refs.insert(value);
    i32::try_from(raw).map_err(|_| {
        ctx.refs.release(raw);
        HostError::invalid_argument("reference table exhausted")
    })
}

pub fn get(ctx: &mut WorkerContext, target: i32, name: &str) -> Result<i32, HostError> {
    let handle = resolve_object(ctx, target)?;
    let value = ctx.dom.get(handle, name)?;
    trace!(handle = %handle, name, kind = value.kind().name(), "get");
    new_ref(ctx, value)
}

pub fn set(ctx: &mut WorkerContext, target: i32, name: &str, value: i32) -> Result<(), HostError> {
    let handle = resolve_object(ctx, target)?;
    let value = resolve(ctx, value)?.clone();
    trace!(handle = %handle, name, kind = value.kind().name(), "set");
    ctx.dom.set(handle, name, value)
}

pub fn call(
    ctx: &mut WorkerContext,
    target: i32,
    name: &str,
    args: &[u32],
) -> Result<i32, HostError> {
    let handle = resolve_object(ctx, target)?;
    let args = args
        .iter()
        .map(|&reference| ctx.refs.get(reference).cloned())
        .collect::<Result<Vec<_>, _>>()?;
    trace!(handle = %handle, name, argc = args.len(), "call");
    let result = ctx.dom.call(handle, name, &args)?;
    new_ref(ctx, result)
}

/// Kind tag of a reference.
pub fn kind(ctx: &WorkerContext, reference: i32) -> Result<ValueKind, HostError> {
    Ok(resolve(ctx, reference)?.kind())
}

/// Numeric view of a reference: numbers as-is, booleans as `1` / `0`,
/// everything else (unknown references included) as NaN.
pub fn number_value(ctx: &WorkerContext, reference: i32) -> f64 {
    match resolve(ctx, reference) {
        Ok(HostValue::Number(n)) => *n,
        Ok(HostValue::Bool(b)) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    }
}

/// String contents of a reference.
pub fn string_value(ctx: &WorkerContext, reference: i32) -> Result<&str, HostError> {
    let value = resolve(ctx, reference)?;
    value.as_str().ok_or_else(|| {
        HostError::invalid_argument(format!("expected a string, found {}", value.kind().name()))
    })
}

/// Release a reference. The pinned window and unknown references are
/// ignored.
#[allow(clippy::cast_sign_loss)]
pub fn release(ctx: &mut WorkerContext, reference: i32) {
    if reference >= 0 && !ctx.refs.release(reference as u32) && reference != WINDOW_REF {
        debug!(reference, "drop of unknown reference ignored");
    }
}

/// Fold a result into the `i32` status the imports return.
pub fn status(result: Result<i32, HostError>) -> i32 {
    match result {
        Ok(value) => value,
        Err(err) => {
            debug!(code = err.code(), error = %err, "host call failed");
            err.code()
        }
    }
}
