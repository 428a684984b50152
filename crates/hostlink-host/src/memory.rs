//! Bounds-checked access to guest linear memory.
//!
//! Out-of-range pointers never trap; they become
//! [`HostError::MemoryFault`], which the imports answer as a status code.

use std::ops::Range;

use hostlink_bindings::abi::MEMORY_EXPORT;
use hostlink_common::HostError;
use hostlink_core::WorkerContext;
use wasmtime::{Caller, Extern, Memory};

/// The guest's exported `memory`.
pub fn guest_memory(caller: &mut Caller<'_, WorkerContext>) -> Result<Memory, HostError> {
    caller
        .get_export(MEMORY_EXPORT)
        .and_then(Extern::into_memory)
        .ok_or_else(|| HostError::memory_fault(format!("guest does not export `{MEMORY_EXPORT}`")))
}

/// Byte range `ptr..ptr + len`, checked against a memory of `size` bytes.
#[allow(clippy::cast_sign_loss)]
pub fn checked_range(ptr: i32, len: i32, size: usize) -> Result<Range<usize>, HostError> {
    if ptr < 0 || len < 0 {
        return Err(HostError::memory_fault(format!(
            "negative pointer or length ({ptr}, {len})"
        )));
    }

    let start = ptr as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or_else(|| HostError::memory_fault("pointer + length overflow"))?;

    if end > size {
        return Err(HostError::memory_fault(format!(
            "{start}..{end} outside memory of {size} bytes"
        )));
    }

    Ok(start..end)
}

/// Copy `len` bytes at `ptr` out of guest memory.
pub fn read_bytes(
    caller: &mut Caller<'_, WorkerContext>,
    ptr: i32,
    len: i32,
) -> Result<Vec<u8>, HostError> {
    let memory = guest_memory(caller)?;
    let data = memory.data(&*caller);
    let range = checked_range(ptr, len, data.len())?;
    Ok(data[range].to_vec())
}

/// Read a UTF-8 string at `ptr`.
pub fn read_str(
    caller: &mut Caller<'_, WorkerContext>,
    ptr: i32,
    len: i32,
) -> Result<String, HostError> {
    let bytes = read_bytes(caller, ptr, len)?;
    String::from_utf8(bytes).map_err(|e| HostError::invalid_argument(format!("invalid utf-8: {e}")))
}

/// Read `count` little-endian `u32` values at `ptr`.
pub fn read_u32s(
    caller: &mut Caller<'_, WorkerContext>,
    ptr: i32,
    count: i32,
) -> Result<Vec<u32>, HostError> {
    let len = count
        .checked_mul(4)
        .ok_or_else(|| HostError::memory_fault("argument count overflow"))?;
    let bytes = read_bytes(caller, ptr, len)?;
    Ok(decode_u32s(&bytes))
}

fn decode_u32s(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_range() {
        assert_eq!(checked_range(0, 4, 16).unwrap(), 0..4);
        assert_eq!(checked_range(12, 4, 16).unwrap(), 12..16);
        assert_eq!(checked_range(16, 0, 16).unwrap(), 16..16);
    }

    #[test]
    fn test_checked_range_out_of_bounds() {
        let err = checked_range(13, 4, 16).unwrap_err();
        assert_eq!(err.code(), HostError::CODE_MEMORY_FAULT);

        assert!(checked_range(-1, 4, 16).is_err());
        assert!(checked_range(0, -4, 16).is_err());
        assert!(checked_range(i32::MAX, i32::MAX, usize::MAX).is_ok());
    }

    #[test]
    fn test_decode_u32s() {
        let bytes = [1, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 7, 1, 0, 0];
        assert_eq!(decode_u32s(&bytes), [1, u32::MAX, 263]);
    }
}
