//! Guest side of the `hostlink` imports.
//!
//! [`Imports`] mirrors the raw imports with safe signatures and
//! [`ImportHost`] implements [`Host`] on top of it, so programs written
//! against the trait run inside a wasm guest. There the imports are
//! `WasmImports`; anything else implementing [`Imports`] (a host-side
//! table, a recording double) drives the same marshalling natively.
//!
//! Handles held by the guest are references into the host's per-run table.
//! Object references stay alive until the program releases them; primitive
//! references are loaded and released immediately.

use hostlink_common::HostError;

use crate::{Host, HostHandle, HostValue, ValueKind};

/// The `hostlink` import surface.
///
/// Every `i32` is a reference or, when negative, a [`HostError`] code.
pub trait Imports {
    fn global(&self) -> i32;
    fn get(&self, target: i32, name: &str) -> i32;
    fn set(&self, target: i32, name: &str, value: i32) -> i32;
    fn call(&self, target: i32, name: &str, args: &[u32]) -> i32;
    fn string(&self, value: &str) -> i32;
    fn number(&self, value: f64) -> i32;
    fn boolean(&self, value: bool) -> i32;
    fn null(&self) -> i32;
    fn undefined(&self) -> i32;
    fn kind(&self, reference: i32) -> i32;
    fn number_value(&self, reference: i32) -> f64;
    fn string_len(&self, reference: i32) -> i32;
    /// Copy the string into `buf`, answering the number of bytes copied.
    fn string_load(&self, reference: i32, buf: &mut [u8]) -> i32;
    fn release(&self, reference: i32);
}

/// [`Host`] backed by the `hostlink` imports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportHost<I> {
    imports: I,
}

/// A reference handed to an import, and whether it must be released after.
#[derive(Debug, Clone, Copy)]
struct Lifted {
    reference: i32,
    owned: bool,
}

impl<I: Imports> ImportHost<I> {
    pub fn with_imports(imports: I) -> Self {
        Self { imports }
    }

    pub fn imports(&self) -> &I {
        &self.imports
    }

    /// Turn a reference into a value. Primitive references are loaded and
    /// released; object references become the returned handle.
    #[allow(clippy::cast_sign_loss)]
    fn take(&self, reference: i32) -> Result<HostValue, HostError> {
        let tag = check(self.imports.kind(reference), "value")?;
        let kind = ValueKind::from_i32(tag)
            .ok_or_else(|| HostError::invalid_argument(format!("unknown value kind {tag}")))?;

        let value = match kind {
            ValueKind::Object => {
                return Ok(HostValue::Object(HostHandle::from_raw(reference as u32)));
            }
            ValueKind::Undefined => Ok(HostValue::Undefined),
            ValueKind::Null => Ok(HostValue::Null),
            ValueKind::Bool => Ok(HostValue::Bool(self.imports.number_value(reference) != 0.0)),
            ValueKind::Number => Ok(HostValue::Number(self.imports.number_value(reference))),
            ValueKind::String => self.load_string(reference).map(HostValue::String),
        };
        self.imports.release(reference);
        value
    }

    /// Turn a value into a reference the imports accept.
    fn lift(&self, value: &HostValue) -> Result<Lifted, HostError> {
        let reference = match value {
            HostValue::Object(handle) => {
                let reference = to_ref(*handle)?;
                return Ok(Lifted {
                    reference,
                    owned: false,
                });
            }
            HostValue::Undefined => self.imports.undefined(),
            HostValue::Null => self.imports.null(),
            HostValue::Bool(b) => self.imports.boolean(*b),
            HostValue::Number(n) => self.imports.number(*n),
            HostValue::String(s) => self.imports.string(s),
        };
        Ok(Lifted {
            reference: check(reference, value.kind().name())?,
            owned: true,
        })
    }

    fn release_owned(&self, lifted: &[Lifted]) {
        for arg in lifted.iter().filter(|arg| arg.owned) {
            self.imports.release(arg.reference);
        }
    }

    #[allow(clippy::cast_sign_loss)]
    fn load_string(&self, reference: i32) -> Result<String, HostError> {
        let len = check(self.imports.string_len(reference), "string")?;
        let mut buf = vec![0u8; len as usize];
        let copied = check(self.imports.string_load(reference, &mut buf), "string")?;
        buf.truncate(copied as usize);
        String::from_utf8(buf).map_err(|_| HostError::invalid_argument("string is not UTF-8"))
    }
}

fn to_ref(handle: HostHandle) -> Result<i32, HostError> {
    i32::try_from(handle.raw()).map_err(|_| HostError::InvalidHandle {
        handle: handle.raw(),
    })
}

fn check(status: i32, subject: &str) -> Result<i32, HostError> {
    if status < 0 {
        Err(HostError::from_code(status, subject))
    } else {
        Ok(status)
    }
}

impl<I: Imports> Host for ImportHost<I> {
    #[allow(clippy::cast_sign_loss)]
    fn global(&self) -> HostHandle {
        HostHandle::from_raw(self.imports.global() as u32)
    }

    fn get(&self, target: HostHandle, name: &str) -> Result<HostValue, HostError> {
        let reference = check(self.imports.get(to_ref(target)?, name), name)?;
        self.take(reference)
    }

    fn set(&self, target: HostHandle, name: &str, value: HostValue) -> Result<(), HostError> {
        let target = to_ref(target)?;
        let lifted = self.lift(&value)?;
        let status = self.imports.set(target, name, lifted.reference);
        self.release_owned(&[lifted]);
        check(status, name).map(drop)
    }

    #[allow(clippy::cast_sign_loss)]
    fn call(
        &self,
        target: HostHandle,
        name: &str,
        args: &[HostValue],
    ) -> Result<HostValue, HostError> {
        let target = to_ref(target)?;

        let mut lifted = Vec::with_capacity(args.len());
        for arg in args {
            match self.lift(arg) {
                Ok(arg) => lifted.push(arg),
                Err(err) => {
                    self.release_owned(&lifted);
                    return Err(err);
                }
            }
        }
        let refs: Vec<u32> = lifted.iter().map(|arg| arg.reference as u32).collect();

        let status = self.imports.call(target, name, &refs);
        self.release_owned(&lifted);

        let reference = check(status, name)?;
        self.take(reference)
    }

    fn release(&self, handle: HostHandle) {
        if let Ok(reference) = to_ref(handle) {
            self.imports.release(reference);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::{WasmImports, sys};

#[cfg(target_arch = "wasm32")]
#[allow(unsafe_code)]
mod wasm {
    use super::{ImportHost, Imports};

    /// Raw `hostlink` imports.
    ///
    /// Pointers must address the guest's own linear memory; the host checks
    /// bounds and answers a memory-fault code instead of trapping.
    pub mod sys {
        #[link(wasm_import_module = "hostlink")]
        unsafe extern "C" {
            pub fn global() -> i32;
            pub fn get(target: i32, name_ptr: *const u8, name_len: i32) -> i32;
            pub fn set(target: i32, name_ptr: *const u8, name_len: i32, value: i32) -> i32;
            pub fn call(
                target: i32,
                name_ptr: *const u8,
                name_len: i32,
                args_ptr: *const u32,
                args_len: i32,
            ) -> i32;
            pub fn string(ptr: *const u8, len: i32) -> i32;
            pub fn number(value: f64) -> i32;
            #[link_name = "bool"]
            pub fn boolean(value: i32) -> i32;
            pub fn null() -> i32;
            pub fn undefined() -> i32;
            pub fn kind(reference: i32) -> i32;
            pub fn number_value(reference: i32) -> f64;
            pub fn string_len(reference: i32) -> i32;
            pub fn string_load(reference: i32, ptr: *mut u8, len: i32) -> i32;
            #[link_name = "drop"]
            pub fn release(reference: i32);
        }
    }

    /// The imports of the running wasm guest.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WasmImports;

    // Lengths come from slices in linear memory, which is below 4 GiB.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    impl Imports for WasmImports {
        fn global(&self) -> i32 {
            unsafe { sys::global() }
        }

        fn get(&self, target: i32, name: &str) -> i32 {
            unsafe { sys::get(target, name.as_ptr(), name.len() as i32) }
        }

        fn set(&self, target: i32, name: &str, value: i32) -> i32 {
            unsafe { sys::set(target, name.as_ptr(), name.len() as i32, value) }
        }

        fn call(&self, target: i32, name: &str, args: &[u32]) -> i32 {
            unsafe {
                sys::call(
                    target,
                    name.as_ptr(),
                    name.len() as i32,
                    args.as_ptr(),
                    args.len() as i32,
                )
            }
        }

        fn string(&self, value: &str) -> i32 {
            unsafe { sys::string(value.as_ptr(), value.len() as i32) }
        }

        fn number(&self, value: f64) -> i32 {
            unsafe { sys::number(value) }
        }

        fn boolean(&self, value: bool) -> i32 {
            unsafe { sys::boolean(i32::from(value)) }
        }

        fn null(&self) -> i32 {
            unsafe { sys::null() }
        }

        fn undefined(&self) -> i32 {
            unsafe { sys::undefined() }
        }

        fn kind(&self, reference: i32) -> i32 {
            unsafe { sys::kind(reference) }
        }

        fn number_value(&self, reference: i32) -> f64 {
            unsafe { sys::number_value(reference) }
        }

        fn string_len(&self, reference: i32) -> i32 {
            unsafe { sys::string_len(reference) }
        }

        fn string_load(&self, reference: i32, buf: &mut [u8]) -> i32 {
            unsafe { sys::string_load(reference, buf.as_mut_ptr(), buf.len() as i32) }
        }

        fn release(&self, reference: i32) {
            unsafe { sys::release(reference) }
        }
    }

    impl ImportHost<WasmImports> {
        pub fn new() -> Self {
            Self::with_imports(WasmImports)
        }
    }
}
