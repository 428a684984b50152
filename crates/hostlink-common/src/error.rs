//! Error types for hostlink.
//!
//! This module defines a hierarchy of error types using `thiserror`:
//! - [`RuntimeError`]: Top-level errors for running guest modules
//! - [`HostError`]: Errors from host object operations (get/set/call)
//! - [`WasiError`]: Console and file output errors

use std::io;

use thiserror::Error;

/// Top-level runtime errors.
///
/// These errors represent failures that can occur while compiling,
/// instantiating, or executing a guest module.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The requested export or file was not found.
    #[error("Module not found: {module_id}")]
    ModuleNotFound {
        /// The identifier of the module that was not found.
        module_id: String,
    },

    /// WebAssembly compilation or instantiation failed.
    #[error("Compilation failed: {reason}")]
    CompilationFailed {
        /// Description of the compilation failure.
        reason: String,
    },

    /// Execution exhausted the configured fuel limit.
    #[error("Fuel exhausted: CPU limit exceeded")]
    FuelExhausted,

    /// A host object operation failed.
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// WASI setup or output failed.
    #[error("WASI error: {0}")]
    Wasi(#[from] WasiError),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A WebAssembly trap occurred during execution.
    #[error("Wasm trap: {message}")]
    Trap {
        /// Description of the trap.
        message: String,
    },

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

/// Errors from operations on host objects.
///
/// Every variant has a stable negative code so the error can cross the
/// WebAssembly boundary as a plain `i32`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The object has no property or method with this name.
    #[error("Host member not found: {name}")]
    MemberNotFound {
        /// Name of the missing member.
        name: String,
    },

    /// The member exists but is not a method.
    #[error("Host member is not callable: {name}")]
    NotCallable {
        /// Name of the member.
        name: String,
    },

    /// The handle was never issued by this host or has been released.
    #[error("Invalid host handle: {handle}")]
    InvalidHandle {
        /// Raw handle value.
        handle: u32,
    },

    /// A method received an argument of the wrong shape.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Description of why the argument was invalid.
        reason: String,
    },

    /// An object was required but a primitive was found.
    #[error("Value is not an object: {found}")]
    NotAnObject {
        /// Kind of the value that was found instead.
        found: String,
    },

    /// Guest memory access was out of bounds or not valid UTF-8.
    #[error("Guest memory fault: {reason}")]
    MemoryFault {
        /// Description of the faulting access.
        reason: String,
    },

    /// An error code received from the host without further detail.
    #[error("Host call failed with code {code}")]
    Guest {
        /// Raw negative error code.
        code: i32,
    },
}

/// Console and file output errors.
#[derive(Error, Debug)]
pub enum WasiError {
    /// Failed to initialize the WASI context.
    #[error("WASI initialization failed: {reason}")]
    InitializationFailed {
        /// Description of the initialization failure.
        reason: String,
    },

    /// Writing a file failed.
    #[error("Failed to write '{path}': {source}")]
    Write {
        /// Path that was being written.
        path: String,
        #[source]
        source: io::Error,
    },
}

impl RuntimeError {
    /// Create a new `ModuleNotFound` error.
    pub fn module_not_found(module_id: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            module_id: module_id.into(),
        }
    }

    /// Create a new `CompilationFailed` error.
    pub fn compilation_failed(reason: impl Into<String>) -> Self {
        Self::CompilationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `Trap` error.
    pub fn trap(message: impl Into<String>) -> Self {
        Self::Trap {
            message: message.into(),
        }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error indicates the module was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ModuleNotFound { .. })
    }
}

impl HostError {
    pub const CODE_MEMBER_NOT_FOUND: i32 = -1;
    pub const CODE_NOT_CALLABLE: i32 = -2;
    pub const CODE_INVALID_HANDLE: i32 = -3;
    pub const CODE_INVALID_ARGUMENT: i32 = -4;
    pub const CODE_NOT_AN_OBJECT: i32 = -5;
    pub const CODE_MEMORY_FAULT: i32 = -6;

    /// Create a new `MemberNotFound` error.
    pub fn member_not_found(name: impl Into<String>) -> Self {
        Self::MemberNotFound { name: name.into() }
    }

    /// Create a new `NotCallable` error.
    pub fn not_callable(name: impl Into<String>) -> Self {
        Self::NotCallable { name: name.into() }
    }

    /// Create a new `InvalidArgument` error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a new `MemoryFault` error.
    pub fn memory_fault(reason: impl Into<String>) -> Self {
        Self::MemoryFault {
            reason: reason.into(),
        }
    }

    /// Negative ABI code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::MemberNotFound { .. } => Self::CODE_MEMBER_NOT_FOUND,
            Self::NotCallable { .. } => Self::CODE_NOT_CALLABLE,
            Self::InvalidHandle { .. } => Self::CODE_INVALID_HANDLE,
            Self::InvalidArgument { .. } => Self::CODE_INVALID_ARGUMENT,
            Self::NotAnObject { .. } => Self::CODE_NOT_AN_OBJECT,
            Self::MemoryFault { .. } => Self::CODE_MEMORY_FAULT,
            Self::Guest { code } => *code,
        }
    }

    /// Rebuild an error from an ABI code.
    ///
    /// `subject` is the member name or handle the failing call addressed;
    /// the code alone does not carry it.
    pub fn from_code(code: i32, subject: &str) -> Self {
        match code {
            Self::CODE_MEMBER_NOT_FOUND => Self::member_not_found(subject),
            Self::CODE_NOT_CALLABLE => Self::not_callable(subject),
            Self::CODE_INVALID_HANDLE => Self::InvalidHandle {
                handle: subject.parse().unwrap_or(u32::MAX),
            },
            Self::CODE_INVALID_ARGUMENT => Self::invalid_argument(subject),
            Self::CODE_NOT_AN_OBJECT => Self::NotAnObject {
                found: subject.to_string(),
            },
            Self::CODE_MEMORY_FAULT => Self::memory_fault(subject),
            code => Self::Guest { code },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::module_not_found("test-module");
        assert_eq!(err.to_string(), "Module not found: test-module");

        let err = RuntimeError::FuelExhausted;
        assert_eq!(err.to_string(), "Fuel exhausted: CPU limit exceeded");

        let err = HostError::member_not_found("innerHtml");
        assert_eq!(err.to_string(), "Host member not found: innerHtml");
    }

    #[test]
    fn test_error_from_host_error() {
        let host_err = HostError::InvalidHandle { handle: 42 };
        let runtime_err: RuntimeError = host_err.into();

        assert!(matches!(runtime_err, RuntimeError::Host(_)));
    }

    #[test]
    fn test_host_error_codes_are_negative_and_distinct() {
        let errors = [
            HostError::member_not_found("a"),
            HostError::not_callable("a"),
            HostError::InvalidHandle { handle: 1 },
            HostError::invalid_argument("a"),
            HostError::NotAnObject {
                found: "string".into(),
            },
            HostError::memory_fault("a"),
        ];

        let mut codes: Vec<i32> = errors.iter().map(HostError::code).collect();
        assert!(codes.iter().all(|c| *c < 0));
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_host_error_from_code() {
        assert_eq!(
            HostError::from_code(HostError::CODE_MEMBER_NOT_FOUND, "title"),
            HostError::member_not_found("title")
        );
        assert_eq!(
            HostError::from_code(HostError::CODE_INVALID_HANDLE, "7"),
            HostError::InvalidHandle { handle: 7 }
        );
        assert_eq!(
            HostError::from_code(-99, "x"),
            HostError::Guest { code: -99 }
        );
    }

    #[test]
    fn test_wasi_error_keeps_source() {
        let err = WasiError::Write {
            path: "./log.txt".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        assert!(err.to_string().contains("./log.txt"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_not_found() {
        assert!(RuntimeError::module_not_found("test").is_not_found());
        assert!(!RuntimeError::FuelExhausted.is_not_found());
    }
}
