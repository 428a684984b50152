//! Guest module compilation.
//!
//! [`CompiledModule`] wraps a Wasmtime [`Module`]. Guests arrive as binary
//! `.wasm`, as WAT text (tests and hand-written guests), or as a path to
//! either.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::time::Instant;

use tracing::{info, instrument};
use wasmtime::{Engine, Module};

use hostlink_common::RuntimeError;

const WASM_MAGIC: &[u8; 4] = b"\0asm";

/// A compiled core WebAssembly module.
///
/// Cheap to clone; the underlying Wasmtime module is reference counted.
#[derive(Clone)]
pub struct CompiledModule {
    module: Module,

    /// Hash of the source bytes, used to tell runs apart in logs.
    content_hash: String,

    compiled_at: Instant,
}

impl CompiledModule {
    /// Compile a core module from WebAssembly bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::CompilationFailed`] if the bytes are not a
    /// valid core module.
    #[instrument(skip(engine, bytes), fields(bytes_len = bytes.len()))]
    pub fn from_bytes(engine: &Engine, bytes: &[u8]) -> Result<Self, RuntimeError> {
        let start = Instant::now();

        Self::validate_wasm_header(bytes)?;

        let module = Module::new(engine, bytes).map_err(|e| {
            RuntimeError::compilation_failed(format!("Core module compilation failed: {e}"))
        })?;

        Ok(Self::compiled(module, bytes, start, "Core module compiled"))
    }

    /// Compile a core module from WAT (WebAssembly Text Format).
    #[instrument(skip(engine, wat))]
    pub fn from_wat(engine: &Engine, wat: &str) -> Result<Self, RuntimeError> {
        let start = Instant::now();

        let module = Module::new(engine, wat).map_err(|e| {
            RuntimeError::compilation_failed(format!("WAT compilation failed: {e}"))
        })?;

        Ok(Self::compiled(module, wat.as_bytes(), start, "WAT module compiled"))
    }

    /// Read and compile a guest from disk.
    ///
    /// Files starting with the wasm magic number are compiled as binary;
    /// anything else is parsed as WAT.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ModuleNotFound`] if the file does not exist,
    /// [`RuntimeError::Io`] for other read failures, and
    /// [`RuntimeError::CompilationFailed`] if compilation fails.
    #[instrument(skip(engine, path), fields(path = %path.as_ref().display()))]
    pub fn from_file(engine: &Engine, path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RuntimeError::module_not_found(path.display().to_string())
            } else {
                RuntimeError::Io(e)
            }
        })?;

        if bytes.starts_with(WASM_MAGIC) {
            return Self::from_bytes(engine, &bytes);
        }

        let wat = std::str::from_utf8(&bytes).map_err(|_| {
            RuntimeError::compilation_failed(format!(
                "{} is neither a wasm binary nor WAT text",
                path.display()
            ))
        })?;
        Self::from_wat(engine, wat)
    }

    fn compiled(module: Module, source: &[u8], start: Instant, message: &str) -> Self {
        let content_hash = compute_hash(source);

        info!(
            content_hash = %content_hash,
            duration_ms = start.elapsed().as_millis(),
            "{message}"
        );

        Self {
            module,
            content_hash,
            compiled_at: Instant::now(),
        }
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn compiled_at(&self) -> Instant {
        self.compiled_at
    }

    pub fn as_core_module(&self) -> &Module {
        &self.module
    }

    /// Names of the functions the module imports from `module`.
    pub fn imports_from<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.module
            .imports()
            .filter(move |import| import.module() == module)
            .map(|import| import.name())
    }

    /// Whether the module exports a function called `name`.
    pub fn exports_func(&self, name: &str) -> bool {
        self.module
            .get_export(name)
            .is_some_and(|ty| ty.func().is_some())
    }

    fn validate_wasm_header(bytes: &[u8]) -> Result<(), RuntimeError> {
        if bytes.len() < 8 {
            return Err(RuntimeError::compilation_failed(
                "Invalid Wasm: file too small",
            ));
        }

        if !bytes.starts_with(WASM_MAGIC) {
            return Err(RuntimeError::compilation_failed(
                "Invalid Wasm: bad magic number",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("content_hash", &self.content_hash)
            .finish_non_exhaustive()
    }
}

fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
