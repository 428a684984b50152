//! Console and file output.
//!
//! Two independent effects, each performed once and never retried. On a
//! `wasm32-wasip1` target the standard library routes both through the WASI
//! host (`fd_write` on stdout, `path_open` + `fd_write` for files).

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use hostlink_common::WasiError;

/// Write `line` followed by a newline.
pub fn write_line(out: &mut impl Write, line: &str) -> io::Result<()> {
    writeln!(out, "{line}")
}

/// Write a line to standard output.
///
/// A closed or broken stdout is the host's concern; the error is dropped.
pub fn console_line(line: &str) {
    let _ = write_line(&mut io::stdout().lock(), line);
}

/// Create or truncate `path` and write `contents` to it.
///
/// `mode` holds Unix permission bits applied when the file is created; it is
/// ignored where the platform has none (including WASI). The bytes are
/// written as given.
///
/// # Errors
///
/// Returns [`WasiError::Write`] when the file cannot be opened or written.
pub fn write_file(path: impl AsRef<Path>, contents: &[u8], mode: u32) -> Result<(), WasiError> {
    let path = path.as_ref();
    let to_error = |source| WasiError::Write {
        path: path.display().to_string(),
        source,
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    set_mode(&mut options, mode);

    let mut file = options.open(path).map_err(to_error)?;
    file.write_all(contents).map_err(to_error)?;
    file.flush().map_err(to_error)?;

    debug!(path = %path.display(), bytes = contents.len(), mode = %format!("{mode:o}"), "File written");
    Ok(())
}

#[cfg(unix)]
fn set_mode(options: &mut OpenOptions, mode: u32) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(mode);
}

#[cfg(not(unix))]
fn set_mode(_options: &mut OpenOptions, _mode: u32) {}
