//! The three example programs.
//!
//! Each is a straight sequence of host calls. They are written against the
//! [`Host`] capability so the CLI can run them in-process and the guest crates
//! under `demos/` can run them inside wasm.

use std::io::Write;
use std::path::Path;

use hostlink_common::{HostError, WasiError};

use crate::{Host, wasi, web};

pub const WELCOME_TITLE: &str = "Welcome page";
pub const HEADER_TAG: &str = "h1";
pub const HEADER_TEXT: &str = "oh hi mark";

pub const CONSOLE_MESSAGE: &str = "I'm in the console";
pub const LOG_FILE: &str = "./log.txt";
pub const LOG_CONTENTS: &[u8] = b"I'm in the file\n";
pub const LOG_MODE: u32 = 0o644;

/// Build the welcome page with the generic get/set/call operations only.
///
/// Every handle obtained is released before returning.
pub fn welcome_page_raw<H: Host + ?Sized>(host: &H) -> Result<(), HostError> {
    let window = host.global();
    let doc = host.get_object(window, "document")?;
    host.set(doc, "title", WELCOME_TITLE.into())?;
    let header = host
        .call(doc, "createElement", &[HEADER_TAG.into()])?
        .as_handle()?;
    host.set(header, "innerText", HEADER_TEXT.into())?;
    let body = host.get_object(doc, "body")?;
    let appended = host
        .call(body, "appendChild", &[header.into()])?
        .as_handle()?;

    for handle in [appended, body, header, doc] {
        host.release(handle);
    }
    Ok(())
}

/// Build the welcome page through the typed facades.
pub fn welcome_page<H: Host + ?Sized>(host: &H) -> Result<(), HostError> {
    let window = web::window(host);
    let doc = window.document()?;
    doc.set_title(WELCOME_TITLE)?;
    let header = doc.create_element(HEADER_TAG)?;
    header.set_text(HEADER_TEXT)?;
    let body = doc.body()?;
    body.node().append_child(header.node())?.release();

    body.release();
    header.release();
    doc.release();
    Ok(())
}

/// Print the console line, then write the log file at `path`.
///
/// The console write is not checked; the file write error is returned for
/// the caller to treat as fatal.
pub fn console_and_log_file(out: &mut impl Write, path: impl AsRef<Path>) -> Result<(), WasiError> {
    let _ = wasi::write_line(out, CONSOLE_MESSAGE);
    wasi::write_file(path, LOG_CONTENTS, LOG_MODE)
}
