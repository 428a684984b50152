//! Welcome page built with the raw `get` / `set` / `call` imports.
//!
//! Build with `cargo build --release --target wasm32-unknown-unknown`, then
//! `hostlink run target/wasm32-unknown-unknown/release/dom_raw.wasm`.

use hostlink_bindings::{programs, ImportHost};

#[no_mangle]
pub extern "C" fn _start() {
    if let Err(err) = programs::welcome_page_raw(&ImportHost::new()) {
        panic!("welcome page failed: {err}");
    }
}
