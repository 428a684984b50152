//! Welcome page built through the typed `Window` / `Document` facades.

use hostlink_bindings::{programs, ImportHost};

#[no_mangle]
pub extern "C" fn _start() {
    if let Err(err) = programs::welcome_page(&ImportHost::new()) {
        panic!("welcome page failed: {err}");
    }
}
