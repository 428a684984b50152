//! Console line plus `./log.txt`, for `wasm32-wasip1`.
//!
//! `hostlink run --dir <out> target/wasm32-wasip1/release/wasi-log.wasm`
//! writes `<out>/log.txt`. A failed write exits with status 1.

use std::process::ExitCode;

use hostlink_bindings::programs;

fn main() -> ExitCode {
    match programs::console_and_log_file(&mut std::io::stdout(), programs::LOG_FILE) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
