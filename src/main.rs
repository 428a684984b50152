//! hostlink CLI entry point.
//!
//! `hostlink demo <program>` runs one of the built-in programs in-process
//! against the page host or the real file system. `hostlink run <module>`
//! executes a guest under Wasmtime with the `hostlink` imports and WASI
//! preview 1 linked.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use hostlink_bindings::{DomHost, programs};
use hostlink_common::{ConfigFile, LogFormat, LoggingConfig, RuntimeConfig};
use hostlink_core::{CompiledModule, ExecutionResult, InstanceRunner, WasmEngine, create_store};
use hostlink_host::register_all;

const DEFAULT_FILTER: &str = "info,hostlink=debug";

#[derive(Parser)]
#[command(name = "hostlink")]
#[command(version, about = "Drive a page or a WASI environment from WebAssembly", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "HOSTLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run a built-in program in-process
    Demo {
        #[arg(value_enum)]
        program: Demo,

        /// Directory the log file is written to
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Print the page as HTML instead of JSON
        #[arg(long)]
        html: bool,
    },

    /// Run a guest module under Wasmtime
    Run {
        /// Path to a `.wasm` / `.wat` file, or a program id from the config file
        module: String,

        /// Exported function to call
        #[arg(short, long)]
        entry: Option<String>,

        /// Host directory pre-opened for the guest
        #[arg(long, env = "HOSTLINK_DIR")]
        dir: Option<String>,

        /// Pre-open the directory read-only
        #[arg(long)]
        read_only: bool,

        /// Arguments passed to the guest
        #[arg(last = true)]
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Demo {
    /// Welcome page through get/set/call
    DomRaw,
    /// Welcome page through the typed facades
    DomFacade,
    /// Console line plus log file
    WasiLog,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Invalid config file {}", path.display()))?,
        None => ConfigFile::default(),
    };

    init_tracing(&file.logging, cli.json);

    match cli.command {
        Command::Demo { program, dir, html } => {
            run_demo(program, &dir, html, &mut io::stdout().lock())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            module,
            entry,
            dir,
            read_only,
            args,
        } => {
            let options = RunOptions {
                entry,
                dir,
                read_only,
                args,
            };
            run_module(&file, &module, options).await
        }
    }
}

fn init_tracing(logging: &LoggingConfig, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.as_deref().unwrap_or(DEFAULT_FILTER).into());

    // stdout carries program output
    let registry = tracing_subscriber::registry().with(filter);
    if json || logging.format == LogFormat::Json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
}

/// Run a built-in program. DOM programs print the resulting page to `out`.
fn run_demo(program: Demo, dir: &Path, html: bool, out: &mut impl Write) -> anyhow::Result<()> {
    info!(?program, "Running demo");

    if program == Demo::WasiLog {
        let path = dir.join(programs::LOG_FILE);
        programs::console_and_log_file(out, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(());
    }

    let host = DomHost::new();
    match program {
        Demo::DomRaw => programs::welcome_page_raw(&host)?,
        _ => programs::welcome_page(&host)?,
    }
    print_page(&host, html, out)
}

fn print_page(host: &DomHost, html: bool, out: &mut impl Write) -> anyhow::Result<()> {
    if html {
        writeln!(out, "{}", host.render_html())?;
    } else {
        serde_json::to_writer_pretty(&mut *out, &host.snapshot())?;
        writeln!(out)?;
    }
    Ok(())
}

struct RunOptions {
    entry: Option<String>,
    dir: Option<String>,
    read_only: bool,
    args: Vec<String>,
}

/// Apply command-line overrides to the configured runtime.
///
/// Returns the runtime config, module path and entry point for `module`,
/// which is either a program id from the config file or a path.
fn resolve_run(
    file: &ConfigFile,
    module: &str,
    options: RunOptions,
) -> (RuntimeConfig, String, String) {
    let mut config = file.runtime.clone();

    let (path, program_entry) = match file.program(module) {
        Some(program) => (program.path.clone(), program.entry_point.clone()),
        None => (module.to_string(), None),
    };

    if let Some(dir) = options.dir {
        config.wasi.preopen_dir = Some(dir);
    }
    config.wasi.read_only |= options.read_only;
    if !options.args.is_empty() {
        config.wasi.args = std::iter::once(path.clone()).chain(options.args).collect();
    }

    let entry = options
        .entry
        .or(program_entry)
        .unwrap_or_else(|| config.execution.entry_point.clone());

    (config, path, entry)
}

async fn run_module(
    file: &ConfigFile,
    module: &str,
    options: RunOptions,
) -> anyhow::Result<ExitCode> {
    let (config, path, entry) = resolve_run(file, module, options);

    let engine = WasmEngine::new(&config.engine)?;
    let ticker = engine
        .config()
        .epoch_interruption
        .then(|| spawn_epoch_ticker(engine.clone()));

    let mut runner = InstanceRunner::new(engine.shared());
    register_all(runner.linker_mut())?;

    let compiled = CompiledModule::from_file(engine.inner(), &path)
        .with_context(|| format!("Failed to load {path}"))?;

    let run_id = Uuid::new_v4().to_string();
    info!(run_id = %run_id, path = %path, entry = %entry, "Running guest");

    let mut store = create_store(&engine, &config, run_id)?;
    let result = runner.execute_core(&compiled, &mut store, &entry).await;

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    let result = result?;

    let ctx = store.data();
    let mut stdout = io::stdout().lock();
    if let Some(captured) = ctx.stdout() {
        stdout.write_all(&captured)?;
    }
    if compiled.imports_from(hostlink_bindings::abi::IMPORT_MODULE).next().is_some() {
        print_page(&ctx.dom, false, &mut stdout)?;
    }

    match result {
        ExecutionResult::Success => Ok(ExitCode::SUCCESS),
        ExecutionResult::Exit { code } => {
            warn!(code, "Guest exited with non-zero status");
            Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
        }
        ExecutionResult::Trap { message, .. } => bail!("Guest trapped: {message}"),
    }
}

/// Tick the engine epoch every millisecond so deadlines read as milliseconds.
fn spawn_epoch_ticker(engine: WasmEngine) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(1));
        loop {
            interval.tick().await;
            engine.increment_epoch();
        }
    })
}
