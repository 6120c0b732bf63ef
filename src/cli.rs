use crate::{
    adapters::{Prober, Runner, Splitter, TextConverter},
    config::Config,
    engine::NativeEngine,
    envelope::serve,
    util::ensure_dir,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "quack-adapters")]
#[command(about = "JSON-over-stdio PDF adapters: read one request on stdin, print one response")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./quack-adapters.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error). Logs go to stderr.
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// `{"cmd": "doctor"}` or `{"cmd": "convert", "req": .., "cfg": ..}`.
    Runner {},
    /// Native text-layer conversion: `{"cmd": "convert", "req": .., "cfg": ..}`.
    Text {},
    /// `{"input_pdf", "out_dir", "chunks": [{"start_page", "end_page"}]}`.
    Split {},
    /// `{"input_pdf", "sample_pages"}`.
    Probe {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    run(args, stdin, stdout)
}

/// Serves one request from `input` to `output` with the adapter `args` selects.
///
/// Config and log-file problems are logged and never cost the caller its
/// structured response.
pub fn run(args: Args, input: impl Read, output: impl Write) -> Result<()> {
    let (cfg, cfg_err) = match load_config(args.config.as_deref()) {
        Ok(cfg) => (cfg, None),
        Err(err) => (Config::default(), Some(err)),
    };
    let _guard = init_logging(&args, &cfg);
    if let Some(err) = cfg_err {
        error!("{:#}; using built-in defaults", err);
    }

    let engine = NativeEngine::new(&cfg);
    debug!(cmd = ?args.cmd, "dispatch");
    match args.cmd {
        Command::Runner {} => serve(&Runner::new(engine), input, output),
        Command::Text {} => serve(&TextConverter::new(engine), input, output),
        Command::Split {} => serve(&Splitter::new(engine), input, output),
        Command::Probe {} => {
            let default_sample_pages = cfg.probe.default_sample_pages;
            serve(&Prober::new(engine, default_sample_pages), input, output)
        }
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let default = PathBuf::from("quack-adapters.toml");
    if default.exists() {
        Config::load(&default)
    } else {
        Ok(Config::default())
    }
}

/// Installs the global subscriber. An unusable log file falls back to stderr only.
fn init_logging(args: &Args, cfg: &Config) -> Option<WorkerGuard> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the response; everything else goes to stderr.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let mut file_err = None;
    let (file_layer, guard) = match resolve_log_path(cfg).map(|p| open_log_file(&p)) {
        Some(Ok(file)) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        Some(Err(err)) => {
            file_err = Some(err);
            (None, None)
        }
        None => (None, None),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        // Already installed by an embedding process; keep theirs.
        debug!("logging already initialised: {e}");
    }
    if let Some(err) = file_err {
        error!("{:#}; logging to stderr only", err);
    }

    guard
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file: {}", path.display()))
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from("quack-adapters.log"))
}
