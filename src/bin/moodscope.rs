use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use moodscope::config::AppConfig;
use moodscope::engine::{EngineHandle, WebSocketSource};
use moodscope::error::log_connection_error;
use moodscope::fixtures::{ExpectationDiff, RecordingCatalog, ReplayReport, ReplayRunner};
use moodscope::telemetry::LifecyclePhase;
use moodscope::{http, overlay};

#[derive(Parser, Debug)]
#[command(
    name = "moodscope",
    about = "Live pitch/loudness mood monitor and deterministic replay harness"
)]
struct Cli {
    /// Configuration file (defaults to assets/moodscope_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override directory containing recordings (defaults to fixtures/)
    #[arg(long, global = true)]
    fixtures_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to a live feed and print the status overlay
    Listen {
        /// WebSocket URL (defaults to connection.url from the config)
        #[arg(long)]
        url: Option<String>,
        /// Print JSON snapshots instead of the text overlay
        #[arg(long)]
        json: bool,
    },
    /// Replay a recording and optionally compare against expectations
    Replay {
        #[arg(long)]
        recording: String,
        #[arg(long)]
        expect: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Simulated spacing between messages (defaults to replay.message_interval_ms)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// List available recordings on disk
    DumpRecordings,
    /// Print the effective configuration as JSON
    DumpConfig,
}

fn main() -> ExitCode {
    moodscope::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_ref()
        .map(AppConfig::load_from_file)
        .unwrap_or_else(AppConfig::load);
    let catalog = cli
        .fixtures_dir
        .map(RecordingCatalog::new)
        .unwrap_or_default();

    match cli.command {
        Commands::Listen { url, json } => run_listen(config, url, json),
        Commands::Replay {
            recording,
            expect,
            output,
            interval_ms,
        } => run_replay(&catalog, config, &recording, expect, output, interval_ms),
        Commands::DumpRecordings => run_dump(&catalog),
        Commands::DumpConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

fn run_listen(config: AppConfig, url: Option<String>, json: bool) -> Result<ExitCode> {
    let url = url.unwrap_or_else(|| config.connection.url.clone());
    let connection = config.connection.clone();
    let redraw = Duration::from_millis(config.presentation.redraw_interval_ms.max(1));

    let handle = Arc::new(EngineHandle::from_config(config));
    http::spawn_if_enabled(Arc::clone(&handle));

    let shutdown = Arc::new(AtomicBool::new(false));
    watch_ctrl_c(Arc::clone(&shutdown));
    let presenter = spawn_presenter(Arc::clone(&handle), Arc::clone(&shutdown), redraw, json);

    let hub = Arc::clone(handle.telemetry());
    let mut failed_attempts = 0u32;
    let result = loop {
        hub.record_connection_phase(LifecyclePhase::Connecting);
        match WebSocketSource::connect(&url, connection.frame_queue_capacity) {
            Ok(source) => {
                failed_attempts = 0;
                hub.record_connection_phase(LifecyclePhase::Connected);
                let mut source = source.with_shutdown(Arc::clone(&shutdown));
                match handle.run_source(&mut source, &shutdown) {
                    Ok(stats) => log::info!(
                        "[Listen] Feed stopped after {} messages ({} dropped)",
                        stats.messages_processed,
                        stats.messages_dropped
                    ),
                    Err(err) => log_connection_error(&err, "listen"),
                }
                hub.record_connection_phase(LifecyclePhase::Disconnected);
            }
            Err(err) => {
                log_connection_error(&err, "listen");
                if !err.is_transient() {
                    break Err(anyhow!(err));
                }
            }
        }

        if shutdown.load(Ordering::SeqCst) {
            break Ok(ExitCode::from(0));
        }

        failed_attempts += 1;
        if failed_attempts > connection.max_reconnect_attempts {
            hub.record_connection_phase(LifecyclePhase::GaveUp);
            break Err(anyhow!(
                "giving up on {} after {} reconnect attempts",
                url,
                connection.max_reconnect_attempts
            ));
        }

        hub.record_connection_phase(LifecyclePhase::Reconnecting);
        log::info!(
            "[Listen] Reconnecting in {}ms (attempt {}/{})",
            connection.reconnect_delay_ms,
            failed_attempts,
            connection.max_reconnect_attempts
        );
        sleep_unless_shutdown(Duration::from_millis(connection.reconnect_delay_ms), &shutdown);
    };

    shutdown.store(true, Ordering::SeqCst);
    if presenter.join().is_err() {
        log::warn!("[Listen] Presenter thread panicked");
    }
    result
}

fn watch_ctrl_c(shutdown: Arc<AtomicBool>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                log::warn!("[Listen] Ctrl-C handler unavailable: {}", err);
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            log::info!("[Listen] Shutdown requested");
            shutdown.store(true, Ordering::SeqCst);
        }
    });
}

fn spawn_presenter(
    handle: Arc<EngineHandle>,
    shutdown: Arc<AtomicBool>,
    redraw: Duration,
    json: bool,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut last_seen = 0u64;
        while !shutdown.load(Ordering::SeqCst) {
            let snapshot = handle.snapshot();
            if snapshot.messages_received != last_seen {
                last_seen = snapshot.messages_received;
                if json {
                    match serde_json::to_string(&snapshot) {
                        Ok(line) => println!("{line}"),
                        Err(err) => log::warn!("[Listen] Failed to encode snapshot: {}", err),
                    }
                } else {
                    println!("{}", overlay::status_line(&snapshot));
                }
            }
            thread::sleep(redraw);
        }
    })
}

fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let step = Duration::from_millis(50);
    let mut remaining = total;
    while !remaining.is_zero() && !shutdown.load(Ordering::SeqCst) {
        let nap = remaining.min(step);
        thread::sleep(nap);
        remaining -= nap;
    }
}

fn run_replay(
    catalog: &RecordingCatalog,
    config: AppConfig,
    recording: &str,
    override_expect: Option<PathBuf>,
    output_path: Option<PathBuf>,
    interval_ms: Option<u64>,
) -> Result<ExitCode> {
    let data = catalog.load(recording, override_expect)?;
    let runner = ReplayRunner::new(config).with_message_interval(interval_ms.unwrap_or(0));
    let report = runner
        .run(&data)
        .with_context(|| format!("replaying recording {}", recording))?;

    emit_report(&report, output_path)?;

    if let Some(expectations) = data.expectations {
        match expectations.verify(&report) {
            Ok(()) => Ok(ExitCode::from(0)),
            Err(diff) => {
                emit_diff(&diff)?;
                Ok(ExitCode::from(2))
            }
        }
    } else {
        Ok(ExitCode::from(0))
    }
}

fn run_dump(catalog: &RecordingCatalog) -> Result<ExitCode> {
    let recordings = catalog.discover()?;
    if recordings.is_empty() {
        println!("No recordings found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in recordings {
        if let Some(expect) = metadata.expect_path {
            println!("{} -> {}", metadata.name, expect.display());
        } else {
            println!("{}", metadata.name);
        }
    }
    Ok(ExitCode::from(0))
}

fn emit_report(report: &ReplayReport, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn emit_diff(diff: &ExpectationDiff) -> Result<()> {
    let json = serde_json::to_string_pretty(&diff.to_json())?;
    eprintln!("{json}");
    Ok(())
}
