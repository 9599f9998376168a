use anyhow::{Context, Result};
use clap::Parser;
use hddtemp_core::{
    render_direct, DeviceSpec, DiskReading, OutputStream, ReadingReport, TemperatureUnit,
};
use hddtemp_daemon::{ReadingCache, Server, ShutdownToken};
use hddtemp_smartctl::Smartctl;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;

use config::{Cli, DaemonSettings, DirectSettings, Mode, Settings};

const LOG_ENV: &str = "HDDTEMP_LOG";

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::from_cli(&cli)?;
    let smartctl = Smartctl::from_env();
    tracing::debug!(program = %smartctl.program().display(), "using smartctl");

    match settings.mode {
        Mode::Direct(direct) => run_direct(
            &smartctl,
            &settings.devices,
            settings.wake_up,
            settings.unit,
            &direct,
        ),
        Mode::Daemon(daemon) => {
            run_daemon(smartctl, settings.devices, settings.wake_up, settings.unit, &daemon)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_direct(
    smartctl: &Smartctl,
    devices: &[DeviceSpec],
    wake_up: bool,
    unit: TemperatureUnit,
    settings: &DirectSettings,
) -> Result<ExitCode> {
    if settings.json {
        let readings = devices
            .iter()
            .map(|device| smartctl.read(device, wake_up))
            .collect();
        let report = ReadingReport::new(unit, readings);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(exit_code(report.has_errors()));
    }

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let hard_error = print_direct(
        devices.iter().map(|device| smartctl.read(device, wake_up)),
        settings,
        unit,
        &mut stdout,
        &mut stderr,
    )?;
    Ok(exit_code(hard_error))
}

/// Writes each line as soon as its reading arrives. Returns whether any was a hard error.
fn print_direct(
    readings: impl Iterator<Item = DiskReading>,
    settings: &DirectSettings,
    unit: TemperatureUnit,
    stdout: &mut impl Write,
    stderr: &mut impl Write,
) -> Result<bool> {
    let mut hard_error = false;
    for reading in readings {
        let line = render_direct(&reading, settings.numeric, settings.quiet, unit);
        let out: &mut dyn Write = match line.stream {
            OutputStream::Stdout => &mut *stdout,
            OutputStream::Stderr => &mut *stderr,
        };
        out.write_all(line.text.as_bytes())?;
        out.flush()?;
        hard_error |= line.hard_error;
    }
    Ok(hard_error)
}

fn exit_code(hard_error: bool) -> ExitCode {
    if hard_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_daemon(
    smartctl: Smartctl,
    devices: Vec<DeviceSpec>,
    wake_up: bool,
    unit: TemperatureUnit,
    settings: &DaemonSettings,
) -> Result<()> {
    let cache = Arc::new(ReadingCache::new(
        smartctl,
        devices,
        wake_up,
        settings.min_interval,
    ));
    let server = Server::bind(&settings.bind_addr, cache, settings.separator, unit)
        .with_context(|| format!("start daemon on {}", settings.bind_addr))?;

    let shutdown = ShutdownToken::new();
    spawn_signal_listener(shutdown.clone())?;
    server.serve(&shutdown).context("serve connections")?;
    tracing::info!("daemon stopped");
    Ok(())
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
fn spawn_signal_listener(shutdown: ShutdownToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;
    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            runtime.block_on(wait_for_shutdown_signal());
            shutdown.cancel();
        })
        .context("spawn signal thread")?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(error = %err, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
        _ = terminate.recv() => tracing::info!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received Ctrl-C");
}
