//! Operator command line for the hardware-in-the-loop harness

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use liftoff_hil::transports::serial::available_ports;
use liftoff_hil::{
    EventSummaryPlotter, Harness, HarnessConfig, HarnessError, ScriptedTransport, SessionEnd,
    SessionReport,
};

/// Feed a simulated trajectory to a flight computer and record its telemetry
#[derive(Debug, Parser)]
#[command(name = "liftoff-hil", version, about)]
struct Cli {
    /// Serial port name, e.g. COM3 or /dev/ttyUSB0 (a capture file with --replay)
    #[arg(required_unless_present = "list_ports")]
    port: Option<String>,

    /// Text file with time (s) and altitude (m) columns
    #[arg(required_unless_present = "list_ports")]
    trajectory: Option<PathBuf>,

    /// Device time (s) at which the simulated flight starts
    #[arg(required_unless_present = "list_ports", allow_negative_numbers = true)]
    delay: Option<f64>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to wait after opening the port before the handshake
    #[arg(long)]
    settling_delay: Option<f64>,

    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Print the available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Treat PORT as a recorded capture of device output instead of a serial device
    #[arg(long)]
    replay: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "liftoff_hil=debug" } else { "liftoff_hil=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn print_available_ports() {
    println!("\n Available serial ports:");
    for port in available_ports() {
        println!(" -  {}", port);
    }
}

fn report_pre_session(error: &HarnessError) {
    eprintln!("{}", error);
    if let Some(source) = std::error::Error::source(error) {
        eprintln!("  caused by: {}", source);
    }
    if let HarnessError::TransportUnavailable { available, .. } = error {
        if !available.is_empty() {
            eprintln!("\n Available serial ports:");
            for port in available {
                eprintln!(" -  {}", port);
            }
        }
    }
    for suggestion in error.recovery_suggestions() {
        eprintln!("  hint: {}", suggestion);
    }
}

fn report_session(report: &SessionReport) {
    match &report.end {
        SessionEnd::Liftoff => info!("Session ended on liftoff"),
        SessionEnd::Fault(e) => warn!("Session ended early: {}", e),
    }
    info!(
        frames = report.stats.frames,
        requests = report.stats.requests_answered,
        telemetry = report.stats.telemetry_lines,
        ignored = report.stats.ignored_frames,
        dropped_bytes = report.stats.dropped_bytes,
        "Telemetry recorded to {}",
        report.log_path.display()
    );
}

fn load_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => HarnessConfig::default(),
    };

    if let Some(delay) = cli.delay {
        config.start_delay_s = delay;
    }
    if let Some(settling) = cli.settling_delay {
        config.settling_delay_s = settling;
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list_ports {
        print_available_ports();
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    let (Some(port), Some(trajectory)) = (cli.port.as_deref(), cli.trajectory.as_deref()) else {
        anyhow::bail!("PORT and TRAJECTORY are required");
    };

    let result = if cli.replay {
        match ScriptedTransport::from_capture(port, config.read_chunk) {
            Ok(transport) => Harness::run(transport, trajectory, &config, &EventSummaryPlotter).await,
            Err(e) => Err(e),
        }
    } else {
        Harness::run_serial(port, trajectory, &config, &EventSummaryPlotter).await
    };

    match result {
        Ok(report) => {
            report_session(&report);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_pre_session(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}
