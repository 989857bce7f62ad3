//! Command-line front end.
//!
//! Runs the bring-up and teardown sequences against the simulated device,
//! prints what happened and optionally saves the register trace. Also dumps
//! the calibration programs as JSON.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use capture_bringup::calibration::{CalibrationProgram, CALIBRATION_TABLE_VERSION};
use capture_bringup::pipeline::RecordingPipeline;
use capture_bringup::session::TeardownOutcome;
use capture_bringup::signal::{self, HDMI_PRESENT};
use capture_bringup::transport::simulated::{SimulatedDevice, Trace};
use capture_bringup::{
    CaptureSession, DeviceRevision, InputSource, PollPolicy, SessionConfig, VerificationPolicy,
};

#[derive(Parser)]
#[command(name = "capture-bringup")]
#[command(about = "Dry-run the capture device bring-up sequence against a simulated device")]
#[command(version)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bring the simulated device up (and optionally down again)
    Bringup(BringupArgs),

    /// Print a calibration program as JSON
    Program(ProgramArgs),
}

#[derive(clap::Args)]
struct BringupArgs {
    /// JSON session configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device revision (a or b); overrides the configuration file
    #[arg(short, long)]
    revision: Option<DeviceRevision>,

    /// Input source (auto, hdmi, component, composite); overrides the configuration file
    #[arg(short, long)]
    input: Option<InputSource>,

    /// Give up on any device poll after this many attempts
    #[arg(long)]
    bounded: Option<u32>,

    /// Delay between poll attempts, in milliseconds
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Abort on the first verification mismatch
    #[arg(long)]
    strict: bool,

    /// Signal status the simulated device reports (hex)
    #[arg(long, value_parser = parse_hex_u16)]
    signal_status: Option<u16>,

    /// Script the documented answers for every verification read
    #[arg(long)]
    scripted: bool,

    /// Run the teardown sequence after bring-up
    #[arg(long)]
    teardown: bool,

    /// Save the register trace to this file
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Trace file format
    #[arg(short, long, value_enum, default_value_t = TraceFormat::Json)]
    format: TraceFormat,
}

#[derive(clap::Args)]
struct ProgramArgs {
    /// Device revision (a or b)
    #[arg(short, long, default_value = "a")]
    revision: DeviceRevision,

    /// Input source (hdmi, component, composite)
    #[arg(short, long, default_value = "hdmi")]
    input: InputSource,

    /// Which program to print
    #[arg(short, long, value_enum, default_value_t = Stage::FrontEnd)]
    stage: Stage,
}

#[derive(Clone, Copy, ValueEnum)]
enum TraceFormat {
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum Stage {
    FrontEnd,
    PostActivation,
    Quiesce,
}

#[derive(Serialize)]
struct ProgramDump<'a> {
    version: &'static str,
    revision: DeviceRevision,
    input_source: InputSource,
    steps: usize,
    program: &'a CalibrationProgram,
}

fn parse_hex_u16(value: &str) -> std::result::Result<u16, String> {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{value}': {e}"))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn session_config(args: &BringupArgs) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => SessionConfig::default(),
    };

    if let Some(revision) = args.revision {
        config.revision = revision;
    }
    if let Some(source) = args.input {
        config = config.input_source(source);
    }
    if let Some(attempts) = args.bounded {
        config = config.poll(PollPolicy::bounded(
            attempts,
            Duration::from_millis(args.interval_ms),
        ));
    }
    if args.strict {
        config = config.verification(VerificationPolicy::Strict);
    }
    Ok(config)
}

fn simulated_device(args: &BringupArgs, config: &SessionConfig) -> Result<SimulatedDevice> {
    let mut device = SimulatedDevice::new(config.revision);
    if let Some(status) = args.signal_status {
        device = device.with_signal_status(status);
    }
    if args.scripted {
        let source = match config.input_source {
            InputSource::Unknown => {
                let status = args.signal_status.unwrap_or(HDMI_PRESENT);
                signal::detect(status).with_context(|| {
                    format!("scripting answers for signal status 0x{status:04x}")
                })?
            }
            source => source,
        };
        device.script_from_program(&CalibrationProgram::front_end(config.revision, source));
        device.script_from_program(&CalibrationProgram::post_activation(source));
        device.script_from_program(&CalibrationProgram::quiesce());
    }
    Ok(device)
}

fn save_trace(trace: &Trace, path: &Path, format: TraceFormat) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating trace file {}", path.display()))?;
    let writer = BufWriter::new(file);
    match format {
        TraceFormat::Json => trace.write_json(writer),
        TraceFormat::Csv => trace.write_csv(writer),
    }
    .with_context(|| format!("writing trace {}", path.display()))?;
    println!("Trace:        {} events -> {}", trace.len(), path.display());
    Ok(())
}

fn run_bringup(args: BringupArgs) -> Result<()> {
    let config = session_config(&args)?;
    let device = simulated_device(&args, &config)?;
    let trace = device.trace();
    let pipeline = RecordingPipeline::new(trace.clone());

    let mut session = CaptureSession::new(device, pipeline, config);
    let result = session.bring_up();

    // keep the trace of a failed run; it shows where the sequence stopped
    if let Some(path) = &args.trace {
        save_trace(&trace, path, args.format)?;
    }
    let report = result.context("bring-up failed")?;

    println!("Revision:     {}", session.config().revision);
    println!("Firmware:     {}", report.firmware_version);
    println!(
        "Input:        {}{}",
        report.input_source,
        if report.auto_detected { " (auto-detected)" } else { "" }
    );
    println!("Flashed:      {}", if report.flashed { "yes" } else { "no, reset" });
    let phases: Vec<String> = report.phases.iter().map(|p| p.to_string()).collect();
    println!("Phases:       {}", phases.join(" -> "));
    println!("Mismatches:   {}", report.mismatches.len());
    for mismatch in &report.mismatches {
        println!(
            "  {}: expected {:02x?}, got {:02x?}",
            mismatch.context, mismatch.expected, mismatch.actual
        );
    }

    if args.teardown {
        let outcome = session.teardown().context("teardown failed")?;
        let outcome = match outcome {
            TeardownOutcome::AlreadyQuiesced => "already quiesced",
            TeardownOutcome::Quiesced => "reset",
        };
        println!("Teardown:     {outcome}");
        if let Some(path) = &args.trace {
            save_trace(&trace, path, args.format)?;
        }
    }
    Ok(())
}

fn run_program(args: ProgramArgs) -> Result<()> {
    let program = match args.stage {
        Stage::FrontEnd => CalibrationProgram::front_end(args.revision, args.input),
        Stage::PostActivation => CalibrationProgram::post_activation(args.input),
        Stage::Quiesce => CalibrationProgram::quiesce(),
    };

    let document = ProgramDump {
        version: CALIBRATION_TABLE_VERSION,
        revision: args.revision,
        input_source: args.input,
        steps: program.len(),
        program: &program,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &document).context("writing program")?;
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Bringup(args) => run_bringup(args),
        Command::Program(args) => run_program(args),
    }
}
