//! Command execution, independent of process setup so it can be driven with
//! any compiler loader.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use shader_driver::{
    Availability, AttemptConfiguration, CompilationDriver, CompilerLoader, DiagnosticLog,
    DriverError, ShaderCompiler,
};
use tracing::{info, warn};

use crate::cli::{Cli, Command, CompileArgs, ReportFormat};
use crate::config::CliConfig;

/// Exit code for a command that never reached the compiler: unreadable
/// input, bad config, missing profile.
pub const ERROR_EXIT_CODE: u8 = 4;

/// How a command ended; maps onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Compiled,
    NothingToCompile,
    /// `probe` found a usable compiler.
    Ready,
    /// Every configuration failed.
    Exhausted,
    OutOfMemory,
    NoCompiler,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Compiled | Self::NothingToCompile | Self::Ready => 0,
            Self::Exhausted => 1,
            Self::OutOfMemory => 2,
            Self::NoCompiler => 3,
        }
    }
}

/// Process exit code for a finished command, including ones that errored
/// before an [`Outcome`] existed.
pub fn exit_code(result: &Result<Outcome>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => ERROR_EXIT_CODE,
    }
}

/// Load config, bring up the system compiler and run the parsed command.
pub fn execute(cli: &Cli) -> Result<Outcome> {
    let config = CliConfig::load_or_default(cli.config.as_deref())?;
    let loader = config.loader();
    info!(
        modules = ?loader.module_names,
        preloaded = ?loader.preloaded_names,
        "Shader CLI starting"
    );

    let mut driver = CompilationDriver::new(loader);
    if let Err(e) = driver.initialize() {
        warn!("Shader compiler not available: {e}");
    }

    match &cli.command {
        Command::Probe => {
            let report = probe(&driver);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if driver.is_available() {
                Outcome::Ready
            } else {
                Outcome::NoCompiler
            })
        }
        Command::Compile(args) => compile_file(
            &driver,
            args,
            &config,
            &mut std::io::stdout().lock(),
            &mut std::io::stderr().lock(),
        ),
    }
}

#[derive(Debug, Serialize)]
struct CompileReport<'a> {
    input: &'a PathBuf,
    profile: &'a str,
    outcome: Outcome,
    configuration: Option<&'a str>,
    output: Option<PathBuf>,
    #[serde(flatten)]
    log: &'a DiagnosticLog,
}

/// Compile `args.input` with an already-initialized driver.
///
/// Bytecode goes to `args.output_path()`. The report goes to `out` (JSON) or
/// `err` (text log).
pub fn compile_file<L, O, E>(
    driver: &CompilationDriver<L>,
    args: &CompileArgs,
    config: &CliConfig,
    out: &mut O,
    err: &mut E,
) -> Result<Outcome>
where
    L: CompilerLoader,
    O: Write,
    E: Write,
{
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let source = String::from_utf8(bytes).with_context(|| {
        format!(
            "{} is not valid UTF-8; re-save the shader as UTF-8",
            args.input.display()
        )
    })?;
    let profile = config
        .resolve_profile(args.profile.as_deref())
        .context("No target profile; pass --profile or set one in the config")?;
    let configurations = match args.flags {
        Some(flags) => AttemptConfiguration::standard_ladder(flags),
        None => config.configurations(),
    };

    let mut log = DiagnosticLog::new();
    // An empty file needs no compiler, so it succeeds even when none loaded.
    let (outcome, artifact) = if source.is_empty() {
        (Outcome::NothingToCompile, None)
    } else {
        match driver.compile_to_binary(&mut log, &source, &profile, &configurations) {
            Ok(Some(artifact)) => (Outcome::Compiled, Some(artifact)),
            Ok(None) => (Outcome::Exhausted, None),
            Err(DriverError::OutOfMemory { .. }) => (Outcome::OutOfMemory, None),
            Err(e @ (DriverError::Unavailable(_) | DriverError::Load(_))) => {
                warn!(error = %e, "Cannot compile");
                (Outcome::NoCompiler, None)
            }
        }
    };

    let output = match &artifact {
        Some(artifact) => {
            let path = args.output_path();
            std::fs::write(&path, artifact.blob.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(
                path = %path.display(),
                bytes = artifact.blob.len(),
                configuration = %artifact.configuration,
                "Wrote shader bytecode"
            );
            Some(path)
        }
        None => None,
    };

    match args.report {
        ReportFormat::Text => {
            if !log.entries().is_empty() {
                write!(err, "{}", log.render())?;
            }
            match outcome {
                Outcome::NothingToCompile => writeln!(err, "nothing to compile")?,
                Outcome::Exhausted => writeln!(
                    err,
                    "error: {} failed to compile with all {} configurations",
                    args.input.display(),
                    configurations.len()
                )?,
                Outcome::OutOfMemory => writeln!(err, "error: shader compiler ran out of memory")?,
                Outcome::NoCompiler => writeln!(err, "error: no shader compiler available")?,
                Outcome::Compiled | Outcome::Ready => {}
            }
        }
        ReportFormat::Json => {
            let report = CompileReport {
                input: &args.input,
                profile: &profile,
                outcome,
                configuration: artifact.as_ref().map(|a| a.configuration.as_str()),
                output,
                log: &log,
            };
            serde_json::to_writer_pretty(&mut *out, &report).context("Failed to write report")?;
            writeln!(out)?;
        }
    }

    Ok(outcome)
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub availability: Availability,
    pub compiler: Option<String>,
}

/// Describe what `initialize` found.
pub fn probe<L: CompilerLoader>(driver: &CompilationDriver<L>) -> ProbeReport {
    ProbeReport {
        availability: driver.availability(),
        compiler: driver.compiler().map(|c| c.describe()),
    }
}
