//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use shader_driver::CompileFlags;

#[derive(Debug, Parser)]
#[command(name = "shader-cli", version, about = "Compile HLSL with fallback optimization tiers")]
pub struct Cli {
    /// TOML config with the attempt ladder and compiler module list.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile one HLSL file.
    Compile(CompileArgs),
    /// Report whether a compiler module can be loaded.
    Probe,
}

#[derive(Debug, Clone, Args)]
pub struct CompileArgs {
    /// HLSL source file.
    pub input: PathBuf,

    /// Target profile, e.g. ps_4_0 or vs_3_0.
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Where to write the bytecode. Defaults to the input with a `.cso` extension.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Use the standard ladder over these flags instead of the configured one,
    /// e.g. "optimization_level3 | ieee_strictness".
    #[arg(long)]
    pub flags: Option<CompileFlags>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}

impl CompileArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("cso"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Diagnostic log on stderr.
    Text,
    /// JSON report on stdout.
    Json,
}
