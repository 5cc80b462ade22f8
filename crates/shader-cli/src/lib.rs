//! Shader CLI Library
//!
//! Argument parsing, TOML configuration and command execution for the
//! `shader-cli` binary. Kept separate from `main` so commands can run
//! against any [`shader_driver::CompilerLoader`].

pub mod cli;
pub mod config;
pub mod run;

pub use cli::{Cli, Command, CompileArgs, ReportFormat};
pub use config::CliConfig;
pub use run::{compile_file, execute, exit_code, probe, Outcome, ProbeReport, ERROR_EXIT_CODE};
