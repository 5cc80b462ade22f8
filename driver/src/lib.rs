//! Shader Driver Library
//!
//! Compiles HLSL through the system `D3DCompile` with graceful degradation:
//! each shader is tried against an ordered ladder of optimization-flag
//! configurations until one compiles, the compiler runs out of memory, or the
//! ladder is exhausted.
//!
//! # Layout
//!
//! - [`capability`]: the `ShaderCompiler` / `CompilerLoader` seam
//! - [`driver`]: `CompilationDriver`, the attempt loop
//! - [`attempt`]: fallback configurations and the per-call state machine
//! - [`diagnostics`]: the append-only `DiagnosticLog`
//! - [`flags`]: `CompileFlags` and `HResult`
//! - [`d3d`]: the `libloading`-backed compiler
//!
//! # Usage
//!
//! ```rust,no_run
//! use shader_driver::{
//!     AttemptConfiguration, CompilationDriver, CompileFlags, D3DCompilerLoader, DiagnosticLog,
//! };
//!
//! let mut driver = CompilationDriver::new(D3DCompilerLoader::from_env());
//! driver.initialize()?;
//!
//! let ladder = AttemptConfiguration::standard_ladder(CompileFlags::OPTIMIZATION_LEVEL3);
//! let mut log = DiagnosticLog::new();
//! let hlsl = "float4 main() : SV_Target { return float4(1, 0, 0, 1); }";
//! match driver.compile_to_binary(&mut log, hlsl, "ps_4_0", &ladder)? {
//!     Some(artifact) => println!("{} bytes via {}", artifact.blob.len(), artifact.configuration),
//!     None => eprintln!("{log}"),
//! }
//! # Ok::<(), shader_driver::DriverError>(())
//! ```

pub mod attempt;
pub mod capability;
pub mod d3d;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod flags;

pub use attempt::{AttemptConfiguration, AttemptState};
pub use capability::{
    CompileRequest, CompilerLoader, Invocation, InvocationStatus, LoadOutcome, RetryCategory,
    ShaderBlob, ShaderCompiler, ENTRY_POINT, SOURCE_PATH_LABEL,
};
pub use d3d::{D3DCompiler, D3DCompilerLoader};
pub use diagnostics::{sanitize, AttemptOutcome, AttemptRecord, DiagnosticLog, EntryKind, LogEntry};
pub use driver::{Availability, CompilationDriver, CompiledArtifact};
pub use error::{DriverError, DriverResult, LoadError};
pub use flags::{CompileFlags, FlagParseError, HResult};
