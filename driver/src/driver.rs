//! Compilation driver: ordered fallback over flag configurations.
//!
//! Owns the compiler handle and runs each compilation through the
//! configurations it is given, first to last:
//!
//! ```text
//! configuration[i]
//!   ├─ compiled      → return the blob, later configurations never run
//!   ├─ out of memory → abort, DriverError::OutOfMemory
//!   └─ other failure → warn, note the next label, try configuration[i+1]
//! ```
//!
//! Every message the compiler prints lands in the caller's
//! [`DiagnosticLog`], whatever the outcome.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::attempt::{AttemptConfiguration, AttemptState};
use crate::capability::{
    CompileRequest, CompilerLoader, Invocation, InvocationStatus, LoadOutcome, ShaderBlob,
    ShaderCompiler,
};
use crate::diagnostics::{AttemptOutcome, AttemptRecord, DiagnosticLog};
use crate::error::{DriverError, DriverResult};

/// Whether the driver can compile, and why not if it can't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// `initialize` has not run, or the handle was released.
    Uninitialized,
    Available,
    /// The platform has no compiler to load. Not an error.
    Unsupported,
    /// Loading was attempted and failed.
    Missing,
}

impl Availability {
    pub fn can_compile(self) -> bool {
        self == Self::Available
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Available => write!(f, "available"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// Bytecode plus the configuration that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub blob: ShaderBlob,
    pub configuration: String,
    pub attempt: usize,
}

impl CompiledArtifact {
    /// Whether a fallback configuration had to be used.
    pub fn is_degraded(&self) -> bool {
        self.attempt > 0
    }

    pub fn into_blob(self) -> ShaderBlob {
        self.blob
    }
}

/// Drives one compiler through fallback configurations.
///
/// Calls are synchronous and sequential. The compiler is not assumed to be
/// reentrant, so share a driver across threads only behind a lock.
pub struct CompilationDriver<L: CompilerLoader> {
    loader: L,
    compiler: Option<L::Compiler>,
    availability: Availability,
}

impl<L: CompilerLoader> CompilationDriver<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            compiler: None,
            availability: Availability::Uninitialized,
        }
    }

    /// Acquire the compiler.
    ///
    /// A platform without any compiler is a soft success: the driver reports
    /// [`Availability::Unsupported`] and `compile_to_binary` refuses to run.
    pub fn initialize(&mut self) -> DriverResult<()> {
        if self.compiler.is_some() {
            return Ok(());
        }

        match self.loader.load() {
            Ok(LoadOutcome::Loaded(compiler)) => {
                info!(compiler = %compiler.describe(), "Shader compiler initialized");
                self.compiler = Some(compiler);
                self.availability = Availability::Available;
                Ok(())
            }
            Ok(LoadOutcome::Unsupported) => {
                info!("No shader compiler on this platform; compilation disabled");
                self.availability = Availability::Unsupported;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "No shader compiler module found");
                self.availability = Availability::Missing;
                Err(e.into())
            }
        }
    }

    /// Drop the compiler handle. Safe to call any number of times.
    pub fn release(&mut self) {
        if let Some(compiler) = self.compiler.take() {
            debug!(compiler = %compiler.describe(), "Releasing shader compiler");
            drop(compiler);
            self.availability = Availability::Uninitialized;
        }
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn is_available(&self) -> bool {
        self.availability.can_compile()
    }

    pub fn compiler(&self) -> Option<&L::Compiler> {
        self.compiler.as_ref()
    }

    /// Compile `source` for `profile` (`ps_4_0`, `vs_3_0`, ...), trying
    /// `configurations` in order.
    ///
    /// Returns `Ok(Some(_))` for the first configuration that compiles,
    /// `Ok(None)` when `source` is empty or every configuration failed, and
    /// `Err(DriverError::OutOfMemory)` as soon as the compiler runs out of
    /// memory. `log` is only appended to.
    pub fn compile_to_binary(
        &self,
        log: &mut DiagnosticLog,
        source: &str,
        profile: &str,
        configurations: &[AttemptConfiguration],
    ) -> DriverResult<Option<CompiledArtifact>> {
        let compiler = match &self.compiler {
            Some(compiler) if self.availability.can_compile() => compiler,
            _ => return Err(DriverError::Unavailable(self.availability)),
        };

        if source.is_empty() {
            debug!(profile, "Empty shader source; nothing to compile");
            return Ok(None);
        }

        let total = configurations.len();
        let mut state = AttemptState::start(total);

        while let AttemptState::Attempting(i) = state {
            let config = &configurations[i];
            let request = CompileRequest::new(source, profile, config.flags);
            let Invocation {
                status,
                diagnostics,
            } = compiler.compile(&request);

            let had_diagnostics = diagnostics.is_some();
            if let Some(message) = diagnostics {
                log.append_sanitized(&message);
                trace!("\n{source}");
                trace!("\n{message}");
            }

            log.record_attempt(AttemptRecord {
                index: i,
                label: config.label.clone(),
                flags: config.flags,
                outcome: match &status {
                    InvocationStatus::Compiled(blob) => AttemptOutcome::Compiled { bytes: blob.len() },
                    InvocationStatus::Failed(code) => AttemptOutcome::Failed { code: *code },
                    InvocationStatus::OutOfMemory => AttemptOutcome::OutOfMemory,
                },
                had_diagnostics,
            });

            let next = state.advance(status.retry_category(), total);
            debug!(from = %state, to = %next, configuration = %config, "Attempt finished");

            match status {
                InvocationStatus::Compiled(blob) => {
                    info!(
                        profile,
                        configuration = %config.label,
                        attempt = i,
                        bytes = blob.len(),
                        "Shader compiled"
                    );
                    return Ok(Some(CompiledArtifact {
                        blob,
                        configuration: config.label.clone(),
                        attempt: i,
                    }));
                }
                InvocationStatus::OutOfMemory => {
                    error!(profile, configuration = %config.label, "Shader compiler out of memory");
                    return Err(DriverError::OutOfMemory {
                        configuration: config.label.clone(),
                        attempt: i,
                    });
                }
                InvocationStatus::Failed(code) => {
                    warn!(
                        profile,
                        configuration = %config.label,
                        code = %code,
                        "Shader compilation failed"
                    );
                    log.warn(format!(
                        "Warning: D3D shader compilation failed with {} flags.",
                        config.label
                    ));
                    if let Some(next_config) = configurations.get(i + 1) {
                        log.retry_note(format!("Retrying with {}.", next_config.label));
                    }
                }
            }

            state = next;
        }

        warn!(profile, attempts = total, "All shader compile configurations failed");
        Ok(None)
    }
}

impl<L: CompilerLoader> Drop for CompilationDriver<L> {
    fn drop(&mut self) {
        self.release();
    }
}
