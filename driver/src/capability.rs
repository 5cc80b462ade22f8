//! Compiler capability seam.
//!
//! The driver only ever talks to a [`ShaderCompiler`]; the platform-specific
//! dynamic binding lives behind [`CompilerLoader`]. Tests plug in scripted
//! compilers without touching the system library.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::flags::{CompileFlags, HResult};

/// Source-name label handed to the compiler instead of a real path.
///
/// Compiler messages are prefixed with it, and [`crate::DiagnosticLog`]
/// strips it back out when sanitizing.
pub const SOURCE_PATH_LABEL: &str = "C:\\fakepath";

/// Entry point every translated shader exposes.
pub const ENTRY_POINT: &str = "main";

/// Compiled shader bytecode. Owned by whoever receives it.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ShaderBlob(Vec<u8>);

impl ShaderBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ShaderBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ShaderBlob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ShaderBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShaderBlob({} bytes)", self.0.len())
    }
}

/// Arguments of one `D3DCompile` call.
///
/// Defines and include handler are always null for translated shaders, so
/// they are not represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileRequest<'a> {
    pub source: &'a str,
    pub source_name: &'a str,
    pub entry_point: &'a str,
    pub target: &'a str,
    pub flags1: CompileFlags,
    pub flags2: u32,
}

impl<'a> CompileRequest<'a> {
    /// Request with the fixed source label, entry point and zero `flags2`.
    pub fn new(source: &'a str, target: &'a str, flags: CompileFlags) -> Self {
        Self {
            source,
            source_name: SOURCE_PATH_LABEL,
            entry_point: ENTRY_POINT,
            target,
            flags1: flags,
            flags2: 0,
        }
    }
}

/// How a single invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationStatus {
    Compiled(ShaderBlob),
    /// Any failure other than memory exhaustion; worth another configuration.
    Failed(HResult),
    /// `E_OUTOFMEMORY`. Never retried.
    OutOfMemory,
}

/// Branch the attempt loop takes after an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryCategory {
    Success,
    Retriable,
    Fatal,
}

impl InvocationStatus {
    pub fn retry_category(&self) -> RetryCategory {
        match self {
            Self::Compiled(_) => RetryCategory::Success,
            Self::Failed(_) => RetryCategory::Retriable,
            Self::OutOfMemory => RetryCategory::Fatal,
        }
    }
}

/// Result of one call into the compiler: status plus whatever message text
/// the compiler produced (warnings can accompany a success).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub status: InvocationStatus,
    pub diagnostics: Option<String>,
}

impl Invocation {
    pub fn compiled(blob: impl Into<ShaderBlob>) -> Self {
        Self {
            status: InvocationStatus::Compiled(blob.into()),
            diagnostics: None,
        }
    }

    pub fn failed(code: HResult) -> Self {
        Self {
            status: InvocationStatus::Failed(code),
            diagnostics: None,
        }
    }

    pub fn out_of_memory() -> Self {
        Self {
            status: InvocationStatus::OutOfMemory,
            diagnostics: None,
        }
    }

    pub fn with_diagnostics(mut self, message: impl Into<String>) -> Self {
        self.diagnostics = Some(message.into());
        self
    }

    /// Classify a raw `HRESULT` and optional output blob.
    ///
    /// A success code without a blob is reported as `E_FAIL`; the compiler
    /// contract guarantees a blob on success, so its absence is a failure of
    /// that configuration rather than an empty shader.
    pub fn from_hresult(
        code: HResult,
        blob: Option<ShaderBlob>,
        diagnostics: Option<String>,
    ) -> Self {
        let status = if code.succeeded() {
            match blob {
                Some(blob) => InvocationStatus::Compiled(blob),
                None => InvocationStatus::Failed(HResult::E_FAIL),
            }
        } else if code.is_out_of_memory() {
            InvocationStatus::OutOfMemory
        } else {
            InvocationStatus::Failed(code)
        };
        Self {
            status,
            diagnostics,
        }
    }
}

/// Something that can turn HLSL text into bytecode.
pub trait ShaderCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Invocation;

    /// Where the compiler came from, for logs.
    fn describe(&self) -> String {
        "shader compiler".to_string()
    }
}

impl<C: ShaderCompiler + ?Sized> ShaderCompiler for Box<C> {
    fn compile(&self, request: &CompileRequest<'_>) -> Invocation {
        (**self).compile(request)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// What a loader found.
#[derive(Debug)]
pub enum LoadOutcome<C> {
    Loaded(C),
    /// The platform cannot host a compiler at all.
    Unsupported,
}

/// Acquires a [`ShaderCompiler`].
pub trait CompilerLoader {
    type Compiler: ShaderCompiler;

    fn load(&self) -> Result<LoadOutcome<Self::Compiler>, LoadError>;
}
