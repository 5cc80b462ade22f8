//! Driver error taxonomy.
//!
//! | Condition                | Surface                              |
//! |--------------------------|--------------------------------------|
//! | Compiler missing         | `Load` from `initialize`             |
//! | Driver not usable        | `Unavailable` from `compile_to_binary` |
//! | Empty source             | `Ok(None)`, not an error             |
//! | Configuration failed     | log entry, next configuration        |
//! | Out of memory            | `OutOfMemory`, loop aborted          |
//! | Every configuration failed | `Ok(None)` plus the log            |

use thiserror::Error;

use crate::driver::Availability;

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    /// No compiler module could be acquired.
    #[error("shader compiler could not be loaded: {0}")]
    Load(#[from] LoadError),

    /// `compile_to_binary` called on a driver without a compiler.
    #[error("shader compiler unavailable ({0})")]
    Unavailable(Availability),

    /// The compiler ran out of memory; no further configurations were tried.
    #[error("out of memory compiling with '{configuration}' flags (attempt {attempt})")]
    OutOfMemory { configuration: String, attempt: usize },
}

impl DriverError {
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no compiler module found (tried: {})", .candidates.join(", "))]
    ModuleNotFound { candidates: Vec<String> },

    #[error("symbol '{symbol}' not found in {module}: {reason}")]
    SymbolMissing {
        module: String,
        symbol: String,
        reason: String,
    },
}
