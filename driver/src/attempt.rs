//! Attempt configurations and the per-call attempt state machine.
//!
//! ```text
//! NotStarted ──► Attempting(0) ──► Succeeded
//!                    │
//!                    ├─ retriable failure ──► Attempting(i+1) ...
//!                    ├─ last configuration failed ──► ExhaustedFailed
//!                    └─ out of memory ──► FatalAborted
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::RetryCategory;
use crate::flags::CompileFlags;

/// One rung of the fallback ladder: the flags to compile with and a label
/// used in warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptConfiguration {
    pub label: String,
    pub flags: CompileFlags,
}

impl AttemptConfiguration {
    pub fn new(label: impl Into<String>, flags: CompileFlags) -> Self {
        Self {
            label: label.into(),
            flags,
        }
    }

    /// Default, then avoid flow control, then prefer flow control, each on
    /// top of `base`. Some shaders only fit the instruction limits of older
    /// profiles once loops are unrolled (or kept rolled).
    pub fn standard_ladder(base: CompileFlags) -> Vec<Self> {
        vec![
            Self::new("default", base),
            Self::new("avoid flow control", base | CompileFlags::AVOID_FLOW_CONTROL),
            Self::new("prefer flow control", base | CompileFlags::PREFER_FLOW_CONTROL),
        ]
    }
}

impl fmt::Display for AttemptConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.flags)
    }
}

/// Where a single `compile_to_binary` call stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "attempt", rename_all = "snake_case")]
pub enum AttemptState {
    NotStarted,
    Attempting(usize),
    Succeeded(usize),
    ExhaustedFailed,
    FatalAborted(usize),
}

impl AttemptState {
    /// First state of a call over `total` configurations.
    pub fn start(total: usize) -> Self {
        if total == 0 {
            Self::ExhaustedFailed
        } else {
            Self::Attempting(0)
        }
    }

    /// Advance after the invocation for the current attempt.
    ///
    /// Terminal states stay where they are.
    pub fn advance(self, category: RetryCategory, total: usize) -> Self {
        match self {
            Self::NotStarted => Self::start(total),
            Self::Attempting(i) => match category {
                RetryCategory::Success => Self::Succeeded(i),
                RetryCategory::Fatal => Self::FatalAborted(i),
                RetryCategory::Retriable if i + 1 < total => Self::Attempting(i + 1),
                RetryCategory::Retriable => Self::ExhaustedFailed,
            },
            terminal => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded(_) | Self::ExhaustedFailed | Self::FatalAborted(_)
        )
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Attempting(i) => write!(f, "attempting({i})"),
            Self::Succeeded(i) => write!(f, "succeeded({i})"),
            Self::ExhaustedFailed => write!(f, "exhausted_failed"),
            Self::FatalAborted(i) => write!(f, "fatal_aborted({i})"),
        }
    }
}
