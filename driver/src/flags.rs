//! D3DCOMPILE flag bits and HRESULT codes.
//!
//! Both are thin newtypes over the raw integers the compiler ABI uses, so the
//! driver can pass them through untouched while configs and logs deal in names.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compile flags passed as `Flags1` to `D3DCompile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "FlagsRepr", into = "FlagsRepr")]
pub struct CompileFlags(u32);

impl CompileFlags {
    pub const NONE: Self = Self(0);
    pub const DEBUG: Self = Self(1 << 0);
    pub const SKIP_VALIDATION: Self = Self(1 << 1);
    pub const SKIP_OPTIMIZATION: Self = Self(1 << 2);
    pub const PACK_MATRIX_ROW_MAJOR: Self = Self(1 << 3);
    pub const PACK_MATRIX_COLUMN_MAJOR: Self = Self(1 << 4);
    pub const PARTIAL_PRECISION: Self = Self(1 << 5);
    pub const NO_PRESHADER: Self = Self(1 << 8);
    pub const AVOID_FLOW_CONTROL: Self = Self(1 << 9);
    pub const PREFER_FLOW_CONTROL: Self = Self(1 << 10);
    pub const ENABLE_STRICTNESS: Self = Self(1 << 11);
    pub const ENABLE_BACKWARDS_COMPATIBILITY: Self = Self(1 << 12);
    pub const IEEE_STRICTNESS: Self = Self(1 << 13);
    pub const OPTIMIZATION_LEVEL0: Self = Self(1 << 14);
    /// Level 1 is the compiler default and has no bits of its own.
    pub const OPTIMIZATION_LEVEL1: Self = Self(0);
    pub const OPTIMIZATION_LEVEL2: Self = Self((1 << 14) | (1 << 15));
    pub const OPTIMIZATION_LEVEL3: Self = Self(1 << 15);
    pub const WARNINGS_ARE_ERRORS: Self = Self(1 << 18);

    const OPTIMIZATION_MASK: u32 = (1 << 14) | (1 << 15);

    /// Single-bit flags, in bit order. Optimization levels are handled apart
    /// because level 2 shares its bits with levels 0 and 3.
    const NAMED_BITS: &'static [(&'static str, CompileFlags)] = &[
        ("debug", Self::DEBUG),
        ("skip_validation", Self::SKIP_VALIDATION),
        ("skip_optimization", Self::SKIP_OPTIMIZATION),
        ("pack_matrix_row_major", Self::PACK_MATRIX_ROW_MAJOR),
        ("pack_matrix_column_major", Self::PACK_MATRIX_COLUMN_MAJOR),
        ("partial_precision", Self::PARTIAL_PRECISION),
        ("no_preshader", Self::NO_PRESHADER),
        ("avoid_flow_control", Self::AVOID_FLOW_CONTROL),
        ("prefer_flow_control", Self::PREFER_FLOW_CONTROL),
        ("enable_strictness", Self::ENABLE_STRICTNESS),
        (
            "enable_backwards_compatibility",
            Self::ENABLE_BACKWARDS_COMPATIBILITY,
        ),
        ("ieee_strictness", Self::IEEE_STRICTNESS),
        ("warnings_are_errors", Self::WARNINGS_ARE_ERRORS),
    ];

    const OPTIMIZATION_LEVELS: &'static [(&'static str, CompileFlags)] = &[
        ("optimization_level0", Self::OPTIMIZATION_LEVEL0),
        ("optimization_level1", Self::OPTIMIZATION_LEVEL1),
        ("optimization_level2", Self::OPTIMIZATION_LEVEL2),
        ("optimization_level3", Self::OPTIMIZATION_LEVEL3),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Symbolic names for the set bits, or `None` when some bit has no name.
    ///
    /// The default optimization level (1) is omitted since it carries no bits.
    pub fn names(self) -> Option<Vec<&'static str>> {
        let mut names = Vec::new();
        let mut remaining = self.0;

        let level = self.0 & Self::OPTIMIZATION_MASK;
        if level != 0 {
            let (name, _) = Self::OPTIMIZATION_LEVELS
                .iter()
                .find(|(_, flags)| flags.0 == level)?;
            names.push(*name);
            remaining &= !Self::OPTIMIZATION_MASK;
        }

        for (name, flag) in Self::NAMED_BITS {
            if remaining & flag.0 != 0 {
                names.push(*name);
                remaining &= !flag.0;
            }
        }

        if remaining == 0 {
            Some(names)
        } else {
            None
        }
    }

    /// Look up a single flag by its config name (case-insensitive, `D3DCOMPILE_`
    /// prefix optional).
    pub fn from_name(name: &str) -> Result<Self, FlagParseError> {
        let normalized = name.trim().to_ascii_lowercase();
        let normalized = normalized
            .strip_prefix("d3dcompile_")
            .unwrap_or(&normalized);

        if normalized == "none" {
            return Ok(Self::NONE);
        }

        Self::NAMED_BITS
            .iter()
            .chain(Self::OPTIMIZATION_LEVELS)
            .find(|(n, _)| *n == normalized)
            .map(|(_, flags)| *flags)
            .ok_or_else(|| FlagParseError::UnknownFlag(name.to_string()))
    }

    /// Combine a list of flag names into one value.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, FlagParseError> {
        names
            .iter()
            .try_fold(Self::NONE, |acc, name| -> Result<Self, FlagParseError> {
                Ok(acc | Self::from_name(name.as_ref())?)
            })
    }
}

impl BitOr for CompileFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CompileFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for CompileFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.names() {
            Some(names) if names.is_empty() => write!(f, "none"),
            Some(names) => write!(f, "{}", names.join(" | ")),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

/// `"avoid_flow_control | optimization_level3"` or a hex/decimal literal.
impl FromStr for CompileFlags {
    type Err = FlagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u32::from_str_radix(hex, 16)
                .map(Self)
                .map_err(|_| FlagParseError::InvalidLiteral(s.to_string()));
        }
        if let Ok(bits) = s.parse::<u32>() {
            return Ok(Self(bits));
        }
        let names: Vec<&str> = s.split('|').filter(|n| !n.trim().is_empty()).collect();
        Self::from_names(&names)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagParseError {
    #[error("unknown compile flag '{0}'")]
    UnknownFlag(String),

    #[error("invalid flag literal '{0}'")]
    InvalidLiteral(String),
}

/// Serialized form of [`CompileFlags`]: a list of names, or raw bits when
/// some bit has no name.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FlagsRepr {
    Bits(u32),
    Names(Vec<String>),
}

impl TryFrom<FlagsRepr> for CompileFlags {
    type Error = FlagParseError;

    fn try_from(repr: FlagsRepr) -> Result<Self, Self::Error> {
        match repr {
            FlagsRepr::Bits(bits) => Ok(Self(bits)),
            FlagsRepr::Names(names) => Self::from_names(&names),
        }
    }
}

impl From<CompileFlags> for FlagsRepr {
    fn from(flags: CompileFlags) -> Self {
        match flags.names() {
            Some(names) => FlagsRepr::Names(names.into_iter().map(String::from).collect()),
            None => FlagsRepr::Bits(flags.0),
        }
    }
}

/// Raw `HRESULT` returned by the compiler entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HResult(pub i32);

impl HResult {
    pub const S_OK: Self = Self(0);
    pub const E_FAIL: Self = Self(0x8000_4005_u32 as i32);
    pub const E_OUTOFMEMORY: Self = Self(0x8007_000E_u32 as i32);
    pub const E_INVALIDARG: Self = Self(0x8007_0057_u32 as i32);

    /// `SUCCEEDED(hr)`: any non-negative code.
    pub fn succeeded(self) -> bool {
        self.0 >= 0
    }

    pub fn is_out_of_memory(self) -> bool {
        self == Self::E_OUTOFMEMORY
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)
    }
}
