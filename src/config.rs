//! Codec options, loaded from the environment or deserialized by the host.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

pub const OVERFLOW_POLICY_ENV: &str = "TICKSEQ_OVERFLOW_POLICY";

/// What to do when a price delta needs more than 16 bits of quantization units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Reject the sequence with `QuantizationOverflow`.
    #[default]
    Fail,
    /// Clamp to `i16::MIN` / `i16::MAX`. Later records inherit the error.
    Saturate,
}

impl OverflowPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Saturate => "saturate",
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "saturate" => Ok(Self::Saturate),
            other => Err(CodecError::invalid(
                "overflow_policy",
                format!("unknown policy `{other}`, expected `fail` or `saturate`"),
            )),
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub overflow: OverflowPolicy,
}

impl CodecOptions {
    pub const fn with_overflow(overflow: OverflowPolicy) -> Self {
        CodecOptions { overflow }
    }

    /// Reads `TICKSEQ_OVERFLOW_POLICY`; unset falls back to the default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let overflow = match lookup(OVERFLOW_POLICY_ENV) {
            Some(value) => value.parse()?,
            None => OverflowPolicy::default(),
        };
        Ok(CodecOptions { overflow })
    }
}
