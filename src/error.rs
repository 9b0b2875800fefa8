use std::io;

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while building, encoding or decoding records and sequences.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A constructor argument violates a record or sequence invariant.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// Input bytes do not describe a well-formed record.
    #[error("malformed {record}: {reason}")]
    MalformedRecord { record: &'static str, reason: String },

    /// A price delta does not fit in a 16-bit quantized delta.
    #[error("{field} delta of {units} units is outside the 16-bit quantization range")]
    QuantizationOverflow { field: &'static str, units: Decimal },

    /// Stored object bytes no longer hash to their id.
    #[error("object {id} failed digest verification")]
    DigestMismatch { id: String },

    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        CodecError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(record: &'static str, reason: impl Into<String>) -> Self {
        CodecError::MalformedRecord {
            record,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
