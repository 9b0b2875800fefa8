//! Fixed-width little-endian field encoding shared by every record.
//!
//! Decimals use the 16-byte `System.Decimal` layout (`lo mid hi flags`) so the
//! byte streams stay compatible with files written by .NET producers.

use bincode::config::Config;
use bincode::de::Decoder;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use rust_decimal::Decimal;

use crate::error::{CodecError, Result};

pub(crate) const TIME_LEN: usize = 8;
pub(crate) const DELTA_LEN: usize = 2;
pub(crate) const DECIMAL_LEN: usize = 16;
pub(crate) const COUNT_LEN: usize = 4;

const SCALE_SHIFT: u32 = 16;
const MAX_SCALE: u32 = 28;
const SIGN_MASK: u32 = 0x8000_0000;
const SCALE_MASK: u32 = 0x00FF_0000;

pub(crate) fn config() -> impl Config {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WireDecimal(pub Decimal);

impl Encode for WireDecimal {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> core::result::Result<(), EncodeError> {
        // rust_decimal serializes as `flags lo mid hi`
        let raw = self.0.serialize();
        let mut out = [0u8; DECIMAL_LEN];
        out[..12].copy_from_slice(&raw[4..]);
        out[12..].copy_from_slice(&raw[..4]);
        out.encode(encoder)
    }
}

impl<Context> Decode<Context> for WireDecimal {
    fn decode<D: Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> core::result::Result<Self, DecodeError> {
        let bytes: [u8; DECIMAL_LEN] = Decode::decode(decoder)?;
        let flags = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        if flags & !(SIGN_MASK | SCALE_MASK) != 0 {
            return Err(DecodeError::OtherString(format!(
                "decimal flags {flags:#010x} have reserved bits set"
            )));
        }
        let scale = (flags & SCALE_MASK) >> SCALE_SHIFT;
        if scale > MAX_SCALE {
            return Err(DecodeError::OtherString(format!(
                "decimal scale {scale} exceeds {MAX_SCALE}"
            )));
        }
        let mut raw = [0u8; DECIMAL_LEN];
        raw[..4].copy_from_slice(&bytes[12..]);
        raw[4..].copy_from_slice(&bytes[..12]);
        Ok(WireDecimal(Decimal::deserialize(raw)))
    }
}

pub(crate) fn encode(value: impl Encode) -> Result<Vec<u8>> {
    Ok(bincode::encode_to_vec(value, config())?)
}

pub(crate) fn encode_into(value: impl Encode, buf: &mut Vec<u8>) -> Result<usize> {
    Ok(bincode::encode_into_std_write(value, buf, config())?)
}

/// Decodes `bytes` as a single `T`, which must occupy exactly `expected` bytes.
pub(crate) fn decode_exact<T: Decode<()>>(
    bytes: &[u8],
    expected: usize,
    record: &'static str,
) -> Result<T> {
    if bytes.len() != expected {
        return Err(CodecError::malformed(
            record,
            format!("expected {expected} bytes, got {}", bytes.len()),
        ));
    }
    let (value, read) = bincode::decode_from_slice(bytes, config())
        .map_err(|e| CodecError::malformed(record, e.to_string()))?;
    if read != expected {
        return Err(CodecError::malformed(
            record,
            format!("decoded {read} of {expected} bytes"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_uses_dotnet_layout() {
        // 1.5 == 15 * 10^-1: lo = 15, scale = 1
        let bytes = encode(WireDecimal(dec!(1.5))).unwrap();
        assert_eq!(bytes.len(), DECIMAL_LEN);
        assert_eq!(&bytes[..4], &15u32.to_le_bytes());
        assert_eq!(&bytes[4..12], &[0u8; 8]);
        assert_eq!(&bytes[12..], &0x0001_0000u32.to_le_bytes());
    }

    #[test]
    fn test_negative_decimal_sets_sign_bit() {
        let bytes = encode(WireDecimal(dec!(-2))).unwrap();
        assert_eq!(&bytes[..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[12..], &SIGN_MASK.to_le_bytes());
        let back: WireDecimal = decode_exact(&bytes, DECIMAL_LEN, "decimal").unwrap();
        assert_eq!(back.0, dec!(-2));
    }

    #[test]
    fn test_fixed_int_widths() {
        assert_eq!(encode(0i64).unwrap().len(), TIME_LEN);
        assert_eq!(encode(-1i16).unwrap(), vec![0xFF, 0xFF]);
        assert_eq!(encode(3i32).unwrap(), vec![3, 0, 0, 0]);
    }

    #[test]
    fn test_reserved_flag_bits_rejected() {
        let mut bytes = encode(WireDecimal(dec!(1))).unwrap();
        bytes[12] = 0x01;
        let res: Result<WireDecimal> = decode_exact(&bytes, DECIMAL_LEN, "decimal");
        assert!(matches!(res, Err(CodecError::MalformedRecord { .. })));
    }

    #[test]
    fn test_scale_above_28_rejected() {
        let mut bytes = encode(WireDecimal(dec!(1))).unwrap();
        bytes[14] = 29;
        let res: Result<WireDecimal> = decode_exact(&bytes, DECIMAL_LEN, "decimal");
        assert!(matches!(res, Err(CodecError::MalformedRecord { .. })));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let res: Result<i64> = decode_exact(&[0u8; 7], TIME_LEN, "time");
        assert!(matches!(res, Err(CodecError::MalformedRecord { .. })));
    }
}
