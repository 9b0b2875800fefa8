use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::time::Timestamp;
use crate::wire::{self, DECIMAL_LEN, TIME_LEN, WireDecimal};

/// A single timestamped trade observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Tick {
    time: Timestamp,
    price: Decimal,
    volume: Decimal,
}

impl Tick {
    pub const ENCODED_LEN: usize = TIME_LEN + DECIMAL_LEN * 2;

    /// Fails when `price` or `volume` is not strictly positive.
    pub fn new(time: Timestamp, price: Decimal, volume: Decimal) -> Result<Self> {
        if price <= Decimal::ZERO {
            return Err(CodecError::invalid("price", format!("must be positive, got {price}")));
        }
        if volume <= Decimal::ZERO {
            return Err(CodecError::invalid("volume", format!("must be positive, got {volume}")));
        }
        Ok(Tick {
            time,
            price,
            volume,
        })
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        wire::encode((self.time, WireDecimal(self.price), WireDecimal(self.volume)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (time, price, volume): (Timestamp, WireDecimal, WireDecimal) =
            wire::decode_exact(bytes, Self::ENCODED_LEN, "tick")?;
        Tick::decoded("tick", time, price.0, volume.0)
    }

    /// `Tick::new` for values read off the wire: invariant violations are
    /// reported as malformed input rather than bad arguments.
    pub(crate) fn decoded(
        record: &'static str,
        time: Timestamp,
        price: Decimal,
        volume: Decimal,
    ) -> Result<Self> {
        Tick::new(time, price, volume).map_err(|e| match e {
            CodecError::InvalidArgument { name, reason } => {
                CodecError::malformed(record, format!("{name} {reason}"))
            }
            other => other,
        })
    }
}

impl<'de> Deserialize<'de> for Tick {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            time: Timestamp,
            price: Decimal,
            volume: Decimal,
        }

        let raw = Raw::deserialize(deserializer)?;
        Tick::new(raw.time, raw.price, raw.volume).map_err(serde::de::Error::custom)
    }
}

/// OHLCV bar. Field consistency (high >= low, ...) is not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candle {
    pub start_time: Timestamp,
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub const ENCODED_LEN: usize = TIME_LEN + DECIMAL_LEN * 5;

    pub fn new(
        start_time: Timestamp,
        open: Decimal,
        close: Decimal,
        high: Decimal,
        low: Decimal,
        volume: Decimal,
    ) -> Self {
        Candle {
            start_time,
            open,
            close,
            high,
            low,
            volume,
        }
    }

    /// True when high and low bound open and close and volume is non-negative.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close)
            && self.volume >= Decimal::ZERO
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        wire::encode((
            self.start_time,
            WireDecimal(self.open),
            WireDecimal(self.close),
            WireDecimal(self.high),
            WireDecimal(self.low),
            WireDecimal(self.volume),
        ))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (start_time, open, close, high, low, volume): (
            Timestamp,
            WireDecimal,
            WireDecimal,
            WireDecimal,
            WireDecimal,
            WireDecimal,
        ) = wire::decode_exact(bytes, Self::ENCODED_LEN, "candle")?;
        Ok(Candle::new(start_time, open.0, close.0, high.0, low.0, volume.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts(ticks: i64) -> Timestamp {
        Timestamp::from_ticks(ticks).unwrap()
    }

    #[test]
    fn test_tick_roundtrip() {
        let tick = Tick::new(ts(638_901_792_000_000_000), dec!(150), dec!(1.2)).unwrap();
        let bytes = tick.to_bytes().unwrap();
        assert_eq!(bytes.len(), Tick::ENCODED_LEN);
        assert_eq!(bytes.len(), 40);
        assert_eq!(Tick::from_bytes(&bytes).unwrap(), tick);
    }

    #[test]
    fn test_tick_field_order() {
        let tick = Tick::new(ts(7), dec!(3), dec!(4)).unwrap();
        let bytes = tick.to_bytes().unwrap();
        assert_eq!(&bytes[..8], &7i64.to_le_bytes());
        assert_eq!(bytes[8], 3);
        assert_eq!(bytes[24], 4);
    }

    #[test]
    fn test_tick_rejects_non_positive_price() {
        assert!(matches!(
            Tick::new(ts(1), dec!(0), dec!(1)),
            Err(CodecError::InvalidArgument { name: "price", .. })
        ));
        assert!(matches!(
            Tick::new(ts(1), dec!(-0.5), dec!(1)),
            Err(CodecError::InvalidArgument { name: "price", .. })
        ));
    }

    #[test]
    fn test_tick_rejects_non_positive_volume() {
        assert!(matches!(
            Tick::new(ts(1), dec!(1), dec!(0)),
            Err(CodecError::InvalidArgument { name: "volume", .. })
        ));
    }

    #[test]
    fn test_tick_from_bytes_wrong_length() {
        let tick = Tick::new(ts(1), dec!(1), dec!(1)).unwrap();
        let mut bytes = tick.to_bytes().unwrap();
        assert!(matches!(
            Tick::from_bytes(&bytes[..39]),
            Err(CodecError::MalformedRecord { record: "tick", .. })
        ));
        bytes.push(0);
        assert!(matches!(
            Tick::from_bytes(&bytes),
            Err(CodecError::MalformedRecord { record: "tick", .. })
        ));
    }

    #[test]
    fn test_tick_from_bytes_negative_time() {
        let mut bytes = Tick::new(ts(1), dec!(1), dec!(1)).unwrap().to_bytes().unwrap();
        bytes[..8].copy_from_slice(&(-1i64).to_le_bytes());
        assert!(matches!(
            Tick::from_bytes(&bytes),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_tick_from_bytes_zero_price_is_malformed() {
        let mut bytes = Tick::new(ts(1), dec!(1), dec!(1)).unwrap().to_bytes().unwrap();
        bytes[8..24].fill(0);
        assert!(matches!(
            Tick::from_bytes(&bytes),
            Err(CodecError::MalformedRecord { record: "tick", .. })
        ));
    }

    #[test]
    fn test_tick_deserialize_validates() {
        let ok: Tick = serde_json::from_str(r#"{"time":5,"price":"1.5","volume":"2"}"#).unwrap();
        assert_eq!(ok, Tick::new(ts(5), dec!(1.5), dec!(2)).unwrap());
        let bad = serde_json::from_str::<Tick>(r#"{"time":5,"price":"0","volume":"2"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_candle_roundtrip() {
        let candle = Candle::new(ts(1_000), dec!(10.5), dec!(11), dec!(11.25), dec!(10.25), dec!(320.75));
        let bytes = candle.to_bytes().unwrap();
        assert_eq!(bytes.len(), 88);
        assert_eq!(Candle::from_bytes(&bytes).unwrap(), candle);
    }

    #[test]
    fn test_candle_is_permissive() {
        let candle = Candle::new(ts(1), dec!(10), dec!(10), dec!(5), dec!(20), dec!(1));
        assert!(!candle.is_consistent());
        let bytes = candle.to_bytes().unwrap();
        assert_eq!(Candle::from_bytes(&bytes).unwrap(), candle);
    }

    #[test]
    fn test_candle_consistency() {
        let candle = Candle::new(ts(1), dec!(10), dec!(12), dec!(13), dec!(9), dec!(1));
        assert!(candle.is_consistent());
    }
}
