use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::warn;

use crate::config::OverflowPolicy;
use crate::error::{CodecError, Result};
use crate::time::Timestamp;
use crate::types::{Candle, Tick};
use crate::wire::{self, DECIMAL_LEN, DELTA_LEN, TIME_LEN, WireDecimal};

/// Whole units of `unit` between `prev` and `curr`, truncated toward zero.
pub(crate) fn quantize(
    field: &'static str,
    prev: Decimal,
    curr: Decimal,
    unit: Decimal,
    policy: OverflowPolicy,
) -> Result<i16> {
    if unit <= Decimal::ZERO {
        return Err(CodecError::invalid(
            "min_price_change",
            format!("must be positive, got {unit}"),
        ));
    }
    let delta = curr.checked_sub(prev).ok_or(CodecError::QuantizationOverflow {
        field,
        units: Decimal::MAX,
    })?;
    let units = delta
        .checked_div(unit)
        .ok_or(CodecError::QuantizationOverflow {
            field,
            units: Decimal::MAX,
        })?
        .trunc();

    match units.to_i16() {
        Some(q) => Ok(q),
        None => match policy {
            OverflowPolicy::Fail => Err(CodecError::QuantizationOverflow { field, units }),
            OverflowPolicy::Saturate => {
                let q = if units.is_sign_negative() {
                    i16::MIN
                } else {
                    i16::MAX
                };
                warn!(field, %units, clamped = q, "saturating quantized delta");
                Ok(q)
            }
        },
    }
}

pub(crate) fn dequantize(
    record: &'static str,
    prev: Decimal,
    units: i16,
    unit: Decimal,
) -> Result<Decimal> {
    Decimal::from(units)
        .checked_mul(unit)
        .and_then(|step| prev.checked_add(step))
        .ok_or_else(|| CodecError::malformed(record, "price reconstruction overflows"))
}

fn shift_time(record: &'static str, prev: Timestamp, delta: i64) -> Result<Timestamp> {
    prev.checked_add_ticks(delta).ok_or_else(|| {
        CodecError::malformed(record, format!("time delta {delta} leaves the timestamp range"))
    })
}

/// Change between two consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickDiff {
    time_delta: i64,
    price_delta: i16,
    volume: Decimal,
}

impl TickDiff {
    pub const ENCODED_LEN: usize = TIME_LEN + DELTA_LEN + DECIMAL_LEN;

    pub fn new(time_delta: i64, price_delta: i16, volume: Decimal) -> Self {
        TickDiff {
            time_delta,
            price_delta,
            volume,
        }
    }

    pub fn between(
        prev: &Tick,
        curr: &Tick,
        min_price_change: Decimal,
        policy: OverflowPolicy,
    ) -> Result<Self> {
        Ok(TickDiff {
            time_delta: curr.time().ticks_since(prev.time()),
            price_delta: quantize("price", prev.price(), curr.price(), min_price_change, policy)?,
            volume: curr.volume(),
        })
    }

    pub fn apply(&self, prev: &Tick, min_price_change: Decimal) -> Result<Tick> {
        let time = shift_time("tick diff", prev.time(), self.time_delta)?;
        let price = dequantize("tick diff", prev.price(), self.price_delta, min_price_change)?;
        Tick::decoded("tick diff", time, price, self.volume)
    }

    pub fn time_delta(&self) -> i64 {
        self.time_delta
    }

    pub fn price_delta(&self) -> i16 {
        self.price_delta
    }

    pub fn volume(&self) -> Decimal {
        self.volume
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        self.write_into(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn write_into(&self, buf: &mut Vec<u8>) -> Result<usize> {
        wire::encode_into(
            (self.time_delta, self.price_delta, WireDecimal(self.volume)),
            buf,
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (time_delta, price_delta, volume): (i64, i16, WireDecimal) =
            wire::decode_exact(bytes, Self::ENCODED_LEN, "tick diff")?;
        Ok(TickDiff::new(time_delta, price_delta, volume.0))
    }
}

/// Change between two consecutive candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandleDiff {
    pub time_delta: i64,
    pub open_delta: i16,
    pub close_delta: i16,
    pub high_delta: i16,
    pub low_delta: i16,
    pub volume: Decimal,
}

impl CandleDiff {
    pub const ENCODED_LEN: usize = TIME_LEN + DELTA_LEN * 4 + DECIMAL_LEN;

    pub fn between(
        prev: &Candle,
        curr: &Candle,
        min_price_change: Decimal,
        policy: OverflowPolicy,
    ) -> Result<Self> {
        let q = |field, p, c| quantize(field, p, c, min_price_change, policy);
        Ok(CandleDiff {
            time_delta: curr.start_time.ticks_since(prev.start_time),
            open_delta: q("open", prev.open, curr.open)?,
            close_delta: q("close", prev.close, curr.close)?,
            high_delta: q("high", prev.high, curr.high)?,
            low_delta: q("low", prev.low, curr.low)?,
            volume: curr.volume,
        })
    }

    pub fn apply(&self, prev: &Candle, min_price_change: Decimal) -> Result<Candle> {
        let d = |p, units| dequantize("candle diff", p, units, min_price_change);
        Ok(Candle::new(
            shift_time("candle diff", prev.start_time, self.time_delta)?,
            d(prev.open, self.open_delta)?,
            d(prev.close, self.close_delta)?,
            d(prev.high, self.high_delta)?,
            d(prev.low, self.low_delta)?,
            self.volume,
        ))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        self.write_into(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn write_into(&self, buf: &mut Vec<u8>) -> Result<usize> {
        wire::encode_into(
            (
                self.time_delta,
                self.open_delta,
                self.close_delta,
                self.high_delta,
                self.low_delta,
                WireDecimal(self.volume),
            ),
            buf,
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (time_delta, open_delta, close_delta, high_delta, low_delta, volume): (
            i64,
            i16,
            i16,
            i16,
            i16,
            WireDecimal,
        ) = wire::decode_exact(bytes, Self::ENCODED_LEN, "candle diff")?;
        Ok(CandleDiff {
            time_delta,
            open_delta,
            close_delta,
            high_delta,
            low_delta,
            volume: volume.0,
        })
    }
}
