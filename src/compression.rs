use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::slice::ChunksExact;

use chrono::TimeDelta;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::CodecOptions;
use crate::delta_encoding::{CandleDiff, TickDiff};
use crate::error::{CodecError, Result};
use crate::strategy::{CandleUpdate, PriceUpdate};
use crate::time::{Timestamp, ticks_to_time_delta};
use crate::types::{Candle, Tick};
use crate::wire::{self, COUNT_LEN, DECIMAL_LEN, TIME_LEN, WireDecimal};

fn check_resolution(min_price_change: Decimal) -> Result<()> {
    if min_price_change <= Decimal::ZERO {
        return Err(CodecError::invalid(
            "min_price_change",
            format!("must be positive, got {min_price_change}"),
        ));
    }
    Ok(())
}

fn wire_count(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| {
        CodecError::invalid("items", format!("{len} records exceed the i32 count field"))
    })
}

/// Validates the header fields shared by both sequence kinds and splits the
/// diff stream into fixed-size blocks.
fn split_diffs<'a>(
    record: &'static str,
    body: &'a [u8],
    count: i32,
    min_price_change: Decimal,
    diff_len: usize,
) -> Result<ChunksExact<'a, u8>> {
    if count < 1 {
        return Err(CodecError::malformed(record, format!("count {count} is not positive")));
    }
    if min_price_change <= Decimal::ZERO {
        return Err(CodecError::malformed(
            record,
            format!("min_price_change {min_price_change} is not positive"),
        ));
    }
    let expected = (count as usize - 1) * diff_len;
    if body.len() != expected {
        return Err(CodecError::malformed(
            record,
            format!(
                "{count} records need {expected} bytes of diffs, got {}",
                body.len()
            ),
        ));
    }
    Ok(body.chunks_exact(diff_len))
}

fn split_header<'a>(record: &'static str, bytes: &'a [u8], len: usize) -> Result<(&'a [u8], &'a [u8])> {
    if bytes.len() < len {
        return Err(CodecError::malformed(
            record,
            format!("need at least {len} header bytes, got {}", bytes.len()),
        ));
    }
    Ok(bytes.split_at(len))
}

fn check_last_time(record: &'static str, expected: Timestamp, actual: Timestamp) -> Result<()> {
    if expected != actual {
        return Err(CodecError::malformed(
            record,
            format!("header says last record at {expected}, diffs end at {actual}"),
        ));
    }
    Ok(())
}

/// Encoders walk records in time order, so a stored delta is never negative.
fn check_time_delta(record: &'static str, delta: i64) -> Result<()> {
    if delta < 0 {
        return Err(CodecError::malformed(
            record,
            format!("time delta {delta} runs backwards"),
        ));
    }
    Ok(())
}

fn read_all<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Header of an encoded [`TickSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSequenceMetadata {
    pub first: Tick,
    pub last_time: Timestamp,
    pub min_price_change: Decimal,
    pub count: i32,
}

/// Time-ordered ticks sharing one quantization unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSequence {
    ticks: Vec<Tick>,
    min_price_change: Decimal,
}

impl TickSequence {
    pub const METADATA_LEN: usize = Tick::ENCODED_LEN + TIME_LEN + DECIMAL_LEN + COUNT_LEN;

    /// Sorts `ticks` by time (stable). Fails on empty input or a non-positive resolution.
    pub fn new(ticks: impl IntoIterator<Item = Tick>, min_price_change: Decimal) -> Result<Self> {
        check_resolution(min_price_change)?;
        let mut ticks: Vec<Tick> = ticks.into_iter().collect();
        if ticks.is_empty() {
            return Err(CodecError::invalid("ticks", "a sequence needs at least one tick"));
        }
        wire_count(ticks.len())?;
        ticks.sort_by_key(Tick::time);
        Ok(TickSequence {
            ticks,
            min_price_change,
        })
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn min_price_change(&self) -> Decimal {
        self.min_price_change
    }

    pub fn count(&self) -> usize {
        self.ticks.len()
    }

    pub fn first(&self) -> &Tick {
        &self.ticks[0]
    }

    pub fn last(&self) -> &Tick {
        &self.ticks[self.ticks.len() - 1]
    }

    pub fn beginning(&self) -> Timestamp {
        self.first().time()
    }

    pub fn ending(&self) -> Timestamp {
        self.last().time()
    }

    pub fn timespan(&self) -> TimeDelta {
        ticks_to_time_delta(self.ending().ticks_since(self.beginning()))
    }

    pub fn encoded_len(&self) -> usize {
        Self::METADATA_LEN + (self.count() - 1) * TickDiff::ENCODED_LEN
    }

    pub fn metadata(&self) -> TickSequenceMetadata {
        TickSequenceMetadata {
            first: *self.first(),
            last_time: self.ending(),
            min_price_change: self.min_price_change,
            count: self.count() as i32,
        }
    }

    pub fn write_metadata(&self) -> Result<Vec<u8>> {
        let m = self.metadata();
        let mut buf = self.first().to_bytes()?;
        wire::encode_into(
            (m.last_time, WireDecimal(m.min_price_change), m.count),
            &mut buf,
        )?;
        Ok(buf)
    }

    pub fn read_metadata(bytes: &[u8]) -> Result<TickSequenceMetadata> {
        if bytes.len() != Self::METADATA_LEN {
            return Err(CodecError::malformed(
                "tick sequence metadata",
                format!("expected {} bytes, got {}", Self::METADATA_LEN, bytes.len()),
            ));
        }
        let (first, rest) = bytes.split_at(Tick::ENCODED_LEN);
        let first = Tick::from_bytes(first)?;
        let (last_time, min_price_change, count): (Timestamp, WireDecimal, i32) =
            wire::decode_exact(rest, rest.len(), "tick sequence metadata")?;
        Ok(TickSequenceMetadata {
            first,
            last_time,
            min_price_change: min_price_change.0,
            count,
        })
    }

    /// Diffs between each tick and its predecessor.
    pub fn diffs(&self, options: &CodecOptions) -> Result<Vec<TickDiff>> {
        self.ticks
            .windows(2)
            .map(|w| TickDiff::between(&w[0], &w[1], self.min_price_change, options.overflow))
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(&CodecOptions::default())
    }

    pub fn to_bytes_with(&self, options: &CodecOptions) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.write_metadata()?);
        for w in self.ticks.windows(2) {
            TickDiff::between(&w[0], &w[1], self.min_price_change, options.overflow)?
                .write_into(&mut buf)?;
        }
        debug!(
            count = self.count(),
            bytes = buf.len(),
            policy = %options.overflow,
            "encoded tick sequence"
        );
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, body) = split_header("tick sequence", bytes, Self::METADATA_LEN)?;
        let meta = Self::read_metadata(header)?;
        let blocks = split_diffs(
            "tick sequence",
            body,
            meta.count,
            meta.min_price_change,
            TickDiff::ENCODED_LEN,
        )?;

        let mut ticks = Vec::with_capacity(meta.count as usize);
        let mut prev = meta.first;
        ticks.push(prev);
        for block in blocks {
            let diff = TickDiff::from_bytes(block)?;
            check_time_delta("tick sequence", diff.time_delta())?;
            prev = diff.apply(&prev, meta.min_price_change)?;
            ticks.push(prev);
        }
        check_last_time("tick sequence", meta.last_time, prev.time())?;

        debug!(count = ticks.len(), bytes = bytes.len(), "decoded tick sequence");
        TickSequence::new(ticks, meta.min_price_change)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<usize> {
        let bytes = self.to_bytes()?;
        w.write_all(&bytes)?;
        Ok(bytes.len())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Self::from_bytes(&read_all(r)?)
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        self.write_to(&mut file)?;
        Ok(file.sync_all()?)
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_from(&mut File::open(path)?)
    }

    pub fn price_updates(&self) -> impl Iterator<Item = PriceUpdate> + '_ {
        self.ticks.iter().map(PriceUpdate::from)
    }
}

/// Header of an encoded [`CandleSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleSequenceMetadata {
    pub first: Candle,
    pub last_time: Timestamp,
    pub min_price_change: Decimal,
    /// Raw tick count between the first two candles, `0` for a single candle.
    pub interval: i64,
    pub count: i32,
}

/// Time-ordered candles sharing one quantization unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleSequence {
    candles: Vec<Candle>,
    min_price_change: Decimal,
}

impl CandleSequence {
    pub const METADATA_LEN: usize =
        Candle::ENCODED_LEN + TIME_LEN + DECIMAL_LEN + TIME_LEN + COUNT_LEN;

    pub fn new(
        candles: impl IntoIterator<Item = Candle>,
        min_price_change: Decimal,
    ) -> Result<Self> {
        check_resolution(min_price_change)?;
        let mut candles: Vec<Candle> = candles.into_iter().collect();
        if candles.is_empty() {
            return Err(CodecError::invalid("candles", "a sequence needs at least one candle"));
        }
        wire_count(candles.len())?;
        candles.sort_by_key(|c| c.start_time);
        Ok(CandleSequence {
            candles,
            min_price_change,
        })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn min_price_change(&self) -> Decimal {
        self.min_price_change
    }

    pub fn count(&self) -> usize {
        self.candles.len()
    }

    pub fn first(&self) -> &Candle {
        &self.candles[0]
    }

    pub fn last(&self) -> &Candle {
        &self.candles[self.candles.len() - 1]
    }

    pub fn first_candle_time(&self) -> Timestamp {
        self.first().start_time
    }

    pub fn last_candle_time(&self) -> Timestamp {
        self.last().start_time
    }

    pub fn timespan(&self) -> TimeDelta {
        ticks_to_time_delta(self.last_candle_time().ticks_since(self.first_candle_time()))
    }

    /// Spacing of the first two candles; `None` for a single candle.
    pub fn interval(&self) -> Option<TimeDelta> {
        self.interval_ticks().map(ticks_to_time_delta)
    }

    fn interval_ticks(&self) -> Option<i64> {
        match self.candles.as_slice() {
            [a, b, ..] => Some(b.start_time.ticks_since(a.start_time)),
            _ => None,
        }
    }

    pub fn encoded_len(&self) -> usize {
        Self::METADATA_LEN + (self.count() - 1) * CandleDiff::ENCODED_LEN
    }

    pub fn metadata(&self) -> CandleSequenceMetadata {
        CandleSequenceMetadata {
            first: *self.first(),
            last_time: self.last_candle_time(),
            min_price_change: self.min_price_change,
            interval: self.interval_ticks().unwrap_or(0),
            count: self.count() as i32,
        }
    }

    pub fn write_metadata(&self) -> Result<Vec<u8>> {
        let m = self.metadata();
        let mut buf = self.first().to_bytes()?;
        wire::encode_into(
            (m.last_time, WireDecimal(m.min_price_change), m.interval, m.count),
            &mut buf,
        )?;
        Ok(buf)
    }

    pub fn read_metadata(bytes: &[u8]) -> Result<CandleSequenceMetadata> {
        if bytes.len() != Self::METADATA_LEN {
            return Err(CodecError::malformed(
                "candle sequence metadata",
                format!("expected {} bytes, got {}", Self::METADATA_LEN, bytes.len()),
            ));
        }
        let (first, rest) = bytes.split_at(Candle::ENCODED_LEN);
        let first = Candle::from_bytes(first)?;
        let (last_time, min_price_change, interval, count): (Timestamp, WireDecimal, i64, i32) =
            wire::decode_exact(rest, rest.len(), "candle sequence metadata")?;
        Ok(CandleSequenceMetadata {
            first,
            last_time,
            min_price_change: min_price_change.0,
            interval,
            count,
        })
    }

    pub fn diffs(&self, options: &CodecOptions) -> Result<Vec<CandleDiff>> {
        self.candles
            .windows(2)
            .map(|w| CandleDiff::between(&w[0], &w[1], self.min_price_change, options.overflow))
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(&CodecOptions::default())
    }

    pub fn to_bytes_with(&self, options: &CodecOptions) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.write_metadata()?);
        for w in self.candles.windows(2) {
            CandleDiff::between(&w[0], &w[1], self.min_price_change, options.overflow)?
                .write_into(&mut buf)?;
        }
        debug!(
            count = self.count(),
            bytes = buf.len(),
            policy = %options.overflow,
            "encoded candle sequence"
        );
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, body) = split_header("candle sequence", bytes, Self::METADATA_LEN)?;
        let meta = Self::read_metadata(header)?;
        let blocks = split_diffs(
            "candle sequence",
            body,
            meta.count,
            meta.min_price_change,
            CandleDiff::ENCODED_LEN,
        )?;

        let mut candles = Vec::with_capacity(meta.count as usize);
        let mut prev = meta.first;
        candles.push(prev);
        for block in blocks {
            let diff = CandleDiff::from_bytes(block)?;
            check_time_delta("candle sequence", diff.time_delta)?;
            prev = diff.apply(&prev, meta.min_price_change)?;
            candles.push(prev);
        }
        check_last_time("candle sequence", meta.last_time, prev.start_time)?;

        let seq = CandleSequence::new(candles, meta.min_price_change)?;
        let interval = seq.interval_ticks().unwrap_or(0);
        if interval != meta.interval {
            return Err(CodecError::malformed(
                "candle sequence",
                format!("header interval {} does not match candles ({interval})", meta.interval),
            ));
        }
        debug!(count = seq.count(), bytes = bytes.len(), "decoded candle sequence");
        Ok(seq)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<usize> {
        let bytes = self.to_bytes()?;
        w.write_all(&bytes)?;
        Ok(bytes.len())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Self::from_bytes(&read_all(r)?)
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        self.write_to(&mut file)?;
        Ok(file.sync_all()?)
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_from(&mut File::open(path)?)
    }

    pub fn candle_updates(&self) -> impl Iterator<Item = CandleUpdate> + '_ {
        self.candles.iter().map(CandleUpdate::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn ts(t: i64) -> Timestamp {
        Timestamp::from_ticks(t).unwrap()
    }

    fn tick(t: i64, price: Decimal, volume: Decimal) -> Tick {
        Tick::new(ts(t), price, volume).unwrap()
    }

    fn make_ticks() -> Vec<Tick> {
        vec![
            tick(100, dec!(10.00), dec!(1)),
            tick(200, dec!(10.05), dec!(2)),
            tick(300, dec!(9.95), dec!(1)),
        ]
    }

    fn make_candles() -> Vec<Candle> {
        let minute = 60 * Timestamp::TICKS_PER_SECOND;
        vec![
            Candle::new(ts(minute), dec!(100.0), dec!(100.5), dec!(101.0), dec!(99.5), dec!(12)),
            Candle::new(ts(2 * minute), dec!(100.5), dec!(100.2), dec!(100.9), dec!(100.0), dec!(7.5)),
            Candle::new(ts(3 * minute), dec!(100.2), dec!(101.3), dec!(101.5), dec!(100.1), dec!(20)),
        ]
    }

    #[test]
    fn test_tick_scenario() {
        let seq = TickSequence::new(make_ticks(), dec!(0.01)).unwrap();
        let meta = seq.metadata();
        assert_eq!(meta.count, 3);
        assert_eq!(meta.first, tick(100, dec!(10.00), dec!(1)));

        let diffs = seq.diffs(&CodecOptions::default()).unwrap();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].price_delta(), 5);
        assert_eq!(diffs[1].price_delta(), -10);

        let bytes = seq.to_bytes().unwrap();
        assert_eq!(bytes.len(), 68 + 2 * 26);
        let decoded = TickSequence::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.ticks(), make_ticks().as_slice());
    }

    #[test]
    fn test_tick_metadata_roundtrip() {
        let seq = TickSequence::new(make_ticks(), dec!(0.01)).unwrap();
        let bytes = seq.write_metadata().unwrap();
        assert_eq!(bytes.len(), TickSequence::METADATA_LEN);
        assert_eq!(bytes.len(), 68);
        assert_eq!(TickSequence::read_metadata(&bytes).unwrap(), seq.metadata());
    }

    #[test]
    fn test_tick_sequence_sorts_input() {
        let mut ticks = make_ticks();
        ticks.reverse();
        let seq = TickSequence::new(ticks, dec!(0.01)).unwrap();
        assert_eq!(seq.ticks(), make_ticks().as_slice());
        assert!(seq.beginning() <= seq.ending());
        assert_eq!(seq.timespan(), TimeDelta::nanoseconds(200 * 100));
    }

    #[test]
    fn test_rejects_bad_resolution() {
        for mpc in [dec!(0), dec!(-0.01)] {
            assert!(matches!(
                TickSequence::new(make_ticks(), mpc),
                Err(CodecError::InvalidArgument { name: "min_price_change", .. })
            ));
            assert!(matches!(
                CandleSequence::new(make_candles(), mpc),
                Err(CodecError::InvalidArgument { name: "min_price_change", .. })
            ));
        }
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            TickSequence::new(Vec::new(), dec!(0.01)),
            Err(CodecError::InvalidArgument { .. })
        ));
        assert!(matches!(
            CandleSequence::new(Vec::new(), dec!(0.01)),
            Err(CodecError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_single_tick() {
        let seq = TickSequence::new([tick(1000, dec!(150), dec!(3))], dec!(0.01)).unwrap();
        let bytes = seq.to_bytes().unwrap();
        assert_eq!(bytes.len(), TickSequence::METADATA_LEN);
        let decoded = TickSequence::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, seq);
        assert_eq!(decoded.timespan(), TimeDelta::zero());
    }

    #[test]
    fn test_tick_overflow_policy() {
        let ticks = [tick(1, dec!(1), dec!(1)), tick(2, dec!(400), dec!(1))];
        let seq = TickSequence::new(ticks, dec!(0.01)).unwrap();
        assert!(matches!(
            seq.to_bytes(),
            Err(CodecError::QuantizationOverflow { field: "price", .. })
        ));

        let opts = CodecOptions::with_overflow(OverflowPolicy::Saturate);
        let decoded = TickSequence::from_bytes(&seq.to_bytes_with(&opts).unwrap()).unwrap();
        assert_eq!(decoded.last().price(), dec!(1) + dec!(327.67));
    }

    #[test]
    fn test_truncated_stream_is_malformed() {
        let bytes = TickSequence::new(make_ticks(), dec!(0.01)).unwrap().to_bytes().unwrap();
        for len in [0, 10, 67, 68, 93, bytes.len() - 1] {
            assert!(
                matches!(
                    TickSequence::from_bytes(&bytes[..len]),
                    Err(CodecError::MalformedRecord { .. })
                ),
                "length {len} should be rejected"
            );
        }
        let mut long = bytes.clone();
        long.push(0);
        assert!(matches!(
            TickSequence::from_bytes(&long),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_bad_count_is_malformed() {
        let mut bytes = TickSequence::new(make_ticks(), dec!(0.01)).unwrap().to_bytes().unwrap();
        bytes[64..68].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(
            TickSequence::from_bytes(&bytes),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_last_time_mismatch_is_malformed() {
        let mut bytes = TickSequence::new(make_ticks(), dec!(0.01)).unwrap().to_bytes().unwrap();
        bytes[40..48].copy_from_slice(&301i64.to_le_bytes());
        assert!(matches!(
            TickSequence::from_bytes(&bytes),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_backwards_time_delta_is_malformed() {
        let seq = TickSequence::new(
            [tick(100, dec!(1), dec!(1)), tick(150, dec!(1), dec!(1))],
            dec!(0.01),
        )
        .unwrap();
        let mut bytes = seq.to_bytes().unwrap();
        // header last time 50, diff delta -50: consistent before sorting
        bytes[40..48].copy_from_slice(&50i64.to_le_bytes());
        bytes[68..76].copy_from_slice(&(-50i64).to_le_bytes());
        assert!(matches!(
            TickSequence::from_bytes(&bytes),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_candle_backwards_time_delta_is_malformed() {
        let seq = CandleSequence::new(make_candles().into_iter().take(2), dec!(0.1)).unwrap();
        let mut bytes = seq.to_bytes().unwrap();
        let minute = 60 * Timestamp::TICKS_PER_SECOND;
        let last_at = Candle::ENCODED_LEN;
        let interval_at = Candle::ENCODED_LEN + TIME_LEN + DECIMAL_LEN;
        bytes[last_at..last_at + 8].copy_from_slice(&0i64.to_le_bytes());
        bytes[interval_at..interval_at + 8].copy_from_slice(&minute.to_le_bytes());
        let diff_at = CandleSequence::METADATA_LEN;
        bytes[diff_at..diff_at + 8].copy_from_slice(&(-minute).to_le_bytes());
        assert!(matches!(
            CandleSequence::from_bytes(&bytes),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_zero_price_in_header_is_malformed() {
        let mut bytes = TickSequence::new(make_ticks(), dec!(0.01)).unwrap().to_bytes().unwrap();
        bytes[8..24].fill(0);
        assert!(matches!(
            TickSequence::from_bytes(&bytes),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_candle_overflow_policy() {
        let c = |t, p: Decimal| Candle::new(ts(t), p, p, p, p, dec!(1));
        let seq = CandleSequence::new([c(1, dec!(1)), c(2, dec!(500))], dec!(0.01)).unwrap();
        assert!(matches!(
            seq.to_bytes(),
            Err(CodecError::QuantizationOverflow { field: "open", .. })
        ));

        let opts = CodecOptions::with_overflow(OverflowPolicy::Saturate);
        let decoded = CandleSequence::from_bytes(&seq.to_bytes_with(&opts).unwrap()).unwrap();
        let last = decoded.last();
        assert_eq!(last.open, dec!(328.67));
        assert_eq!((last.close, last.high, last.low), (dec!(328.67), dec!(328.67), dec!(328.67)));

        let down = CandleSequence::new([c(1, dec!(500)), c(2, dec!(1))], dec!(0.01)).unwrap();
        let decoded = CandleSequence::from_bytes(&down.to_bytes_with(&opts).unwrap()).unwrap();
        assert_eq!(decoded.last().low, dec!(500) - dec!(327.68));
    }

    #[test]
    fn test_candle_quantization_edges() {
        let seq = CandleSequence::new(
            [
                Candle::new(ts(0), dec!(400), dec!(400), dec!(400), dec!(400), dec!(1)),
                Candle::new(ts(10), dec!(727.67), dec!(72.32), dec!(727.67), dec!(72.32), dec!(1)),
            ],
            dec!(0.01),
        )
        .unwrap();
        let diffs = seq.diffs(&CodecOptions::default()).unwrap();
        assert_eq!(
            (diffs[0].open_delta, diffs[0].close_delta, diffs[0].high_delta, diffs[0].low_delta),
            (i16::MAX, i16::MIN, i16::MAX, i16::MIN)
        );
        let decoded = CandleSequence::from_bytes(&seq.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.candles(), seq.candles());
    }

    #[test]
    fn test_tick_writer_reader() {
        let seq = TickSequence::new(make_ticks(), dec!(0.01)).unwrap();
        let mut buf = Vec::new();
        let written = seq.write_to(&mut buf).unwrap();
        assert_eq!(written, seq.encoded_len());

        let restored = TickSequence::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(restored, seq);
    }

    #[test]
    fn test_candle_roundtrip() {
        let seq = CandleSequence::new(make_candles(), dec!(0.1)).unwrap();
        let bytes = seq.to_bytes().unwrap();
        assert_eq!(bytes.len(), 124 + 2 * 32);
        assert_eq!(CandleDiff::ENCODED_LEN, 32);

        let decoded = CandleSequence::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.candles(), make_candles().as_slice());
        assert_eq!(decoded.interval(), Some(TimeDelta::minutes(1)));
        assert_eq!(decoded.timespan(), TimeDelta::minutes(2));
        assert_eq!(decoded.metadata(), seq.metadata());
    }

    #[test]
    fn test_candle_metadata_len() {
        let seq = CandleSequence::new(make_candles(), dec!(0.1)).unwrap();
        let bytes = seq.write_metadata().unwrap();
        assert_eq!(bytes.len(), CandleSequence::METADATA_LEN);
        assert_eq!(bytes.len(), 124);
        let meta = CandleSequence::read_metadata(&bytes).unwrap();
        assert_eq!(meta.interval, 60 * Timestamp::TICKS_PER_SECOND);
        assert_eq!(meta.count, 3);
    }

    #[test]
    fn test_single_candle_has_no_interval() {
        let seq = CandleSequence::new(make_candles().into_iter().take(1), dec!(0.1)).unwrap();
        assert_eq!(seq.interval(), None);
        assert_eq!(seq.metadata().interval, 0);

        let bytes = seq.to_bytes().unwrap();
        assert_eq!(bytes.len(), CandleSequence::METADATA_LEN);
        let decoded = CandleSequence::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, seq);
    }

    #[test]
    fn test_candle_interval_mismatch_is_malformed() {
        let mut bytes = CandleSequence::new(make_candles(), dec!(0.1))
            .unwrap()
            .to_bytes()
            .unwrap();
        let at = Candle::ENCODED_LEN + TIME_LEN + DECIMAL_LEN;
        bytes[at..at + 8].copy_from_slice(&1i64.to_le_bytes());
        assert!(matches!(
            CandleSequence::from_bytes(&bytes),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_candle_updates_follow_order() {
        let seq = CandleSequence::new(make_candles(), dec!(0.1)).unwrap();
        let updates: Vec<CandleUpdate> = seq.candle_updates().collect();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2].close, dec!(101.3));
        assert_eq!(updates[0].time, seq.first_candle_time());
    }
}
