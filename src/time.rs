use std::fmt;

use bincode::de::Decoder;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Point in time as a count of 100ns ticks since 0001-01-01T00:00:00 UTC.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Timestamp(i64);

impl Timestamp {
    pub const TICKS_PER_SECOND: i64 = 10_000_000;
    const NANOS_PER_TICK: i64 = 100;
    /// Ticks between 0001-01-01 and 1970-01-01.
    const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

    pub const MIN: Timestamp = Timestamp(0);
    /// 9999-12-31T23:59:59.9999999
    pub const MAX: Timestamp = Timestamp(3_155_378_975_999_999_999);

    pub fn from_ticks(ticks: i64) -> Result<Self> {
        if !(Self::MIN.0..=Self::MAX.0).contains(&ticks) {
            return Err(CodecError::invalid(
                "ticks",
                format!("{ticks} is outside the supported timestamp range"),
            ));
        }
        Ok(Timestamp(ticks))
    }

    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Sub-tick precision (below 100ns) is truncated.
    pub fn from_datetime(dt: DateTime<Utc>) -> Result<Self> {
        let ticks = dt
            .timestamp()
            .checked_mul(Self::TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(i64::from(dt.timestamp_subsec_nanos()) / Self::NANOS_PER_TICK))
            .and_then(|t| t.checked_add(Self::UNIX_EPOCH_TICKS))
            .ok_or_else(|| CodecError::invalid("datetime", format!("{dt} overflows the tick range")))?;
        Self::from_ticks(ticks)
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let rel = self.0 - Self::UNIX_EPOCH_TICKS;
        let secs = rel.div_euclid(Self::TICKS_PER_SECOND);
        let nanos = rel.rem_euclid(Self::TICKS_PER_SECOND) * Self::NANOS_PER_TICK;
        DateTime::from_timestamp(secs, nanos as u32)
    }

    pub fn checked_add_ticks(self, delta: i64) -> Option<Self> {
        self.0
            .checked_add(delta)
            .and_then(|t| Self::from_ticks(t).ok())
    }

    /// Signed tick count from `earlier` to `self`. Cannot overflow within the supported range.
    pub const fn ticks_since(self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }
}

/// Converts a signed tick count into a [`TimeDelta`].
pub fn ticks_to_time_delta(ticks: i64) -> TimeDelta {
    TimeDelta::microseconds(ticks / 10) + TimeDelta::nanoseconds((ticks % 10) * 100)
}

impl TryFrom<i64> for Timestamp {
    type Error = CodecError;

    fn try_from(ticks: i64) -> Result<Self> {
        Timestamp::from_ticks(ticks)
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl TryFrom<DateTime<Utc>> for Timestamp {
    type Error = CodecError;

    fn try_from(dt: DateTime<Utc>) -> Result<Self> {
        Timestamp::from_datetime(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)),
            None => write!(f, "{} ticks", self.0),
        }
    }
}

impl Encode for Timestamp {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> core::result::Result<(), EncodeError> {
        self.0.encode(encoder)
    }
}

impl<Context> Decode<Context> for Timestamp {
    fn decode<D: Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> core::result::Result<Self, DecodeError> {
        let ticks: i64 = Decode::decode(decoder)?;
        Timestamp::from_ticks(ticks).map_err(|e| DecodeError::OtherString(e.to_string()))
    }
}
