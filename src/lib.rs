mod compression;
mod config;
mod data;
mod delta_encoding;
mod error;
mod order;
mod strategy;
mod time;
mod types;
mod wire;

pub use compression::{CandleSequence, CandleSequenceMetadata, TickSequence, TickSequenceMetadata};
pub use config::{CodecOptions, OVERFLOW_POLICY_ENV, OverflowPolicy};
pub use data::ObjectStore;
pub use delta_encoding::{CandleDiff, TickDiff};
pub use error::{CodecError, Result};
pub use order::{Order, OrderSide, OrderStatus, OrderType};
pub use strategy::{Broker, CandleUpdate, PriceUpdate, Strategy, StrategyContext};
pub use time::{Timestamp, ticks_to_time_delta};
pub use types::{Candle, Tick};
