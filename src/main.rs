use std::error::Error;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tickseq::{Candle, CandleSequence, CodecOptions, ObjectStore, Tick, TickSequence, Timestamp};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn price(x: f64) -> Result<Decimal, Box<dyn Error>> {
    Decimal::from_f64(x)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| format!("{x} is not representable").into())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = CodecOptions::from_env()?;
    info!(overflow = %options.overflow, "codec options loaded");

    println!("Delta-encoded tick storage");
    println!("==========================\n");

    let start_time = Timestamp::from_ticks(638_901_792_000_000_000)?;
    let mut ticks = Vec::new();
    for i in 0..1000 {
        let volatility = (i as f64 / 100.0).sin() * 0.5;
        let time = Timestamp::from_ticks(start_time.ticks() + i * Timestamp::TICKS_PER_SECOND)?;
        let volume = Decimal::from(1 + i % 7);
        ticks.push(Tick::new(time, price(150.0 + volatility + i as f64 * 0.01)?, volume)?);
    }

    let original_size = ticks.len() * Tick::ENCODED_LEN;
    println!("Original data:");
    println!("  Ticks: {}", ticks.len());
    println!("  Raw size: {original_size} bytes\n");

    let seq = TickSequence::new(ticks, Decimal::new(1, 2))?;
    let started = std::time::Instant::now();
    let encoded = seq.to_bytes_with(&options)?;
    let encode_time = started.elapsed();

    println!("Encoded data:");
    println!("  Size: {} bytes", encoded.len());
    println!(
        "  Saved: {:.2}%",
        (1.0 - encoded.len() as f64 / original_size as f64) * 100.0
    );
    println!("  Encode time: {encode_time:?}\n");

    let started = std::time::Instant::now();
    let decoded = TickSequence::from_bytes(&encoded)?;
    println!("Decoded data:");
    println!("  Ticks restored: {}", decoded.count());
    println!("  Span: {} .. {}", decoded.beginning(), decoded.ending());
    println!("  Decode time: {:?}", started.elapsed());
    println!("  Exact: {}\n", decoded == seq);

    let minute = 60 * Timestamp::TICKS_PER_SECOND;
    let candles = decoded
        .ticks()
        .chunks(60)
        .map(|window| -> Result<Candle, Box<dyn Error>> {
            let first = window.first().ok_or("empty window")?;
            let last = window.last().ok_or("empty window")?;
            let high = window.iter().map(Tick::price).max().ok_or("empty window")?;
            let low = window.iter().map(Tick::price).min().ok_or("empty window")?;
            let volume: Decimal = window.iter().map(Tick::volume).sum();
            let bucket = Timestamp::from_ticks(first.time().ticks() / minute * minute)?;
            Ok(Candle::new(bucket, first.price(), last.price(), high, low, volume))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let candles = CandleSequence::new(candles, Decimal::new(1, 2))?;
    println!("Candles:");
    println!("  Count: {}", candles.count());
    if let Some(interval) = candles.interval() {
        println!("  Interval: {}s", interval.num_seconds());
    }
    println!("  Encoded size: {} bytes\n", candles.encoded_len());

    println!("--- Object store ---");
    let root = std::env::temp_dir().join("tickseq-objects");
    let store = ObjectStore::new(&root);
    let id = store.put_ticks(&seq)?;
    println!("✓ Ticks stored as {id}");
    let restored = store.get_ticks(&id)?;
    println!("✓ Loaded {} ticks back", restored.count());
    let candle_id = store.put_candles(&candles)?;
    println!("✓ Candles stored as {candle_id}");

    std::fs::remove_dir_all(&root).ok();
    println!("✓ Cleanup complete");
    Ok(())
}
