use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use market_pulse::config::HYPERLIQUID;
use market_pulse::data::{L2BookConnector, StreamSessionManager, TickSink};
use market_pulse::domain::normalize_coin;

// Usage: probe_stream [SYMBOL] [SECONDS]
const DEFAULT_SYMBOL: &str = "BTC";
const DEFAULT_SECONDS: u64 = 20;

struct LoggingSink {
    symbol: String,
    ticks: AtomicUsize,
}

impl TickSink for LoggingSink {
    fn on_tick(&self, price: f64) {
        let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        log::info!("{} #{}: best bid {}", self.symbol, n, price);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Setup Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Arguments
    let mut args = std::env::args().skip(1);
    let symbol = normalize_coin(&args.next().unwrap_or_else(|| DEFAULT_SYMBOL.to_string()));
    let seconds = match args.next() {
        Some(s) => s.parse::<u64>().context("SECONDS must be a whole number")?,
        None => DEFAULT_SECONDS,
    };

    log::info!(
        "Probing {} {} for {} ({}s)",
        HYPERLIQUID.ws_url,
        HYPERLIQUID.book_channel,
        symbol,
        seconds
    );

    // 3. Subscribe
    let sessions = StreamSessionManager::new(Arc::new(L2BookConnector::default()));
    let sink = Arc::new(LoggingSink {
        symbol: symbol.clone(),
        ticks: AtomicUsize::new(0),
    });
    let claim = sessions.ensure_subscription(&symbol, sink.clone())?;

    // 4. Listen
    tokio::time::sleep(Duration::from_secs(seconds)).await;

    let live = sessions.is_claim_live(&claim);
    sessions.release(&claim);

    let received = sink.ticks.load(Ordering::Relaxed);
    if received == 0 {
        log::warn!("⚠ No ticks received for {} (session live at end: {})", symbol, live);
    } else {
        log::info!("✅ {} ticks for {} in {}s", received, symbol, seconds);
    }
    Ok(())
}
