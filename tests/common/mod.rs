//! In-process stand-ins for the candle source and the stream connector.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use market_pulse::data::{
    CandleSource, PriceTick, SessionEvents, StreamConnection, StreamConnector, TickSink,
};
use market_pulse::domain::{CandlePoint, HistoryWindow};

pub const BARS_PER_FETCH: usize = 3;

/// Base price each fake bar is built around.
pub fn base_price(symbol: &str) -> f64 {
    match symbol {
        "BTC" => 100.0,
        "ETH" => 10.0,
        _ => 1.0,
    }
}

#[derive(Default)]
pub struct FakeSource {
    calls: AtomicUsize,
    failing: AtomicBool,
    delays: Mutex<HashMap<String, Duration>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, symbol: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(symbol.to_string(), delay);
    }
}

#[async_trait]
impl CandleSource for FakeSource {
    async fn fetch_candles(&self, symbol: &str, window: HistoryWindow) -> Result<Vec<CandlePoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(symbol).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("upstream unavailable"));
        }

        let base = base_price(symbol);
        let step = window.interval_ms / 1000;
        Ok((0..BARS_PER_FETCH as i64)
            .map(|i| {
                CandlePoint::new(window.start_ms / 1000 + i * step, base, base + 1.0, base - 1.0, base)
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Records every session opened and closed; tests drive ticks and teardown
/// through the captured [`SessionEvents`].
#[derive(Default)]
pub struct FakeConnector {
    opened: Mutex<Vec<(String, SessionEvents)>>,
    closed: Arc<Mutex<Vec<u64>>>,
    refuse: AtomicBool,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn opened_symbols(&self) -> Vec<String> {
        self.opened.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }

    /// Session ids whose connection was closed, in order.
    pub fn closed(&self) -> Vec<u64> {
        self.closed.lock().unwrap().clone()
    }

    /// Events handle of the `n`th opened session.
    pub fn events(&self, n: usize) -> SessionEvents {
        self.opened.lock().unwrap()[n].1.clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    /// Connections opened and not yet closed.
    pub fn live_connections(&self) -> usize {
        self.open_count() - self.closed().len()
    }

    pub fn push_tick(&self, n: usize, symbol: &str, price: f64) {
        self.events(n).tick(PriceTick {
            symbol: symbol.to_string(),
            price,
        });
    }
}

impl StreamConnector for FakeConnector {
    fn open(&self, symbol: &str, events: SessionEvents) -> Result<Box<dyn StreamConnection>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        let session_id = events.session_id();
        self.opened.lock().unwrap().push((symbol.to_string(), events));
        Ok(Box::new(FakeConnection {
            session_id,
            closed: self.closed.clone(),
            done: false,
        }))
    }
}

struct FakeConnection {
    session_id: u64,
    closed: Arc<Mutex<Vec<u64>>>,
    done: bool,
}

impl StreamConnection for FakeConnection {
    fn close(&mut self) {
        if !self.done {
            self.done = true;
            self.closed.lock().unwrap().push(self.session_id);
        }
    }
}

/// Collects every price it is handed.
#[derive(Default)]
pub struct RecordingSink {
    prices: Mutex<Vec<f64>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn prices(&self) -> Vec<f64> {
        self.prices.lock().unwrap().clone()
    }
}

impl TickSink for RecordingSink {
    fn on_tick(&self, price: f64) {
        self.prices.lock().unwrap().push(price);
    }
}
