use serde::{Deserialize, Serialize};

// Define the CandleType enum
#[derive(Debug, PartialEq)]
pub enum CandleType {
    Bullish,
    Bearish,
}

/// One chart bar. `time` is in seconds since epoch (what the chart surface keys on).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl CandlePoint {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        CandlePoint {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// Build from an upstream record stamped in milliseconds.
    /// Returns `None` if any field is not a finite number.
    pub fn from_ms(open_time_ms: i64, open: f64, high: f64, low: f64, close: f64) -> Option<Self> {
        if [open, high, low, close].iter().all(|v| v.is_finite()) {
            Some(Self::new(open_time_ms.div_euclid(1000), open, high, low, close))
        } else {
            None
        }
    }

    // A method to determine the type of candle
    pub fn get_type(&self) -> CandleType {
        if self.close >= self.open {
            CandleType::Bullish
        } else {
            CandleType::Bearish
        }
    }

    /// Fold a live price into the current bucket: close follows the price and the
    /// wicks stretch to cover it. Time and open never move.
    pub fn apply_tick(&mut self, price: f64) {
        self.close = price;
        self.high = self.high.max(price);
        self.low = self.low.min(price);
    }

    /// Change from open to close, in percent of open.
    pub fn change_pct(&self) -> f64 {
        if self.open == 0.0 {
            return 0.0;
        }
        (self.close - self.open) / self.open * 100.0
    }
}

/// Percent change across a whole series (first open to last close).
pub fn series_change_pct(candles: &[CandlePoint]) -> Option<f64> {
    let first = candles.first()?;
    let last = candles.last()?;
    if first.open == 0.0 {
        return None;
    }
    Some((last.close - first.open) / first.open * 100.0)
}
