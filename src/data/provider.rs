use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{CandlePoint, HistoryWindow};

/// Abstract interface for fetching chart history.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Candles for `symbol` covering `window`, oldest first. Records that fail
    /// to parse are dropped rather than failing the whole request.
    async fn fetch_candles(&self, symbol: &str, window: HistoryWindow) -> Result<Vec<CandlePoint>>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}
