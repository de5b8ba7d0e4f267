//! Hyperliquid `POST /info` gateway: candle history and per-asset contexts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::HYPERLIQUID;
use crate::data::{CandleSource, FetchError, JsonClient};
use crate::domain::{CandlePoint, HistoryWindow, MarketAsset};

#[cfg(debug_assertions)]
use crate::config::DF;

/// Upstream candle record. Prices arrive as decimal strings.
#[derive(Debug, Deserialize)]
struct RawCandle {
    t: i64,
    o: String,
    h: String,
    l: String,
    c: String,
}

impl RawCandle {
    fn into_point(self) -> Option<CandlePoint> {
        CandlePoint::from_ms(
            self.t,
            self.o.parse().ok()?,
            self.h.parse().ok()?,
            self.l.parse().ok()?,
            self.c.parse().ok()?,
        )
    }
}

/// Map a raw `candleSnapshot` payload into chart points. Records that are not
/// objects with parseable `t/o/h/l/c` are dropped individually.
pub fn parse_candle_snapshot(payload: serde_json::Value) -> Result<Vec<CandlePoint>> {
    let serde_json::Value::Array(records) = payload else {
        return Err(FetchError::Malformed("candleSnapshot: expected an array".into()).into());
    };

    let total = records.len();
    let mut points: Vec<CandlePoint> = records
        .into_iter()
        .filter_map(|r| serde_json::from_value::<RawCandle>(r).ok())
        .filter_map(RawCandle::into_point)
        .collect();
    points.sort_by_key(|p| p.time);
    points.dedup_by_key(|p| p.time);

    if points.len() < total {
        log::warn!(
            "candleSnapshot: dropped {} of {} records",
            total - points.len(),
            total
        );
    }
    Ok(points)
}

#[derive(Debug, Deserialize)]
struct Meta {
    universe: Vec<UniverseEntry>,
}

#[derive(Debug, Deserialize)]
struct UniverseEntry {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetCtx {
    #[serde(default)]
    funding: Option<String>,
    #[serde(default)]
    mark_px: Option<String>,
    #[serde(default)]
    day_ntl_vlm: Option<String>,
}

fn parse_num(s: &Option<String>) -> Option<f64> {
    s.as_deref().and_then(|v| v.parse::<f64>().ok())
}

/// Universe entries joined index-wise with their contexts.
pub fn parse_asset_contexts(payload: serde_json::Value) -> Result<Vec<MarketAsset>> {
    let (meta, ctxs): (Meta, Vec<serde_json::Value>) = serde_json::from_value(payload)
        .map_err(|e| FetchError::Malformed(format!("metaAndAssetCtxs: {}", e)))?;

    Ok(meta
        .universe
        .into_iter()
        .zip(ctxs)
        .map(|(u, raw)| {
            let ctx: AssetCtx = serde_json::from_value(raw).unwrap_or_default();
            MarketAsset {
                name: u.name,
                price: parse_num(&ctx.mark_px).unwrap_or(0.0),
                volume: parse_num(&ctx.day_ntl_vlm).unwrap_or(0.0),
                funding: parse_num(&ctx.funding),
            }
        })
        .collect())
}

/// Keep `symbols` in the given order, zero-filling the ones upstream did not list.
pub fn select_assets(all: &[MarketAsset], symbols: &[&str]) -> Vec<MarketAsset> {
    symbols
        .iter()
        .map(|s| {
            all.iter()
                .find(|a| a.name == *s)
                .cloned()
                .unwrap_or_else(|| MarketAsset::missing(s))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct HyperliquidClient {
    http: JsonClient,
}

impl HyperliquidClient {
    pub fn new(http: JsonClient) -> Self {
        Self { http }
    }

    pub async fn candle_snapshot(
        &self,
        coin: &str,
        window: HistoryWindow,
    ) -> Result<Vec<CandlePoint>> {
        let body = json!({
            "type": "candleSnapshot",
            "req": {
                "coin": coin,
                "interval": window.interval_code(),
                "startTime": window.start_ms,
                "endTime": window.end_ms,
            }
        });

        let payload: serde_json::Value = self
            .http
            .post_json(HYPERLIQUID.info_url, &body)
            .await
            .with_context(|| format!("candleSnapshot {} {}", coin, window.interval_code()))?;
        parse_candle_snapshot(payload)
    }

    pub async fn asset_contexts(&self) -> Result<Vec<MarketAsset>> {
        let payload: serde_json::Value = self
            .http
            .post_json(HYPERLIQUID.info_url, &json!({ "type": "metaAndAssetCtxs" }))
            .await
            .context("metaAndAssetCtxs")?;
        parse_asset_contexts(payload)
    }
}

#[async_trait]
impl CandleSource for HyperliquidClient {
    async fn fetch_candles(&self, symbol: &str, window: HistoryWindow) -> Result<Vec<CandlePoint>> {
        let candles = self.candle_snapshot(symbol, window).await?;

        #[cfg(debug_assertions)]
        if DF.log_controller {
            log::info!(
                "Hyperliquid: {} candles for {} ({})",
                candles.len(),
                symbol,
                window.interval_code()
            );
        }
        Ok(candles)
    }

    fn name(&self) -> &'static str {
        "hyperliquid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_drops_bad_records_and_sorts() {
        let payload = json!([
            {"t": 1_700_003_600_000i64, "T": 0, "s": "BTC", "i": "1h", "o": "2", "h": "3", "l": "1", "c": "2.5", "v": "9", "n": 4},
            {"t": 1_700_000_000_000i64, "o": "1", "h": "2", "l": "0.5", "c": "1.5"},
            {"t": 1_700_007_200_000i64, "o": "abc", "h": "2", "l": "0.5", "c": "1.5"},
            "not-an-object",
            {"o": "1", "h": "2", "l": "0.5", "c": "1.5"}
        ]);
        let points = parse_candle_snapshot(payload).unwrap();
        assert_eq!(
            points,
            vec![
                CandlePoint::new(1_700_000_000, 1.0, 2.0, 0.5, 1.5),
                CandlePoint::new(1_700_003_600, 2.0, 3.0, 1.0, 2.5),
            ]
        );
    }

    #[test]
    fn snapshot_rejects_non_array() {
        let err = parse_candle_snapshot(json!({"error": "bad coin"})).unwrap_err();
        assert!(matches!(FetchError::from(err), FetchError::Malformed(_)));
    }

    #[test]
    fn asset_contexts_join_by_index_and_fill_missing() {
        let payload = json!([
            {"universe": [{"name": "BTC", "szDecimals": 5}, {"name": "ETH"}, {"name": "DOGE"}]},
            [
                {"funding": "0.0000125", "markPx": "65000.5", "dayNtlVlm": "1200000000"},
                {"funding": "0.00001", "markPx": "3200", "dayNtlVlm": "bad"},
                {"markPx": "0.1"}
            ]
        ]);
        let all = parse_asset_contexts(payload).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].volume, 0.0);
        assert_eq!(all[2].funding, None);

        let picked = select_assets(&all, &["ETH", "BTC", "SUI"]);
        assert_eq!(picked[0].name, "ETH");
        assert_eq!(picked[1].price, 65000.5);
        assert_eq!(picked[1].funding, Some(0.0000125));
        assert_eq!(picked[2], MarketAsset::missing("SUI"));
    }
}
