use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::config::HYPERLIQUID;

/// One row of the market snapshot widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAsset {
    pub name: String,
    pub price: f64,
    /// 24h notional volume.
    pub volume: f64,
    /// Hourly funding rate as a fraction; `None` when the venue did not list the asset.
    pub funding: Option<f64>,
}

impl MarketAsset {
    pub fn missing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            price: 0.0,
            volume: 0.0,
            funding: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Exchange {
    Binance,
    Hyperliquid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    pub symbol: String,
    /// Annualized percentage, already rounded to two decimals.
    pub rate: String,
    pub next_funding_time: i64,
    pub exchange: Exchange,
}

/// Canonical coin name as the exchange lists it: upper case, except the
/// lowercase `k` of thousand-unit contracts (`kpepe` -> `kPEPE`).
pub fn normalize_coin(symbol: &str) -> String {
    let upper = symbol.trim().to_ascii_uppercase();
    match upper.strip_prefix('K') {
        Some(base) if HYPERLIQUID.thousand_unit_bases.contains(&base) => format!("k{}", base),
        _ => upper,
    }
}

/// Per-period funding rate expressed as annual percentage, 2 dp.
pub fn annualize_funding(rate: f64, periods_per_year: f64) -> String {
    format!("{:.2}", rate * periods_per_year * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    pub value: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MacroKind {
    /// M2 money stock.
    M2,
    /// Money market fund assets.
    #[strum(to_string = "money-market", serialize = "mmf")]
    MoneyMarket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSeries {
    pub title: String,
    pub unit: String,
    pub description: String,
    pub data: Vec<SeriesPoint>,
}

pub type DailyVolume = SeriesPoint;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsMetrics {
    pub retweets: u64,
    pub likes: u64,
    pub replies: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    pub source: String,
    pub url: String,
    pub category: String,
    pub metrics: NewsMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub participants_count: u64,
    #[serde(default)]
    pub about: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPost {
    pub id: i64,
    pub text: String,
    /// Seconds since epoch.
    pub date: i64,
    pub sender: String,
    pub views: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn annualized_hourly_rate() {
        assert_eq!(annualize_funding(0.0001, 8760.0), "87.60");
        assert_eq!(annualize_funding(-0.0000125, 8760.0), "-10.95");
    }

    #[test]
    fn coin_names_are_normalized() {
        assert_eq!(normalize_coin("btc"), "BTC");
        assert_eq!(normalize_coin(" eth "), "ETH");
        assert_eq!(normalize_coin("kpepe"), "kPEPE");
        assert_eq!(normalize_coin("kPEPE"), "kPEPE");
        assert_eq!(normalize_coin("kaito"), "KAITO");
    }

    #[test]
    fn macro_kind_tokens() {
        assert_eq!(MacroKind::from_str("m2"), Ok(MacroKind::M2));
        assert_eq!(MacroKind::from_str("mmf"), Ok(MacroKind::MoneyMarket));
        assert_eq!(MacroKind::M2.to_string(), "m2");
    }
}
