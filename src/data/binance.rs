use {
    anyhow::{Context, Result, anyhow},
    async_trait::async_trait,
    binance_sdk::{
        config::ConfigurationRestApi,
        errors::{self, ConnectorError as connection_error},
        spot::{
            SpotRestApi,
            rest_api::{KlinesIntervalEnum, KlinesItemInner, KlinesParams, RestApi},
        },
    },
    serde::Deserialize,
    std::{convert::TryFrom, error::Error, fmt},
};

use crate::{
    config::{BINANCE, BINANCE_QUOTE_ASSET, BinanceApiConfig, HYPERLIQUID},
    data::{CandleSource, FetchError, JsonClient},
    domain::{CandlePoint, Exchange, FundingRate, HistoryWindow, annualize_funding},
    utils::TimeUtils,
};

#[cfg(debug_assertions)]
use crate::config::DF;

pub fn try_interval_from_ms(ms: i64) -> Result<KlinesIntervalEnum, String> {
    use TimeUtils as T;
    match ms {
        T::MS_IN_MIN => Ok(KlinesIntervalEnum::Interval1m),
        T::MS_IN_15_MIN => Ok(KlinesIntervalEnum::Interval15m),
        T::MS_IN_H => Ok(KlinesIntervalEnum::Interval1h),
        T::MS_IN_4_H => Ok(KlinesIntervalEnum::Interval4h),
        T::MS_IN_D => Ok(KlinesIntervalEnum::Interval1d),
        _ => Err(format!("Unsupported interval: {}ms", ms)),
    }
}

/// Dashboard coin name to Binance spot pair, e.g. `BTC` -> `BTCUSDT`.
/// Hyperliquid's `k` prefix (thousand-unit contracts) has no spot counterpart.
pub fn spot_symbol(coin: &str) -> String {
    let base = match coin.strip_prefix('k') {
        Some(rest) if rest.chars().next().is_some_and(|c| c.is_ascii_uppercase()) => rest,
        _ => coin,
    };
    format!("{}{}", base.to_ascii_uppercase(), BINANCE_QUOTE_ASSET)
}

#[derive(Debug)]
pub enum BNKlineError {
    InvalidLength,
    InvalidType(String),
    ConnectionFailed(String),
}

impl fmt::Display for BNKlineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> std::fmt::Result {
        match self {
            BNKlineError::InvalidLength => write!(f, "Invalid length"),
            BNKlineError::InvalidType(string) => write!(f, "Invalid type: {}", string),
            BNKlineError::ConnectionFailed(msg) => {
                write!(f, "Binance API connection failed: {}.", msg)
            }
        }
    }
}

impl Error for BNKlineError {}

#[derive(Debug, PartialEq)]
struct BNKline {
    open_timestamp_ms: i64,
    open_price: Option<f64>,
    high_price: Option<f64>,
    low_price: Option<f64>,
    close_price: Option<f64>,
}

fn item_to_float(item: Option<KlinesItemInner>) -> Option<f64> {
    match item? {
        KlinesItemInner::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

impl TryFrom<Vec<KlinesItemInner>> for BNKline {
    type Error = BNKlineError;

    fn try_from(row: Vec<KlinesItemInner>) -> Result<Self, Self::Error> {
        let mut items = row.into_iter();
        let open_timestamp_ms = match items.next().ok_or(BNKlineError::InvalidLength)? {
            KlinesItemInner::Integer(a) => a,
            _ => return Err(BNKlineError::InvalidType("open_time".to_string())),
        };

        Ok(BNKline {
            open_timestamp_ms,
            open_price: item_to_float(items.next()),
            high_price: item_to_float(items.next()),
            low_price: item_to_float(items.next()),
            close_price: item_to_float(items.next()),
        })
    }
}

impl BNKline {
    fn into_point(self) -> Option<CandlePoint> {
        CandlePoint::from_ms(
            self.open_timestamp_ms,
            self.open_price?,
            self.high_price?,
            self.low_price?,
            self.close_price?,
        )
    }
}

/// Rows that fail conversion are dropped; the rest keep their order.
fn convert_rows(rows: Vec<Vec<KlinesItemInner>>) -> Vec<CandlePoint> {
    rows.into_iter()
        .filter_map(|row| BNKline::try_from(row).ok())
        .filter_map(BNKline::into_point)
        .collect()
}

fn configure_binance_client() -> Result<RestApi> {
    let config = BinanceApiConfig::default();
    let rest_conf = ConfigurationRestApi::builder()
        .timeout(config.timeout_ms)
        .retries(config.retries)
        .backoff(config.backoff_ms)
        .build()?;
    Ok(SpotRestApi::production(rest_conf))
}

fn map_connector_error(e: anyhow::Error, pair: &str) -> anyhow::Error {
    let Some(conn_err) = e.downcast_ref::<errors::ConnectorError>() else {
        log::error!("An unexpected error occurred for {}: {:#}", pair, e);
        return anyhow::Error::new(BNKlineError::ConnectionFailed(e.to_string()))
            .context(format!("Unexpected error during API call for {}", pair));
    };

    match conn_err {
        connection_error::TooManyRequestsError(msg) => {
            log::warn!("{} Rate limit exceeded. {}", pair, msg);
            return FetchError::RateLimited.into();
        }
        connection_error::RateLimitBanError(msg) => {
            log::error!("{} IP address banned due to excessive rate limits. {}", pair, msg);
            return FetchError::RateLimited.into();
        }
        connection_error::ConnectorClientError(msg) => {
            log::error!("{} Client error: Check your request parameters. {}", pair, msg);
        }
        connection_error::BadRequestError(msg) => {
            log::warn!("{} Bad request: Verify your input parameters. {}", pair, msg);
        }
        errors::ConnectorError::ServerError { msg, status_code } => {
            log::error!(
                "{} Server error: {} (status code: {:?})",
                pair,
                msg,
                status_code
            );
        }
        errors::ConnectorError::NetworkError(msg) => {
            log::error!("{} Network error: {}", pair, msg);
        }
        other => {
            log::error!("Unexpected ConnectionError variant: {:?}", other);
        }
    }
    anyhow::Error::new(BNKlineError::ConnectionFailed(conn_err.to_string()))
        .context(format!("Binance API call failed for {}", pair))
}

/// Spot klines via the official SDK. Pages forward from the window start until
/// a short page, the window end, or the page cap.
pub struct BinanceCandleSource {
    rest_client: RestApi,
}

impl BinanceCandleSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            rest_client: configure_binance_client()?,
        })
    }
}

#[async_trait]
impl CandleSource for BinanceCandleSource {
    async fn fetch_candles(&self, symbol: &str, window: HistoryWindow) -> Result<Vec<CandlePoint>> {
        let pair = spot_symbol(symbol);
        let interval = try_interval_from_ms(window.interval_ms).map_err(|e| anyhow!(e))?;
        let limit = BINANCE.limits.klines_limit;

        let mut all: Vec<CandlePoint> = Vec::new();
        let mut start_time = window.start_ms;

        for _page in 0..BINANCE.limits.max_kline_pages {
            let params = KlinesParams::builder(pair.clone(), interval.clone())
                .limit(limit)
                .start_time(Some(start_time))
                .end_time(Some(window.end_ms))
                .build()?;

            let rows = match self.rest_client.klines(params).await {
                Ok(r) => r.data().await?,
                Err(e) => return Err(map_connector_error(e, &pair)),
            };
            let row_count = rows.len();
            let batch = convert_rows(rows);

            #[cfg(debug_assertions)]
            if DF.log_controller {
                log::info!("Binance: page of {} klines for {}", row_count, pair);
            }

            let Some(last) = batch.last() else {
                break;
            };
            start_time = (last.time * 1000) + window.interval_ms;
            all.extend(batch);

            if row_count < limit as usize || start_time > window.end_ms {
                break;
            }
        }

        all.dedup_by_key(|c| c.time);
        Ok(all)
    }

    fn name(&self) -> &'static str {
        "binance"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumIndex {
    symbol: String,
    last_funding_rate: String,
    next_funding_time: i64,
}

/// Funding rows for `symbols` (quote asset included), in that order. Symbols
/// missing upstream, or with an unparsable rate, are skipped.
pub fn funding_from_premium_index(
    payload: serde_json::Value,
    symbols: &[&str],
) -> Result<Vec<FundingRate>> {
    let entries: Vec<PremiumIndex> = serde_json::from_value(payload)
        .map_err(|e| FetchError::Malformed(format!("premiumIndex: {}", e)))?;

    Ok(symbols
        .iter()
        .filter_map(|symbol| {
            let entry = entries.iter().find(|e| e.symbol == *symbol)?;
            let rate = entry.last_funding_rate.parse::<f64>().ok()?;
            Some(FundingRate {
                symbol: symbol
                    .strip_suffix(BINANCE_QUOTE_ASSET)
                    .unwrap_or(symbol)
                    .to_string(),
                rate: annualize_funding(rate, HYPERLIQUID.funding_periods_per_year),
                next_funding_time: entry.next_funding_time,
                exchange: Exchange::Binance,
            })
        })
        .collect())
}

/// USD-M futures funding, plain REST.
#[derive(Debug, Clone)]
pub struct BinanceFuturesClient {
    http: JsonClient,
}

impl BinanceFuturesClient {
    pub fn new(http: JsonClient) -> Self {
        Self { http }
    }

    pub async fn funding_rates(&self) -> Result<Vec<FundingRate>> {
        let payload: serde_json::Value = self
            .http
            .get_json(BINANCE.futures.premium_index_url, &[] as &[(&str, &str)])
            .await
            .context("premiumIndex")?;
        funding_from_premium_index(payload, BINANCE.futures.funding_symbols)
    }
}
