pub struct BinanceApiConfig {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Default for BinanceApiConfig {
    fn default() -> Self {
        Self {
            timeout_ms: BINANCE.client.timeout_ms,
            retries: BINANCE.client.retries,
            backoff_ms: BINANCE.client.backoff_ms,
        }
    }
}

/// Spot klines paging.
pub struct RestLimits {
    pub klines_limit: i32,
    /// Page cap when paging forward through one history window.
    pub max_kline_pages: usize,
}

pub struct FuturesConfig {
    pub premium_index_url: &'static str,
    /// Perp symbols shown in the funding table (quote asset included).
    pub funding_symbols: &'static [&'static str],
}

pub struct ClientDefaults {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

pub const BINANCE_QUOTE_ASSET: &str = "USDT";

pub struct BinanceConfig {
    pub limits: RestLimits,
    pub futures: FuturesConfig,
    pub client: ClientDefaults,
}

pub const BINANCE: BinanceConfig = BinanceConfig {
    limits: RestLimits {
        klines_limit: 1000,
        max_kline_pages: 8,
    },
    futures: FuturesConfig {
        premium_index_url: "https://fapi.binance.com/fapi/v1/premiumIndex",
        funding_symbols: &["BTCUSDT", "ETHUSDT", "HYPEUSDT"],
    },
    client: ClientDefaults {
        timeout_ms: 5000,
        retries: 1,
        backoff_ms: 1000,
    },
};
