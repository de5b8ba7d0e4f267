pub struct HyperliquidConfig {
    /// REST `POST /info` endpoint (candleSnapshot, metaAndAssetCtxs).
    pub info_url: &'static str,
    /// Streaming endpoint for `l2Book` subscriptions.
    pub ws_url: &'static str,
    /// Channel name the order-book ticks arrive on.
    pub book_channel: &'static str,
    /// Funding is settled hourly: 24 * 365 periods per year.
    pub funding_periods_per_year: f64,
    pub funding_interval_ms: i64,
    /// Bases listed as thousand-unit contracts under a lowercase `k` prefix (`kPEPE`).
    pub thousand_unit_bases: &'static [&'static str],
}

pub const HYPERLIQUID: HyperliquidConfig = HyperliquidConfig {
    info_url: "https://api.hyperliquid.xyz/info",
    ws_url: "wss://api.hyperliquid.xyz/ws",
    book_channel: "l2Book",
    funding_periods_per_year: 8760.0,
    funding_interval_ms: 60 * 60 * 1000,
    thousand_unit_bases: &["PEPE", "SHIB", "BONK", "FLOKI", "LUNC", "DOGS", "NEIRO"],
};
