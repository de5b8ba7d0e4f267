//! Data path for the non-chart widgets.
//!
//! Every widget goes through [`fetch_through`]: fresh cache, then throttle,
//! then a bounded fetch, falling back to the last stored value on failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::{ApiKeys, CACHE, DASHBOARD, HYPERLIQUID};
use crate::data::{
    BinanceFuturesClient, ChannelFeed, EtherscanClient, FetchError, FredClient, HyperliquidClient,
    JsonClient, RelayChannelFeed, RequestThrottle, TtlCache, TwitterClient, select_assets,
};
use crate::domain::{
    ChannelInfo, ChannelPost, DailyVolume, Exchange, FundingRate, Indicator, MacroKind,
    MacroSeries, MarketAsset, NewsItem, annualize_funding,
};
use crate::utils::Clock;

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Fetched by this call.
    Fresh,
    /// Served from a fresh cache entry.
    Cached,
    /// Served from an expired entry because the fetch was throttled or failed.
    Stale { age_ms: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetData<T> {
    pub data: T,
    pub freshness: Freshness,
}

/// Cache, throttle and timeout policy shared by all widgets.
pub async fn fetch_through<T, F, Fut>(
    cache: &TtlCache<T>,
    throttle: &RequestThrottle,
    clock: &dyn Clock,
    key: &str,
    timeout: Duration,
    fetch: F,
) -> Result<WidgetData<T>, FetchError>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Some(data) = cache.get(key) {
        return Ok(WidgetData {
            data,
            freshness: Freshness::Cached,
        });
    }

    let stale = |err: FetchError| -> Result<WidgetData<T>, FetchError> {
        match cache.peek(key) {
            Some(entry) => {
                log::warn!("Widget '{}': serving stale data ({})", key, err);
                Ok(WidgetData {
                    freshness: Freshness::Stale {
                        age_ms: entry.age_ms(clock.now_ms()),
                    },
                    data: entry.data,
                })
            }
            None => Err(err),
        }
    };

    if throttle.should_skip(key) {
        return stale(FetchError::Throttled(key.to_string()));
    }

    let result = match tokio::time::timeout(timeout, fetch()).await {
        Err(_) => Err(FetchError::Timeout(timeout)),
        Ok(r) => r.map_err(FetchError::from),
    };

    match result {
        Ok(data) => {
            #[cfg(debug_assertions)]
            if DF.log_dashboard {
                log::info!("Widget '{}': refreshed", key);
            }
            cache.put(key, data.clone());
            Ok(WidgetData {
                data,
                freshness: Freshness::Fresh,
            })
        }
        Err(e) => stale(e),
    }
}

/// Merge Binance and Hyperliquid funding. Each side may fail on its own; only
/// both failing is an error.
fn merge_funding(
    binance: Result<Vec<FundingRate>>,
    hyperliquid: Result<Vec<FundingRate>>,
) -> Result<Vec<FundingRate>> {
    match (binance, hyperliquid) {
        (Ok(mut b), Ok(h)) => {
            b.extend(h);
            Ok(b)
        }
        (Ok(b), Err(e)) => {
            log::warn!("Hyperliquid funding unavailable: {:#}", e);
            Ok(b)
        }
        (Err(e), Ok(h)) => {
            log::warn!("Binance funding unavailable: {:#}", e);
            Ok(h)
        }
        (Err(b), Err(h)) => {
            log::warn!("Hyperliquid funding unavailable: {:#}", h);
            Err(b)
        }
    }
}

/// Hyperliquid funding rows for `coins`, matched by universe name.
pub fn hyperliquid_funding(assets: &[MarketAsset], coins: &[&str], now_ms: i64) -> Vec<FundingRate> {
    coins
        .iter()
        .filter_map(|coin| {
            let asset = assets.iter().find(|a| a.name == *coin)?;
            let rate = asset.funding?;
            Some(FundingRate {
                symbol: coin.to_string(),
                rate: annualize_funding(rate, HYPERLIQUID.funding_periods_per_year),
                next_funding_time: now_ms + HYPERLIQUID.funding_interval_ms,
                exchange: Exchange::Hyperliquid,
            })
        })
        .collect()
}

struct WidgetCaches {
    markets: TtlCache<Vec<MarketAsset>>,
    funding: TtlCache<Vec<FundingRate>>,
    indicators: TtlCache<Vec<Indicator>>,
    macros: TtlCache<MacroSeries>,
    eth_volume: TtlCache<Vec<DailyVolume>>,
    news: TtlCache<Vec<NewsItem>>,
    posts: TtlCache<Vec<ChannelPost>>,
    channel_info: TtlCache<ChannelInfo>,
}

fn market_lived<T: Clone>(clock: &Arc<dyn Clock>) -> TtlCache<T> {
    TtlCache::new(CACHE.cache.market_ttl, CACHE.cache.capacity, clock.clone())
}

fn short_lived<T: Clone>(clock: &Arc<dyn Clock>) -> TtlCache<T> {
    TtlCache::new(CACHE.cache.short_ttl, CACHE.cache.capacity, clock.clone())
}

fn long_lived<T: Clone>(clock: &Arc<dyn Clock>) -> TtlCache<T> {
    TtlCache::new(CACHE.cache.long_ttl, CACHE.cache.capacity, clock.clone())
}

impl WidgetCaches {
    fn new(clock: &Arc<dyn Clock>) -> Self {
        Self {
            markets: market_lived(clock),
            funding: short_lived(clock),
            indicators: long_lived(clock),
            macros: long_lived(clock),
            eth_volume: long_lived(clock),
            news: long_lived(clock),
            posts: long_lived(clock),
            channel_info: long_lived(clock),
        }
    }
}

pub struct DashboardService {
    hyperliquid: HyperliquidClient,
    binance: BinanceFuturesClient,
    fred: FredClient,
    etherscan: EtherscanClient,
    twitter: TwitterClient,
    channels: Arc<dyn ChannelFeed>,
    caches: WidgetCaches,
    throttle: RequestThrottle,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl DashboardService {
    pub fn new(http: JsonClient, keys: ApiKeys, clock: Arc<dyn Clock>) -> Self {
        Self {
            hyperliquid: HyperliquidClient::new(http.clone()),
            binance: BinanceFuturesClient::new(http.clone()),
            fred: FredClient::new(http.clone(), keys.fred),
            etherscan: EtherscanClient::new(http.clone(), keys.etherscan),
            twitter: TwitterClient::new(http.clone(), keys.twitter_bearer),
            channels: Arc::new(RelayChannelFeed::new(http, keys.message_feed_url)),
            caches: WidgetCaches::new(&clock),
            throttle: RequestThrottle::new(CACHE.throttle.min_interval, clock.clone()),
            clock,
            timeout: CACHE.timeouts.widget_fetch,
        }
    }

    pub fn with_channel_feed(mut self, feed: Arc<dyn ChannelFeed>) -> Self {
        self.channels = feed;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The throttle, so a chart context can share it.
    pub fn throttle(&self) -> RequestThrottle {
        self.throttle.clone()
    }

    async fn through<T, F, Fut>(
        &self,
        cache: &TtlCache<T>,
        key: &str,
        fetch: F,
    ) -> Result<WidgetData<T>, FetchError>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        fetch_through(cache, &self.throttle, self.clock.as_ref(), key, self.timeout, fetch).await
    }

    pub async fn market_snapshot(&self) -> Result<WidgetData<Vec<MarketAsset>>, FetchError> {
        self.through(&self.caches.markets, "market-snapshot", move || async move {
            let all = self.hyperliquid.asset_contexts().await?;
            Ok(select_assets(&all, DASHBOARD.market_symbols))
        })
        .await
    }

    pub async fn funding_rates(&self) -> Result<WidgetData<Vec<FundingRate>>, FetchError> {
        self.through(&self.caches.funding, "funding-rates", move || async move {
            let now = self.clock.now_ms();
            let (binance, hyperliquid) =
                tokio::join!(self.binance.funding_rates(), self.hyperliquid.asset_contexts());
            let hyperliquid =
                hyperliquid.map(|assets| hyperliquid_funding(&assets, DASHBOARD.funding_coins, now));
            merge_funding(binance, hyperliquid)
        })
        .await
    }

    pub async fn economic_indicators(&self) -> Result<WidgetData<Vec<Indicator>>, FetchError> {
        self.through(&self.caches.indicators, "economic-indicators", move || {
            self.fred.economic_indicators()
        })
        .await
    }

    pub async fn macro_series(
        &self,
        kind: MacroKind,
        years: u32,
    ) -> Result<WidgetData<MacroSeries>, FetchError> {
        let key = format!("macro-{}-{}", kind, years);
        self.through(&self.caches.macros, &key, move || {
            self.fred.macro_series(kind, years, self.clock.now_ms())
        })
        .await
    }

    pub async fn eth_tx_volume(&self, days: u32) -> Result<WidgetData<Vec<DailyVolume>>, FetchError> {
        let key = format!("ethtx-{}", days);
        self.through(&self.caches.eth_volume, &key, move || {
            self.etherscan.daily_tx(days, self.clock.now_ms())
        })
        .await
    }

    pub async fn news_posts(&self) -> Result<WidgetData<Vec<NewsItem>>, FetchError> {
        let key = format!("news-{}", DASHBOARD.social.news_account);
        self.through(&self.caches.news, &key, move || self.twitter.news_posts())
            .await
    }

    pub async fn channel_posts(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<WidgetData<Vec<ChannelPost>>, FetchError> {
        let key = format!("posts-{}-{}", channel, limit);
        self.through(&self.caches.posts, &key, move || {
            self.channels.recent_posts(channel, limit)
        })
        .await
    }

    pub async fn channel_info(&self, channel: &str) -> Result<WidgetData<ChannelInfo>, FetchError> {
        let key = format!("info-{}-0", channel);
        self.through(&self.caches.channel_info, &key, move || {
            self.channels.channel_info(channel)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (TtlCache<u32>, RequestThrottle, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        (
            TtlCache::new(Duration::from_secs(300), 8, shared.clone()),
            RequestThrottle::new(Duration::from_secs(10), shared),
            clock,
        )
    }

    #[tokio::test]
    async fn fresh_then_cached() {
        let (cache, throttle, clock) = setup();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        };

        let first = fetch_through(&cache, &throttle, &clock, "k", Duration::from_secs(8), fetch)
            .await
            .unwrap();
        assert_eq!(first.freshness, Freshness::Fresh);

        let second = fetch_through(&cache, &throttle, &clock, "k", Duration::from_secs(8), fetch)
            .await
            .unwrap();
        assert_eq!(second.freshness, Freshness::Cached);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_falls_back_to_stale_entry() {
        let (cache, throttle, clock) = setup();
        cache.put("k", 3);
        clock.advance(Duration::from_secs(301));

        let got = fetch_through(&cache, &throttle, &clock, "k", Duration::from_secs(8), || async {
            Err::<u32, _>(anyhow!("boom"))
        })
        .await
        .unwrap();
        assert_eq!(got.data, 3);
        assert_eq!(got.freshness, Freshness::Stale { age_ms: 301_000 });
    }

    #[tokio::test]
    async fn failure_without_entry_is_an_error() {
        let (cache, throttle, clock) = setup();
        let err = fetch_through(&cache, &throttle, &clock, "k", Duration::from_secs(8), || async {
            Err::<u32, _>(FetchError::RateLimited.into())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::RateLimited));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn throttled_without_entry_reports_throttled() {
        let (cache, throttle, clock) = setup();
        assert!(!throttle.should_skip("k"));
        let err = fetch_through(&cache, &throttle, &clock, "k", Duration::from_secs(8), || async {
            Ok(1)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::Throttled(ref k) if k == "k"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out() {
        let (cache, throttle, clock) = setup();
        let err = fetch_through(&cache, &throttle, &clock, "k", Duration::from_secs(8), || async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
        assert!(!cache.contains("k"));
    }

    #[tokio::test]
    async fn market_snapshot_refetches_every_refresh_period() {
        let clock = ManualClock::new(1_000_000);
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let caches = WidgetCaches::new(&shared);
        let throttle = RequestThrottle::new(CACHE.throttle.min_interval, shared);
        let counter = AtomicUsize::new(0);

        for _ in 0..3 {
            let calls = &counter;
            let got = fetch_through(
                &caches.markets,
                &throttle,
                &clock,
                "market-snapshot",
                CACHE.timeouts.widget_fetch,
                move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![MarketAsset {
                        name: "BTC".into(),
                        price: 100.0 + n as f64,
                        volume: 0.0,
                        funding: None,
                    }])
                },
            )
            .await
            .unwrap();
            assert_eq!(got.freshness, Freshness::Fresh);
            clock.advance(DASHBOARD.refresh.market_snapshot);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn hyperliquid_funding_by_name() {
        let assets = vec![
            MarketAsset {
                name: "ETH".into(),
                price: 3200.0,
                volume: 1.0,
                funding: Some(0.0001),
            },
            MarketAsset::missing("HYPE"),
        ];
        let rows = hyperliquid_funding(&assets, &["BTC", "ETH", "HYPE"], 5_000);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "ETH");
        assert_eq!(rows[0].rate, "87.60");
        assert_eq!(rows[0].next_funding_time, 5_000 + 3_600_000);
        assert_eq!(rows[0].exchange, Exchange::Hyperliquid);
    }

    #[test]
    fn one_exchange_failing_keeps_the_other() {
        let row = FundingRate {
            symbol: "BTC".into(),
            rate: "10.95".into(),
            next_funding_time: 0,
            exchange: Exchange::Binance,
        };
        let merged = merge_funding(Ok(vec![row.clone()]), Err(anyhow!("down"))).unwrap();
        assert_eq!(merged, vec![row]);
        assert!(merge_funding(Err(anyhow!("a")), Err(anyhow!("b"))).is_err());
    }
}
