use std::time::Duration;

pub struct FredSeries {
    pub gdp: &'static str,
    pub cpi: &'static str,
    pub unemployment: &'static str,
    pub m2: &'static str,
    pub money_market_funds: &'static str,
}

pub struct SocialConfig {
    pub twitter_api_url: &'static str,
    pub news_account: &'static str,
    pub max_results: u32,
    pub title_max_chars: usize,
    pub default_channel: &'static str,
}

pub struct RefreshConfig {
    pub market_snapshot: Duration,
    pub funding_rates: Duration,
}

pub struct DashboardConfig {
    /// Assets listed in the market snapshot, in display order.
    pub market_symbols: &'static [&'static str],
    /// Coins shown in the funding table.
    pub funding_coins: &'static [&'static str],
    pub fred_api_url: &'static str,
    pub fred: FredSeries,
    pub etherscan_api_url: &'static str,
    pub social: SocialConfig,
    pub refresh: RefreshConfig,
}

pub const DASHBOARD: DashboardConfig = DashboardConfig {
    market_symbols: &[
        "BTC", "ETH", "HYPE", "SOL", "FARTCOIN", "XRP", "SUI", "kPEPE", "SPX", "AAVE",
    ],
    funding_coins: &["BTC", "ETH", "HYPE"],
    fred_api_url: "https://api.stlouisfed.org/fred/series/observations",
    fred: FredSeries {
        gdp: "GDP",
        cpi: "CPIAUCSL",
        unemployment: "UNRATE",
        m2: "M2SL",
        money_market_funds: "MMMFFAQ027S",
    },
    etherscan_api_url: "https://api.etherscan.io/api",
    social: SocialConfig {
        twitter_api_url: "https://api.twitter.com/2",
        news_account: "TreeNewsFeed",
        max_results: 10,
        title_max_chars: 100,
        default_channel: "mlmonchain",
    },
    refresh: RefreshConfig {
        market_snapshot: Duration::from_secs(15),
        funding_rates: Duration::from_secs(5 * 60),
    },
};
