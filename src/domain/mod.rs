// Domain types and value objects
mod candle;
mod market;
mod range;

// Re-export commonly used types to the world
pub use candle::{CandlePoint, CandleType, series_change_pct};
pub use market::{
    ChannelInfo, ChannelPost, DailyVolume, Exchange, FundingRate, Indicator, MacroKind,
    MacroSeries, MarketAsset, NewsItem, NewsMetrics, SeriesPoint, annualize_funding,
    normalize_coin,
};
pub use range::{ChartRange, HistoryWindow, history_cache_key};
