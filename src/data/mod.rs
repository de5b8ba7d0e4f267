mod binance;
mod cache;
mod error;
mod etherscan;
mod fred;
mod http;
mod hyperliquid;
mod price_stream;
mod provider;
mod rate_limiter;
mod social;

pub use {
    binance::{BinanceCandleSource, BinanceFuturesClient, spot_symbol},
    cache::{CacheEntry, TtlCache},
    error::FetchError,
    etherscan::EtherscanClient,
    fred::FredClient,
    http::JsonClient,
    hyperliquid::{HyperliquidClient, select_assets},
    price_stream::{
        Claim, L2BookConnector, PriceTick, SessionEvents, StreamConnection, StreamConnector,
        StreamSessionManager, TickSink, parse_book_tick, subscribe_message,
    },
    provider::CandleSource,
    rate_limiter::RequestThrottle,
    social::{ChannelFeed, RelayChannelFeed, TwitterClient},
};
