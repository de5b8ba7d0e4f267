//! Configuration module for the dashboard data pipeline.

// Can all be private now because we have a public re-export.
mod binance;
mod cache;
mod credentials;
mod dashboard;
mod debug;
mod hyperliquid;

// Re-export commonly used items
pub use binance::{BINANCE, BINANCE_QUOTE_ASSET, BinanceApiConfig};
pub use cache::CACHE;
pub use credentials::ApiKeys;
pub use dashboard::DASHBOARD;
pub use debug::DF;
pub use hyperliquid::HYPERLIQUID;
