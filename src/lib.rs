#![allow(clippy::const_is_empty)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]

// Core modules
pub mod app;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod utils;

// Re-export commonly used types outside of crate (for the binaries and tests)
pub use app::App;
pub use data::{StreamSessionManager, TtlCache};
pub use domain::{CandlePoint, ChartRange};
pub use engine::{ChartController, DashboardService};

// CLI argument parsing
use clap::{Parser, Subcommand, ValueEnum};
use domain::MacroKind;

/// Where chart history comes from. Live ticks always come from the order-book stream.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistorySource {
    #[default]
    Hyperliquid,
    Binance,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Candle history provider for the chart
    #[arg(long, value_enum, global = true, default_value_t = HistorySource::Hyperliquid)]
    pub source: HistorySource,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load a price chart and optionally follow live ticks
    Chart {
        #[arg(long, default_value = "BTC")]
        symbol: String,
        /// One of 1D, 7D, 1M, 3M, 1Y
        #[arg(long, default_value = "7D", value_parser = parse_range)]
        range: ChartRange,
        /// Follow the live stream for this many seconds after loading
        #[arg(long, default_value_t = 0)]
        live: u64,
    },
    /// Market snapshot for the tracked assets
    Prices,
    /// Binance and Hyperliquid funding, annualized
    Funding,
    /// GDP, CPI and unemployment from FRED
    Indicators,
    /// M2 or money market fund series from FRED
    Macro {
        #[arg(long, default_value = "m2", value_parser = parse_macro_kind)]
        kind: MacroKind,
        #[arg(long, default_value_t = 5)]
        years: u32,
    },
    /// Daily Ethereum transaction count
    EthVolume {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Latest posts from the news account
    News,
    /// Messages from a relayed channel
    Channel {
        #[arg(long, default_value = config::DASHBOARD.social.default_channel)]
        channel: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Show channel details instead of messages
        #[arg(long, default_value_t = false)]
        info: bool,
    },
    /// Refresh prices and funding on their dashboard cadence until interrupted
    Watch,
}

fn parse_range(s: &str) -> Result<ChartRange, String> {
    s.parse::<ChartRange>()
        .map_err(|_| format!("unknown range '{}' (expected 1D, 7D, 1M, 3M or 1Y)", s))
}

fn parse_macro_kind(s: &str) -> Result<MacroKind, String> {
    s.parse::<MacroKind>()
        .map_err(|_| format!("unknown series '{}' (expected m2 or mmf)", s))
}

/// Main application entry point.
/// This is the public API for the binary to call.
pub async fn run_app(args: Cli) -> anyhow::Result<()> {
    let app = App::new(args.source)?;
    app.run(args.command).await
}
