use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::{
    Command, HistorySource,
    app::view,
    config::{ApiKeys, CACHE, DASHBOARD},
    data::{
        BinanceCandleSource, CandleSource, HyperliquidClient, JsonClient, L2BookConnector,
        StreamSessionManager,
    },
    domain::{ChartRange, MacroKind},
    engine::{
        CandleSeries, ChartContext, ChartController, ChartInputs, ChartSurface, DashboardService,
        WidgetData,
    },
    utils::{Clock, SystemClock},
};

#[cfg(debug_assertions)]
use crate::config::DF;

/// The terminal dashboard: one chart context and one widget service over a
/// shared HTTP client, throttle and clock.
pub struct App {
    clock: Arc<dyn Clock>,
    dashboard: DashboardService,
    charts: ChartContext,
}

impl App {
    pub fn new(source: HistorySource) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let http = JsonClient::new(CACHE.timeouts.history_fetch.max(CACHE.timeouts.widget_fetch))?;

        let candles: Arc<dyn CandleSource> = match source {
            HistorySource::Hyperliquid => Arc::new(HyperliquidClient::new(http.clone())),
            HistorySource::Binance => Arc::new(
                BinanceCandleSource::new().context("Failed to configure Binance client")?,
            ),
        };
        log::info!("Chart history from {}", candles.name());

        let sessions = StreamSessionManager::new(Arc::new(L2BookConnector::default()));
        let dashboard = DashboardService::new(http, ApiKeys::from_env(), clock.clone());
        let charts =
            ChartContext::new(candles, sessions, clock.clone()).with_throttle(dashboard.throttle());

        Ok(Self::from_parts(clock, dashboard, charts))
    }

    pub fn from_parts(clock: Arc<dyn Clock>, dashboard: DashboardService, charts: ChartContext) -> Self {
        Self {
            clock,
            dashboard,
            charts,
        }
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Chart {
                symbol,
                range,
                live,
            } => self.chart(&symbol, range, Duration::from_secs(live)).await,
            Command::Prices => {
                let w = self.dashboard.market_snapshot().await?;
                show(view::render_market(&w.data), &w);
                Ok(())
            }
            Command::Funding => {
                let w = self.dashboard.funding_rates().await?;
                show(view::render_funding(&w.data, self.clock.now_ms()), &w);
                Ok(())
            }
            Command::Indicators => {
                let w = self.dashboard.economic_indicators().await?;
                show(view::render_indicators(&w.data), &w);
                Ok(())
            }
            Command::Macro { kind, years } => self.macro_series(kind, years).await,
            Command::EthVolume { days } => {
                let w = self.dashboard.eth_tx_volume(days).await?;
                show(view::render_eth_volume(&w.data), &w);
                Ok(())
            }
            Command::News => {
                let w = self.dashboard.news_posts().await?;
                show(view::render_news(&w.data, self.clock.now_ms()), &w);
                Ok(())
            }
            Command::Channel {
                channel,
                limit,
                info,
            } => {
                if info {
                    let w = self.dashboard.channel_info(&channel).await?;
                    show(view::render_channel_info(&w.data), &w);
                } else {
                    let w = self.dashboard.channel_posts(&channel, limit).await?;
                    show(view::render_posts(&w.data, self.clock.now_ms()), &w);
                }
                Ok(())
            }
            Command::Watch => self.watch().await,
        }
    }

    async fn macro_series(&self, kind: MacroKind, years: u32) -> Result<()> {
        let w = self.dashboard.macro_series(kind, years).await?;
        show(view::render_macro(&w.data), &w);
        Ok(())
    }

    /// Mount a controller on an in-memory series, print it, then follow the
    /// stream for `live` before tearing down.
    async fn chart(&self, symbol: &str, range: ChartRange, live: Duration) -> Result<()> {
        let series = CandleSeries::new();
        let (controller, outcome) = ChartController::mount(
            self.charts.clone(),
            Arc::new(series.clone()),
            ChartInputs::new(symbol, range),
        )
        .await;
        println!(
            "{}",
            view::render_chart(&controller.inputs(), &series.snapshot(), &outcome)
        );

        if !live.is_zero() {
            follow_series(&series, live).await;
        }

        controller.dispose();
        Ok(())
    }

    /// Prices on the market cadence, funding on its own slower one, until Ctrl-C.
    async fn watch(&self) -> Result<()> {
        let mut market = tokio::time::interval(DASHBOARD.refresh.market_snapshot);
        let mut funding = tokio::time::interval(DASHBOARD.refresh.funding_rates);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = market.tick() => {
                    println!("{}", view::render_watch_header(self.clock.now_ms()));
                    match self.dashboard.market_snapshot().await {
                        Ok(w) => show(view::render_market(&w.data), &w),
                        Err(e) => println!("{}", view::render_error("Prices", &e)),
                    }
                }
                _ = funding.tick() => {
                    match self.dashboard.funding_rates().await {
                        Ok(w) => show(view::render_funding(&w.data, self.clock.now_ms()), &w),
                        Err(e) => println!("{}", view::render_error("Funding", &e)),
                    }
                }
                res = &mut shutdown => {
                    res.context("listen for Ctrl-C")?;
                    log::info!("Stopping watch");
                    return Ok(());
                }
            }
        }
    }
}

fn show<T>(body: String, widget: &WidgetData<T>) {
    println!("{}", body);
    if let Some(note) = view::freshness_note(widget.freshness) {
        println!("{}", note);
    }
}

/// Print the last bar whenever the stream changes it.
async fn follow_series(series: &CandleSeries, duration: Duration) {
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let mut poll = tokio::time::interval(Duration::from_millis(500));
    let mut seen = series.revision();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = poll.tick() => {
                let revision = series.revision();
                if revision == seen {
                    continue;
                }
                seen = revision;
                if let Some(last) = series.last_candle() {
                    #[cfg(debug_assertions)]
                    if DF.log_price_stream_updates {
                        log::info!("series revision {}", revision);
                    }
                    println!("{}", view::render_bar(&last));
                }
            }
        }
    }
}
