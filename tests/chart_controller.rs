//! Chart controller lifecycle against a fake candle source and stream.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{BARS_PER_FETCH, FakeConnector, FakeSource, base_price};
use market_pulse::data::{FetchError, StreamSessionManager};
use market_pulse::domain::{CandlePoint, ChartRange};
use market_pulse::engine::{
    CandleSeries, ChartContext, ChartController, ChartInputs, ChartSurface, ControllerState,
    LoadOutcome,
};
use market_pulse::utils::ManualClock;

const START_MS: i64 = 1_700_000_000_000;

struct Rig {
    source: Arc<FakeSource>,
    connector: Arc<FakeConnector>,
    sessions: Arc<StreamSessionManager>,
    clock: ManualClock,
    ctx: ChartContext,
}

impl Rig {
    fn new() -> Self {
        let source = FakeSource::new();
        let connector = FakeConnector::new();
        let sessions = StreamSessionManager::new(connector.clone());
        let clock = ManualClock::new(START_MS);
        let ctx = ChartContext::new(source.clone(), sessions.clone(), Arc::new(clock.clone()));
        Self {
            source,
            connector,
            sessions,
            clock,
            ctx,
        }
    }

    fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.ctx = self.ctx.with_fetch_timeout(timeout);
        self
    }

    async fn mount(
        &self,
        symbol: &str,
        range: ChartRange,
    ) -> (Arc<ChartController>, CandleSeries, LoadOutcome) {
        let series = CandleSeries::new();
        let (controller, outcome) = ChartController::mount(
            self.ctx.clone(),
            Arc::new(series.clone()),
            ChartInputs::new(symbol, range),
        )
        .await;
        (controller, series, outcome)
    }
}

#[tokio::test]
async fn second_mount_within_ttl_is_served_from_cache() {
    let rig = Rig::new();

    let (_first, first_series, outcome) = rig.mount("BTC", ChartRange::SevenDays).await;
    assert!(matches!(
        outcome,
        LoadOutcome::Rendered { from_cache: false, candles: BARS_PER_FETCH }
    ));

    rig.clock.advance(Duration::from_secs(60));
    let (second, second_series, outcome) = rig.mount("BTC", ChartRange::SevenDays).await;
    assert!(matches!(outcome, LoadOutcome::Rendered { from_cache: true, .. }));

    assert_eq!(rig.source.calls(), 1);
    assert_eq!(second_series.snapshot(), first_series.snapshot());
    assert_eq!(second_series.fit_count(), 1);
    assert_eq!(second.state(), ControllerState::Ready);

    // Both charts ride the one BTC session.
    assert_eq!(rig.connector.open_count(), 1);
    assert_eq!(rig.sessions.claimant_count(), 2);
}

#[tokio::test]
async fn expired_history_is_refetched() {
    let rig = Rig::new();
    let (controller, _series, _) = rig.mount("BTC", ChartRange::OneMonth).await;

    rig.clock.advance(Duration::from_secs(5 * 60 + 1));
    let outcome = controller.load_history().await;

    assert!(matches!(outcome, LoadOutcome::Rendered { from_cache: false, .. }));
    assert_eq!(rig.source.calls(), 2);
    assert_eq!(controller.state(), ControllerState::Ready);
}

#[tokio::test]
async fn retry_inside_throttle_window_is_skipped() {
    let rig = Rig::new();
    rig.source.set_failing(true);

    let (controller, series, outcome) = rig.mount("BTC", ChartRange::SevenDays).await;
    assert!(matches!(
        outcome,
        LoadOutcome::Retained { reason: FetchError::Transport(_) }
    ));
    assert_eq!(controller.state(), ControllerState::Stale);
    assert!(series.is_empty());

    rig.source.set_failing(false);
    match controller.load_history().await {
        LoadOutcome::Retained {
            reason: FetchError::Throttled(key),
        } => assert_eq!(key, "BTC-7D"),
        other => panic!("expected a throttled load, got {:?}", other),
    }
    assert_eq!(rig.source.calls(), 1);

    rig.clock.advance(Duration::from_secs(10));
    assert!(controller.load_history().await.is_rendered());
    assert_eq!(rig.source.calls(), 2);
    assert_eq!(series.len(), BARS_PER_FETCH);
}

#[tokio::test(start_paused = true)]
async fn timed_out_refresh_keeps_previous_bars() {
    let rig = Rig::new().with_fetch_timeout(Duration::from_secs(1));
    let (controller, series, outcome) = rig.mount("BTC", ChartRange::OneDay).await;
    assert!(outcome.is_rendered());
    let before = series.snapshot();

    rig.source.set_delay("BTC", Duration::from_secs(5));
    rig.clock.advance(Duration::from_secs(5 * 60 + 1));
    let outcome = controller.load_history().await;

    assert!(matches!(
        outcome,
        LoadOutcome::Retained { reason: FetchError::Timeout(_) }
    ));
    assert_eq!(series.snapshot(), before);
    assert_eq!(controller.state(), ControllerState::Stale);
}

#[tokio::test(start_paused = true)]
async fn timed_out_first_load_caches_nothing() {
    let rig = Rig::new().with_fetch_timeout(Duration::from_secs(1));
    rig.source.set_delay("ETH", Duration::from_secs(30));

    let (controller, series, outcome) = rig.mount("ETH", ChartRange::SevenDays).await;

    assert!(matches!(
        outcome,
        LoadOutcome::Retained { reason: FetchError::Timeout(_) }
    ));
    assert!(series.is_empty());
    assert!(!rig.ctx.history.contains("ETH-7D"));
    assert_eq!(controller.state(), ControllerState::Stale);
    // History failing does not stop live updates.
    assert_eq!(rig.sessions.active_symbol().as_deref(), Some("ETH"));
}

#[tokio::test(start_paused = true)]
async fn superseded_load_is_discarded() {
    let rig = Rig::new();
    let (controller, series, _) = rig.mount("BTC", ChartRange::SevenDays).await;
    rig.source.set_delay("SOL", Duration::from_secs(2));

    let slow = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.set_inputs("SOL", ChartRange::SevenDays).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let fast = controller.set_inputs("ETH", ChartRange::SevenDays).await;
    assert!(fast.is_rendered());

    let late = slow.await.unwrap();
    assert!(matches!(late, LoadOutcome::Discarded));

    assert_eq!(series.last_candle().map(|c| c.close), Some(base_price("ETH")));
    assert!(!rig.ctx.history.contains("SOL-7D"));
    assert_eq!(controller.inputs(), ChartInputs::new("ETH", ChartRange::SevenDays));
    assert_eq!(controller.state(), ControllerState::Ready);
    assert_eq!(rig.sessions.active_symbol().as_deref(), Some("ETH"));
    assert_eq!(rig.connector.live_connections(), 1);
}

#[tokio::test]
async fn symbol_change_moves_the_claim_and_range_change_keeps_it() {
    let rig = Rig::new();
    let (controller, _series, _) = rig.mount("BTC", ChartRange::SevenDays).await;

    controller.set_inputs("ETH", ChartRange::SevenDays).await;
    assert_eq!(rig.connector.opened_symbols(), vec!["BTC", "ETH"]);
    assert_eq!(rig.connector.closed(), vec![1]);
    let claim = controller.claim().unwrap();
    assert_eq!(claim.symbol(), "ETH");

    controller.set_inputs("ETH", ChartRange::OneMonth).await;
    assert_eq!(rig.connector.open_count(), 2);
    assert_eq!(controller.claim(), Some(claim));
    assert!(controller.generation() >= 2);
}

#[tokio::test]
async fn ticks_extend_the_last_bar() {
    let rig = Rig::new();
    let (_controller, series, _) = rig.mount("BTC", ChartRange::OneDay).await;
    let last = series.last_candle().unwrap();
    assert_eq!(last.high, 101.0);
    assert_eq!(last.low, 99.0);

    rig.connector.push_tick(0, "BTC", 110.0);
    rig.connector.push_tick(0, "BTC", 90.0);
    rig.connector.push_tick(0, "ETH", 5.0);

    assert_eq!(
        series.last_candle(),
        Some(CandlePoint::new(last.time, 100.0, 110.0, 90.0, 90.0))
    );
    assert_eq!(series.len(), BARS_PER_FETCH);
}

#[tokio::test]
async fn dropped_stream_is_reopened_on_next_input_change() {
    let rig = Rig::new();
    let (controller, _series, _) = rig.mount("BTC", ChartRange::SevenDays).await;

    rig.connector.events(0).closed();
    let stale_claim = controller.claim().unwrap();
    assert!(!rig.sessions.is_claim_live(&stale_claim));

    controller.set_inputs("BTC", ChartRange::OneDay).await;
    assert_eq!(rig.connector.open_count(), 2);
    let claim = controller.claim().unwrap();
    assert!(rig.sessions.is_claim_live(&claim));
}

#[tokio::test]
async fn dispose_detaches_surface_and_releases_stream() {
    let rig = Rig::new();
    let (controller, series, _) = rig.mount("BTC", ChartRange::SevenDays).await;

    controller.dispose();

    assert!(series.is_removed());
    assert_eq!(controller.state(), ControllerState::Disposed);
    assert_eq!(rig.sessions.active_symbol(), None);
    assert_eq!(rig.connector.closed(), vec![1]);

    assert!(matches!(controller.load_history().await, LoadOutcome::Discarded));
    assert!(matches!(
        controller.set_inputs("ETH", ChartRange::SevenDays).await,
        LoadOutcome::Discarded
    ));
    assert_eq!(rig.connector.open_count(), 1);

    // Idempotent.
    controller.dispose();
    assert_eq!(rig.connector.closed(), vec![1]);
}

#[tokio::test]
async fn dropping_one_chart_keeps_the_shared_session() {
    let rig = Rig::new();
    let (first, first_series, _) = rig.mount("BTC", ChartRange::SevenDays).await;
    let (_second, _, _) = rig.mount("BTC", ChartRange::OneDay).await;

    drop(first);

    assert!(first_series.is_removed());
    assert_eq!(rig.sessions.claimant_count(), 1);
    assert!(rig.connector.closed().is_empty());
}

#[tokio::test]
async fn lowercase_symbol_subscribes_to_exchange_coin() {
    let rig = Rig::new();
    let (controller, series, outcome) = rig.mount("btc", ChartRange::SevenDays).await;
    assert!(outcome.is_rendered());

    assert_eq!(controller.inputs().symbol, "BTC");
    assert_eq!(rig.connector.opened_symbols(), vec!["BTC"]);
    assert!(rig.ctx.history.contains("BTC-7D"));

    rig.connector.push_tick(0, "BTC", 120.0);
    assert_eq!(series.last_candle().map(|c| c.close), Some(120.0));

    // Same coin in another spelling keeps the claim.
    controller.set_inputs("Btc", ChartRange::OneDay).await;
    assert_eq!(rig.connector.open_count(), 1);

    controller.set_inputs("kpepe", ChartRange::OneDay).await;
    assert_eq!(rig.connector.opened_symbols(), vec!["BTC", "kPEPE"]);
}
