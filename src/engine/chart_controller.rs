//! Per-widget chart lifecycle: history load, cache, live stream claim, teardown.
//!
//! Every load is tagged with the generation of the inputs it was issued for.
//! `set_inputs` and `dispose` bump the generation, so a slow fetch that resolves
//! after the inputs moved on is dropped instead of overwriting newer data.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strum_macros::Display;

use crate::data::{Claim, FetchError};
use crate::domain::{CandlePoint, ChartRange, history_cache_key, normalize_coin};
use crate::engine::{ChartContext, ChartSurface, SurfaceTickSink};

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ControllerState {
    Initializing,
    Loading,
    /// Showing data from the latest successful load.
    Ready,
    /// The latest load failed; whatever was rendered before is kept.
    Stale,
    Updating,
    Disposed,
}

/// What a `load_history` call did to the surface.
#[derive(Debug)]
pub enum LoadOutcome {
    Rendered { from_cache: bool, candles: usize },
    /// Nothing changed on the surface.
    Retained { reason: FetchError },
    /// The inputs changed (or the controller was disposed) before the result arrived.
    Discarded,
}

impl LoadOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, LoadOutcome::Rendered { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartInputs {
    pub symbol: String,
    pub range: ChartRange,
}

impl ChartInputs {
    /// `symbol` is normalized to the exchange's coin name.
    pub fn new(symbol: &str, range: ChartRange) -> Self {
        Self {
            symbol: normalize_coin(symbol),
            range,
        }
    }
}

struct ControllerInner {
    state: ControllerState,
    inputs: ChartInputs,
    generation: u64,
    claim: Option<Claim>,
}

pub struct ChartController {
    ctx: ChartContext,
    surface: Arc<dyn ChartSurface>,
    inner: Mutex<ControllerInner>,
}

impl ChartController {
    /// Bind `surface` to `inputs`: load history, then claim the live stream.
    pub async fn mount(
        ctx: ChartContext,
        surface: Arc<dyn ChartSurface>,
        inputs: ChartInputs,
    ) -> (Arc<Self>, LoadOutcome) {
        let controller = Arc::new(Self {
            ctx,
            surface,
            inner: Mutex::new(ControllerInner {
                state: ControllerState::Initializing,
                inputs,
                generation: 0,
                claim: None,
            }),
        });

        let outcome = controller.load_history().await;
        controller.refresh_subscription(0);
        (controller, outcome)
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ControllerState {
        self.lock().state
    }

    pub fn inputs(&self) -> ChartInputs {
        self.lock().inputs.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn claim(&self) -> Option<Claim> {
        self.lock().claim.clone()
    }

    fn set_state(inner: &mut ControllerInner, next: ControllerState) {
        #[cfg(debug_assertions)]
        if DF.log_controller && inner.state != next {
            log::info!(
                "[chart {}-{}] {} -> {}",
                inner.inputs.symbol,
                inner.inputs.range,
                inner.state,
                next
            );
        }
        inner.state = next;
    }

    /// Load history for the current inputs.
    pub async fn load_history(&self) -> LoadOutcome {
        let (generation, inputs) = {
            let inner = self.lock();
            if inner.state == ControllerState::Disposed {
                return LoadOutcome::Discarded;
            }
            (inner.generation, inner.inputs.clone())
        };
        self.load_for(generation, &inputs.symbol, inputs.range).await
    }

    async fn load_for(&self, generation: u64, symbol: &str, range: ChartRange) -> LoadOutcome {
        let key = history_cache_key(symbol, range);

        if let Some(candles) = self.ctx.history.get(&key) {
            return self.render(generation, candles, true);
        }

        if self.ctx.throttle.should_skip(&key) {
            return self.retain(generation, FetchError::Throttled(key));
        }

        {
            let mut inner = self.lock();
            if inner.generation != generation || inner.state == ControllerState::Disposed {
                return LoadOutcome::Discarded;
            }
            Self::set_state(&mut inner, ControllerState::Loading);
        }

        let window = range.window_ending_at(self.ctx.clock.now_ms());
        let fetch = self.ctx.source.fetch_candles(symbol, window);
        let candles = match tokio::time::timeout(self.ctx.fetch_timeout, fetch).await {
            Err(_) => return self.retain(generation, FetchError::Timeout(self.ctx.fetch_timeout)),
            Ok(Err(e)) => return self.retain(generation, FetchError::from(e)),
            Ok(Ok(candles)) => candles,
        };

        if !self.is_current(generation) {
            return LoadOutcome::Discarded;
        }
        self.ctx.history.put(&key, candles.clone());
        self.render(generation, candles, false)
    }

    fn is_current(&self, generation: u64) -> bool {
        let inner = self.lock();
        inner.generation == generation && inner.state != ControllerState::Disposed
    }

    fn render(&self, generation: u64, candles: Vec<CandlePoint>, from_cache: bool) -> LoadOutcome {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state == ControllerState::Disposed {
            return LoadOutcome::Discarded;
        }
        let count = candles.len();
        self.surface.set_data(candles);
        self.surface.fit_content();
        Self::set_state(&mut inner, ControllerState::Ready);
        LoadOutcome::Rendered {
            from_cache,
            candles: count,
        }
    }

    fn retain(&self, generation: u64, reason: FetchError) -> LoadOutcome {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state == ControllerState::Disposed {
            return LoadOutcome::Discarded;
        }
        log::warn!(
            "Chart {}-{}: keeping previous data ({})",
            inner.inputs.symbol,
            inner.inputs.range,
            reason
        );
        Self::set_state(&mut inner, ControllerState::Stale);
        LoadOutcome::Retained { reason }
    }

    /// Switch to new inputs: reload, then move the stream claim if the symbol changed.
    pub async fn set_inputs(&self, symbol: &str, range: ChartRange) -> LoadOutcome {
        let inputs = ChartInputs::new(symbol, range);
        let generation = {
            let mut inner = self.lock();
            if inner.state == ControllerState::Disposed {
                return LoadOutcome::Discarded;
            }
            let symbol_changed = inner.inputs.symbol != inputs.symbol;
            inner.generation += 1;
            inner.inputs = inputs.clone();
            Self::set_state(&mut inner, ControllerState::Updating);

            if symbol_changed {
                if let Some(old) = inner.claim.take() {
                    self.ctx.sessions.release(&old);
                }
            }
            inner.generation
        };

        let outcome = self.load_for(generation, &inputs.symbol, range).await;
        self.refresh_subscription(generation);
        outcome
    }

    /// Claim the stream for the current symbol unless a live claim already covers it.
    fn refresh_subscription(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state == ControllerState::Disposed {
            return;
        }

        if let Some(claim) = inner.claim.take() {
            let covered = claim.symbol() == inner.inputs.symbol
                && self.ctx.sessions.is_claim_live(&claim);
            if covered {
                inner.claim = Some(claim);
                return;
            }
            self.ctx.sessions.release(&claim);
        }

        let sink = Arc::new(SurfaceTickSink::new(self.surface.clone()));
        match self.ctx.sessions.ensure_subscription(&inner.inputs.symbol, sink) {
            Ok(claim) => inner.claim = Some(claim),
            Err(e) => log::warn!(
                "Chart {}: live updates unavailable: {:#}",
                inner.inputs.symbol,
                e
            ),
        }
    }

    /// Release the stream claim and detach from the surface. Terminal.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.state == ControllerState::Disposed {
            return;
        }
        inner.generation += 1;
        Self::set_state(&mut inner, ControllerState::Disposed);
        if let Some(claim) = inner.claim.take() {
            self.ctx.sessions.release(&claim);
        }
        self.surface.remove();
    }
}

impl Drop for ChartController {
    fn drop(&mut self) {
        self.dispose();
    }
}
