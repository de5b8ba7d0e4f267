use std::sync::Arc;
use std::time::Duration;

use crate::config::CACHE;
use crate::data::{CandleSource, RequestThrottle, StreamSessionManager, TtlCache};
use crate::domain::CandlePoint;
use crate::utils::Clock;

/// Everything chart controllers share. Clone freely: all members are handles.
#[derive(Clone)]
pub struct ChartContext {
    pub history: TtlCache<Vec<CandlePoint>>,
    pub throttle: RequestThrottle,
    pub sessions: Arc<StreamSessionManager>,
    pub source: Arc<dyn CandleSource>,
    pub clock: Arc<dyn Clock>,
    pub fetch_timeout: Duration,
}

impl ChartContext {
    pub fn new(
        source: Arc<dyn CandleSource>,
        sessions: Arc<StreamSessionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            history: TtlCache::new(CACHE.cache.short_ttl, CACHE.cache.capacity, clock.clone()),
            throttle: RequestThrottle::new(CACHE.throttle.min_interval, clock.clone()),
            sessions,
            source,
            clock,
            fetch_timeout: CACHE.timeouts.history_fetch,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Use an existing throttle, e.g. the one the dashboard widgets go through.
    pub fn with_throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = throttle;
        self
    }
}
