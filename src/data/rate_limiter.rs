use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::utils::Clock;

#[cfg(debug_assertions)]
use crate::config::DF;

/// Per-key minimum spacing between request initiations.
///
/// Independent of cache freshness: a key whose cache entry just expired can
/// still be refused here if it was requested less than `min_interval` ago.
#[derive(Clone)]
pub struct RequestThrottle {
    inner: Arc<Mutex<InnerThrottle>>,
    clock: Arc<dyn Clock>,
}

struct InnerThrottle {
    min_interval_ms: i64,
    // cache key -> epoch ms of the last request we let through
    last_request: HashMap<String, i64>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InnerThrottle {
                min_interval_ms: min_interval.as_millis() as i64,
                last_request: HashMap::new(),
            })),
            clock,
        }
    }

    /// `true` if a request for `key` started within the minimum interval.
    /// A `false` answer is recorded as a request starting now, so of several
    /// concurrent callers exactly one gets through.
    pub fn should_skip(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(&last) = guard.last_request.get(key) {
            let elapsed = now - last;
            if elapsed < guard.min_interval_ms {
                #[cfg(debug_assertions)]
                if DF.log_throttle {
                    log::warn!(
                        "🛑 Throttled [{}]: last request {:.1}s ago (min {:.1}s)",
                        key,
                        elapsed as f64 / 1000.0,
                        guard.min_interval_ms as f64 / 1000.0
                    );
                }
                return true;
            }
        }

        guard.last_request.insert(key.to_string(), now);
        false
    }

    /// Epoch ms of the last admitted request for `key`.
    pub fn last_request_ms(&self, key: &str) -> Option<i64> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_request
            .get(key)
            .copied()
    }
}
