//! Cache, throttle and timeout policy shared by the chart and the widgets.
use std::time::Duration;

pub struct CachePolicy {
    /// Market snapshot. Shorter than its refresh cadence so every poll reaches upstream.
    pub market_ttl: Duration,
    /// Chart history and funding.
    pub short_ttl: Duration,
    /// Feeds, channel messages and macro series.
    pub long_ttl: Duration,
    /// Entries kept per cache before least-recently-used eviction.
    pub capacity: usize,
}

pub struct ThrottlePolicy {
    /// Minimum gap between two request initiations for the same cache key.
    pub min_interval: Duration,
}

pub struct TimeoutPolicy {
    pub history_fetch: Duration,
    pub widget_fetch: Duration,
}

pub struct CacheConfig {
    pub cache: CachePolicy,
    pub throttle: ThrottlePolicy,
    pub timeouts: TimeoutPolicy,
}

pub const CACHE: CacheConfig = CacheConfig {
    cache: CachePolicy {
        market_ttl: Duration::from_secs(10),
        short_ttl: Duration::from_secs(5 * 60),
        long_ttl: Duration::from_secs(15 * 60),
        capacity: 64,
    },
    throttle: ThrottlePolicy {
        min_interval: Duration::from_secs(10),
    },
    timeouts: TimeoutPolicy {
        history_fetch: Duration::from_secs(8),
        widget_fetch: Duration::from_secs(8),
    },
};
