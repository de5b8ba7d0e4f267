//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Emit verbose logging for live stream connections and ticks.
    pub log_price_stream_updates: bool,

    /// Log every cache hit/miss/eviction.
    pub log_cache: bool,

    /// Log throttle decisions (skipped request initiations).
    pub log_throttle: bool,

    /// Chart controller state transitions.
    pub log_controller: bool,

    pub log_dashboard: bool,
}

pub const DF: LogFlags = LogFlags {
    log_controller: true,
    log_dashboard: true,

    log_price_stream_updates: false,
    log_cache: false,
    log_throttle: false,
};
