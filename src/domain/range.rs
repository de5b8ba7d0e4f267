use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::utils::TimeUtils;

/// The chart's visible history span. Closed set: these five tokens only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
    EnumString,
)]
pub enum ChartRange {
    #[strum(to_string = "1D")]
    #[serde(rename = "1D")]
    OneDay,
    #[default]
    #[strum(to_string = "7D")]
    #[serde(rename = "7D")]
    SevenDays,
    #[strum(to_string = "1M")]
    #[serde(rename = "1M")]
    OneMonth,
    #[strum(to_string = "3M")]
    #[serde(rename = "3M")]
    ThreeMonths,
    #[strum(to_string = "1Y")]
    #[serde(rename = "1Y")]
    OneYear,
}

/// What to ask the candle source for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub interval_ms: i64,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl HistoryWindow {
    pub fn interval_code(&self) -> &'static str {
        TimeUtils::interval_to_string(self.interval_ms)
    }
}

impl ChartRange {
    /// Bucket width for this range.
    pub fn interval_ms(self) -> i64 {
        match self {
            Self::OneDay => TimeUtils::MS_IN_15_MIN,
            Self::SevenDays => TimeUtils::MS_IN_H,
            Self::OneMonth | Self::ThreeMonths | Self::OneYear => TimeUtils::MS_IN_4_H,
        }
    }

    pub fn lookback_days(self) -> i64 {
        match self {
            Self::OneDay => 1,
            Self::SevenDays => 7,
            Self::OneMonth => 30,
            Self::ThreeMonths => 90,
            Self::OneYear => 365,
        }
    }

    /// Request window ending at `now_ms`.
    pub fn window_ending_at(self, now_ms: i64) -> HistoryWindow {
        HistoryWindow {
            interval_ms: self.interval_ms(),
            start_ms: now_ms - self.lookback_days() * TimeUtils::MS_IN_D,
            end_ms: now_ms,
        }
    }
}

/// Cache key for a chart's history: `"<symbol>-<range>"`.
pub fn history_cache_key(symbol: &str, range: ChartRange) -> String {
    format!("{}-{}", symbol, range)
}
