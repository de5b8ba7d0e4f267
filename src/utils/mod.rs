pub mod format_utils;
pub mod time_utils;

pub use time_utils::{
    Clock, ManualClock, SystemClock, TimeUtils, epoch_ms_to_date_string,
    epoch_sec_to_date_string, format_duration, ms_until_next_hour, now_timestamp_ms,
};
