//! Display helpers shared by the CLI widgets.

use crate::utils::time_utils::{TimeUtils, ms_until_next_hour};

/// `$1,234.56`, `$0.0012` for sub-cent prices, `-` for a missing (zero) price.
pub fn format_price(price: f64) -> String {
    if price == 0.0 {
        return "-".to_string();
    }
    if price.abs() < 0.01 {
        return format!("${}", to_precision(price, 2));
    }
    format!("${}", group_thousands(&format!("{:.2}", price)))
}

/// Hourly funding as a percentage with 4 decimals.
pub fn format_funding(funding: Option<f64>) -> String {
    match funding {
        Some(f) => format!("{:.4}%", f * 100.0),
        None => "-".to_string(),
    }
}

/// Signed APR cell for the funding table.
pub fn format_apr(rate: Option<&str>) -> String {
    match rate.and_then(|r| r.parse::<f64>().ok().map(|v| (r, v))) {
        Some((raw, v)) if v >= 0.0 => format!("+{}%", raw),
        Some((raw, _)) => format!("{}%", raw),
        None => "-".to_string(),
    }
}

/// Countdown to the next full hour, e.g. `42m` (or `Now` on the hour).
pub fn format_funding_countdown(now_ms: i64) -> String {
    let diff = ms_until_next_hour(now_ms);
    if diff <= 0 {
        return "Now".to_string();
    }
    format!("{}m", (diff % TimeUtils::MS_IN_H) / TimeUtils::MS_IN_MIN)
}

pub fn format_time_ago(now_ms: i64, timestamp_ms: i64) -> String {
    let diff = now_ms - timestamp_ms;
    let hours = diff / TimeUtils::MS_IN_H;
    if hours > 0 {
        return format!("{}h ago", hours);
    }
    format!("{}m ago", diff / TimeUtils::MS_IN_MIN)
}

/// Values reported in millions of dollars.
pub fn format_millions(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("${:.2}T", value / 1_000_000.0)
    } else if value >= 1000.0 {
        format!("${:.0}B", value / 1000.0)
    } else {
        format!("${:.0}M", value)
    }
}

/// Cut `text` to `max_chars` characters, appending `...` when it was longer.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn to_precision(value: f64, significant: i32) -> String {
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (significant - 1 - magnitude).max(0) as usize;
    format!("{:.*}", decimals, value)
}

fn group_thousands(fixed: &str) -> String {
    let (sign, rest) = match fixed.strip_prefix('-') {
        Some(r) => ("-", r),
        None => ("", fixed),
    };
    let (int_part, frac_part) = rest.split_once('.').unwrap_or((rest, ""));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}
