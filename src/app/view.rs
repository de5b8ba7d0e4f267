//! Terminal rendering for each command. Every function returns the text so it
//! can be checked without a terminal.

use tabled::{Table, Tabled, settings::Style};

use crate::data::FetchError;
use crate::domain::{
    CandlePoint, ChannelInfo, ChannelPost, Exchange, FundingRate, Indicator, MacroSeries,
    MarketAsset, NewsItem, SeriesPoint, series_change_pct,
};
use crate::engine::{ChartInputs, Freshness, LoadOutcome};
use crate::utils::format_utils::{
    format_apr, format_funding, format_funding_countdown, format_millions, format_price,
    format_time_ago, truncate_with_ellipsis,
};
use crate::utils::{epoch_ms_to_date_string, epoch_sec_to_date_string, format_duration};

const POST_PREVIEW_CHARS: usize = 120;
const SERIES_TAIL: usize = 12;

fn table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Footer line for data that did not come straight from upstream.
pub fn freshness_note(freshness: Freshness) -> Option<String> {
    match freshness {
        Freshness::Fresh => None,
        Freshness::Cached => Some("(cached)".to_string()),
        Freshness::Stale { age_ms } => Some(format!(
            "(stale: last update {} ago)",
            format_duration(age_ms)
        )),
    }
}

pub fn render_error(widget: &str, err: &FetchError) -> String {
    format!("{}: unavailable ({})", widget, err)
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

pub fn render_chart(inputs: &ChartInputs, candles: &[CandlePoint], outcome: &LoadOutcome) -> String {
    let mut out = format!("{} {}", inputs.symbol, inputs.range);

    match outcome {
        LoadOutcome::Rendered { from_cache, candles: n } => {
            out.push_str(&format!(
                " | {} bars{}",
                n,
                if *from_cache { " (cached)" } else { "" }
            ));
        }
        LoadOutcome::Retained { reason } => {
            out.push_str(&format!(" | history unavailable: {}", reason));
        }
        LoadOutcome::Discarded => out.push_str(" | load superseded"),
    }

    if let Some(last) = candles.last() {
        out.push_str(&format!("\nlast  {}", render_bar(last)));
        if let Some(change) = series_change_pct(candles) {
            out.push_str(&format!("\nrange change {:+.2}%", change));
        }
    }
    out
}

pub fn render_bar(bar: &CandlePoint) -> String {
    format!(
        "{}  O {}  H {}  L {}  C {}",
        epoch_sec_to_date_string(bar.time),
        format_price(bar.open),
        format_price(bar.high),
        format_price(bar.low),
        format_price(bar.close)
    )
}

// ---------------------------------------------------------------------------
// Dashboard widgets
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct MarketRow {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "24h Volume")]
    volume: String,
    #[tabled(rename = "Funding")]
    funding: String,
}

pub fn render_market(assets: &[MarketAsset]) -> String {
    table(
        assets
            .iter()
            .map(|a| MarketRow {
                asset: a.name.clone(),
                price: format_price(a.price),
                volume: if a.volume > 0.0 {
                    format_millions(a.volume / 1_000_000.0)
                } else {
                    "-".to_string()
                },
                funding: format_funding(a.funding),
            })
            .collect(),
    )
}

#[derive(Tabled)]
struct FundingRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Exchange")]
    exchange: String,
    #[tabled(rename = "APR")]
    apr: String,
    #[tabled(rename = "Next")]
    next: String,
}

pub fn render_funding(rates: &[FundingRate], now_ms: i64) -> String {
    let rows = rates
        .iter()
        .map(|r| FundingRow {
            symbol: r.symbol.clone(),
            exchange: r.exchange.to_string(),
            apr: format_apr(Some(&r.rate)),
            next: match r.exchange {
                Exchange::Hyperliquid => format_funding_countdown(now_ms),
                Exchange::Binance => format_duration((r.next_funding_time - now_ms).max(0)),
            },
        })
        .collect();
    table(rows)
}

#[derive(Tabled)]
struct IndicatorRow {
    #[tabled(rename = "Indicator")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "As of")]
    date: String,
}

pub fn render_indicators(indicators: &[Indicator]) -> String {
    if indicators.is_empty() {
        return "No indicators available".to_string();
    }
    table(
        indicators
            .iter()
            .map(|i| IndicatorRow {
                name: i.name.clone(),
                value: i.value.clone(),
                date: i.date.clone(),
            })
            .collect(),
    )
}

/// FRED reports M2 in billions and fund assets in millions.
fn series_value(unit: &str, value: f64) -> String {
    if unit.starts_with("Billions") {
        format_millions(value * 1000.0)
    } else if unit.starts_with("Millions") {
        format_millions(value)
    } else {
        format!("{:.0}", value)
    }
}

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn points_table(unit: &str, points: &[SeriesPoint]) -> String {
    let start = points.len().saturating_sub(SERIES_TAIL);
    table(
        points[start..]
            .iter()
            .map(|p| PointRow {
                date: p.date.clone(),
                value: series_value(unit, p.value),
            })
            .collect(),
    )
}

pub fn render_macro(series: &MacroSeries) -> String {
    let mut out = format!("{} ({})\n{}\n", series.title, series.unit, series.description);
    if series.data.is_empty() {
        out.push_str("No observations in range");
    } else {
        out.push_str(&points_table(&series.unit, &series.data));
    }
    out
}

pub fn render_eth_volume(points: &[SeriesPoint]) -> String {
    if points.is_empty() {
        return "No transaction data".to_string();
    }
    let mut out = String::from("Daily Ethereum transactions\n");
    out.push_str(&points_table("transactions", points));
    out
}

pub fn render_news(items: &[NewsItem], now_ms: i64) -> String {
    if items.is_empty() {
        return "No news posts".to_string();
    }
    items
        .iter()
        .map(|n| {
            format!(
                "[{}] {}\n    {} | {} likes, {} reposts\n    {}",
                format_time_ago(now_ms, n.timestamp),
                n.title,
                n.source,
                n.metrics.likes,
                n.metrics.retweets,
                n.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_posts(posts: &[ChannelPost], now_ms: i64) -> String {
    if posts.is_empty() {
        return "No messages".to_string();
    }
    posts
        .iter()
        .map(|p| {
            let when = if p.date > 0 {
                format_time_ago(now_ms, p.date * 1000)
            } else {
                "-".to_string()
            };
            format!(
                "[{}] {}: {}",
                when,
                if p.sender.is_empty() { "channel" } else { p.sender.as_str() },
                truncate_with_ellipsis(&p.text.replace('\n', " "), POST_PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_channel_info(info: &ChannelInfo) -> String {
    format!(
        "{} (@{})\n{} subscribers\n{}",
        info.title, info.username, info.participants_count, info.about
    )
}

/// Status line for the watch loop.
pub fn render_watch_header(now_ms: i64) -> String {
    format!(
        "== {} UTC | hyperliquid funding in {} ==",
        epoch_ms_to_date_string(now_ms),
        format_funding_countdown(now_ms)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChartRange;
    use crate::utils::TimeUtils;

    #[test]
    fn market_table_lists_assets_in_order() {
        let assets = vec![
            MarketAsset {
                name: "BTC".into(),
                price: 107_234.5,
                volume: 3_000_000_000.0,
                funding: Some(0.00001),
            },
            MarketAsset::missing("SPX"),
        ];
        let out = render_market(&assets);
        let btc = out.find("BTC").unwrap();
        let spx = out.find("SPX").unwrap();
        assert!(btc < spx);
        assert!(out.contains("$107,234.50"));
        assert!(out.contains("$3B"));
        assert!(out.contains("0.0010%"));
    }

    #[test]
    fn funding_countdowns() {
        let now = 10 * TimeUtils::MS_IN_H + 20 * TimeUtils::MS_IN_MIN;
        let rates = vec![
            FundingRate {
                symbol: "BTC".into(),
                rate: "10.95".into(),
                next_funding_time: now + 2 * TimeUtils::MS_IN_H,
                exchange: Exchange::Binance,
            },
            FundingRate {
                symbol: "ETH".into(),
                rate: "-3.10".into(),
                next_funding_time: now + TimeUtils::MS_IN_H,
                exchange: Exchange::Hyperliquid,
            },
        ];
        let out = render_funding(&rates, now);
        assert!(out.contains("+10.95%"));
        assert!(out.contains("-3.10%"));
        assert!(out.contains("2h"));
        assert!(out.contains("40m"));
    }

    #[test]
    fn chart_summary_reports_outcome() {
        let inputs = ChartInputs::new("ETH", ChartRange::OneDay);
        let candles = vec![
            CandlePoint::new(1_700_000_000, 100.0, 101.0, 99.0, 100.5),
            CandlePoint::new(1_700_000_900, 100.5, 111.0, 100.0, 110.0),
        ];
        let out = render_chart(
            &inputs,
            &candles,
            &LoadOutcome::Rendered {
                from_cache: true,
                candles: 2,
            },
        );
        assert!(out.starts_with("ETH 1D | 2 bars (cached)"));
        assert!(out.contains("+10.00%"));

        let retained = render_chart(
            &inputs,
            &[],
            &LoadOutcome::Retained {
                reason: FetchError::RateLimited,
            },
        );
        assert!(retained.contains("history unavailable"));
    }

    #[test]
    fn stale_note_shows_age() {
        assert_eq!(freshness_note(Freshness::Fresh), None);
        assert_eq!(
            freshness_note(Freshness::Stale { age_ms: 7 * 60_000 }).as_deref(),
            Some("(stale: last update 7m ago)")
        );
    }

    #[test]
    fn macro_values_scale_by_unit() {
        assert_eq!(series_value("Billions of Dollars", 21_700.0), "$21.70T");
        assert_eq!(series_value("Millions of Dollars", 950.0), "$950M");
        assert_eq!(series_value("transactions", 1_234_567.4), "1234567");
    }

    #[test]
    fn posts_fall_back_to_channel_sender() {
        let now = 2_000_000_000_000;
        let posts = vec![ChannelPost {
            id: 1,
            text: "line one\nline two".into(),
            date: now / 1000 - 120,
            sender: String::new(),
            views: 10,
        }];
        assert_eq!(render_posts(&posts, now), "[2m ago] channel: line one line two");
    }
}
