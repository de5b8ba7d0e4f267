//! FRED observations: headline indicators and long macro series.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::DASHBOARD;
use crate::data::{FetchError, JsonClient};
use crate::domain::{Indicator, MacroKind, MacroSeries, SeriesPoint};
use crate::utils::{TimeUtils, epoch_ms_to_date_string};

#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    pub date: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

/// Latest GDP print, billions to trillions.
pub fn gdp_indicator(latest: &Observation) -> Option<Indicator> {
    let billions: f64 = latest.value.parse().ok()?;
    Some(Indicator {
        name: "GDP (Quarterly)".to_string(),
        value: format!("{:.2}T", billions / 1000.0),
        date: latest.date.clone(),
    })
}

/// Year-over-year CPI change from newest-first monthly observations.
/// Needs at least 13 of them (this month and the same month last year).
pub fn cpi_yoy_indicator(newest_first: &[Observation]) -> Option<Indicator> {
    if newest_first.len() < 13 {
        return None;
    }
    let current: f64 = newest_first[0].value.parse().ok()?;
    let year_ago: f64 = newest_first[12].value.parse().ok()?;
    if year_ago == 0.0 {
        return None;
    }
    Some(Indicator {
        name: "CPI Inflation Rate".to_string(),
        value: format!("{:.1}%", (current - year_ago) / year_ago * 100.0),
        date: newest_first[0].date.clone(),
    })
}

pub fn unemployment_indicator(latest: &Observation) -> Option<Indicator> {
    if latest.value.parse::<f64>().is_err() {
        return None;
    }
    Some(Indicator {
        name: "Unemployment Rate".to_string(),
        value: format!("{}%", latest.value),
        date: latest.date.clone(),
    })
}

/// Drop FRED's `"."` placeholders and anything else that is not a number.
pub fn clean_series(observations: Vec<Observation>) -> Vec<SeriesPoint> {
    observations
        .into_iter()
        .filter(|o| o.value != ".")
        .filter_map(|o| {
            let value = o.value.parse::<f64>().ok()?;
            value.is_finite().then_some(SeriesPoint {
                date: o.date,
                value,
            })
        })
        .collect()
}

struct SeriesMeta {
    id: &'static str,
    title: &'static str,
    unit: &'static str,
    description: &'static str,
}

fn series_meta(kind: MacroKind) -> SeriesMeta {
    match kind {
        MacroKind::M2 => SeriesMeta {
            id: DASHBOARD.fred.m2,
            title: "M2 Money Supply",
            unit: "Billions of Dollars",
            description: "M2 money supply includes cash, checking deposits, and easily-convertible near money",
        },
        MacroKind::MoneyMarket => SeriesMeta {
            id: DASHBOARD.fred.money_market_funds,
            title: "Money Market Funds",
            unit: "Millions of Dollars",
            description: "Money Market Funds; Total Financial Assets, Level",
        },
    }
}

#[derive(Debug, Clone)]
pub struct FredClient {
    http: JsonClient,
    api_key: Option<String>,
}

impl FredClient {
    pub fn new(http: JsonClient, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| FetchError::MissingCredential("FRED_API_KEY").into())
    }

    async fn observations(&self, query: &[(&str, String)]) -> Result<Vec<Observation>> {
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", self.key()?.to_string()),
            ("file_type", "json".to_string()),
        ];
        params.extend_from_slice(query);

        let response: ObservationsResponse = self
            .http
            .get_json(DASHBOARD.fred_api_url, &params)
            .await?;
        Ok(response.observations)
    }

    async fn latest(&self, series_id: &str, limit: u32) -> Result<Vec<Observation>> {
        self.observations(&[
            ("series_id", series_id.to_string()),
            ("limit", limit.to_string()),
            ("sort_order", "desc".to_string()),
        ])
        .await
        .with_context(|| format!("FRED {}", series_id))
    }

    /// GDP, CPI YoY and unemployment. An indicator whose fetch fails is left
    /// out; a missing key fails the whole call.
    pub async fn economic_indicators(&self) -> Result<Vec<Indicator>> {
        self.key()?;
        let (gdp, cpi, unrate) = tokio::join!(
            self.latest(DASHBOARD.fred.gdp, 1),
            self.latest(DASHBOARD.fred.cpi, 13),
            self.latest(DASHBOARD.fred.unemployment, 1),
        );

        let mut indicators = Vec::with_capacity(3);
        match gdp {
            Ok(obs) => indicators.extend(obs.first().and_then(gdp_indicator)),
            Err(e) => log::warn!("GDP indicator unavailable: {:#}", e),
        }
        match cpi {
            Ok(obs) => indicators.extend(cpi_yoy_indicator(&obs)),
            Err(e) => log::warn!("CPI indicator unavailable: {:#}", e),
        }
        match unrate {
            Ok(obs) => indicators.extend(obs.first().and_then(unemployment_indicator)),
            Err(e) => log::warn!("Unemployment indicator unavailable: {:#}", e),
        }
        Ok(indicators)
    }

    /// Ascending observations from `years` ago until `now_ms`.
    pub async fn macro_series(&self, kind: MacroKind, years: u32, now_ms: i64) -> Result<MacroSeries> {
        let meta = series_meta(kind);
        let start_ms = now_ms - i64::from(years) * 365 * TimeUtils::MS_IN_D;
        let observations = self
            .observations(&[
                ("series_id", meta.id.to_string()),
                ("observation_start", epoch_ms_to_date_string(start_ms)),
                ("observation_end", epoch_ms_to_date_string(now_ms)),
                ("sort_order", "asc".to_string()),
            ])
            .await
            .with_context(|| format!("FRED {}", meta.id))?;

        Ok(MacroSeries {
            title: meta.title.to_string(),
            unit: meta.unit.to_string(),
            description: meta.description.to_string(),
            data: clean_series(observations),
        })
    }
}
