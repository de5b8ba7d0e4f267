use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::DASHBOARD;
use crate::data::{FetchError, JsonClient};
use crate::domain::DailyVolume;
use crate::utils::{TimeUtils, epoch_ms_to_date_string, epoch_sec_to_date_string};

#[derive(Debug, Deserialize)]
struct DailyTxRecord {
    #[serde(rename = "unixTime")]
    unix_time: String,
    value: String,
}

/// Etherscan wraps results as `{status, message, result}`; on errors `result`
/// is a string instead of an array.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

pub fn parse_daily_tx(payload: serde_json::Value) -> Result<Vec<DailyVolume>> {
    let envelope: Envelope = serde_json::from_value(payload)
        .map_err(|e| FetchError::Malformed(format!("dailytx: {}", e)))?;

    let records: Vec<DailyTxRecord> = match envelope.result {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|r| serde_json::from_value(r).ok())
            .collect(),
        other => {
            return Err(FetchError::Malformed(format!(
                "dailytx: {} ({})",
                envelope.message, other
            ))
            .into());
        }
    };

    Ok(records
        .into_iter()
        .filter_map(|r| {
            let secs = r.unix_time.parse::<i64>().ok()?;
            let value = r.value.parse::<f64>().ok()?;
            Some(DailyVolume {
                date: epoch_sec_to_date_string(secs),
                value,
            })
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct EtherscanClient {
    http: JsonClient,
    api_key: Option<String>,
}

impl EtherscanClient {
    pub fn new(http: JsonClient, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    /// Daily Ethereum transaction counts for the last `days` days, ascending.
    pub async fn daily_tx(&self, days: u32, now_ms: i64) -> Result<Vec<DailyVolume>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredential("ETHERSCAN_API_KEY"))?;
        let start_ms = now_ms - i64::from(days) * TimeUtils::MS_IN_D;

        let params = [
            ("module", "stats".to_string()),
            ("action", "dailytx".to_string()),
            ("startdate", epoch_ms_to_date_string(start_ms)),
            ("enddate", epoch_ms_to_date_string(now_ms)),
            ("sort", "asc".to_string()),
            ("apikey", key.to_string()),
        ];
        let payload: serde_json::Value = self
            .http
            .get_json(DASHBOARD.etherscan_api_url, &params)
            .await
            .context("etherscan dailytx")?;
        parse_daily_tx(payload)
    }
}
