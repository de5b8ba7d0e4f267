use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

use crate::data::FetchError;

const USER_AGENT: &str = concat!("market-pulse/", env!("CARGO_PKG_VERSION"));

/// Thin JSON wrapper over one shared `reqwest::Client`. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JsonClient {
    http: Client,
}

impl JsonClient {
    /// `timeout` is the transport-level ceiling; callers layer their own deadline on top.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("build reqwest client")?;
        Ok(Self { http })
    }

    pub async fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(self.http.get(url).query(query), url).await
    }

    pub async fn get_json_bearer<T, Q>(&self, url: &str, query: &Q, token: &str) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.execute(self.http.get(url).query(query).bearer_auth(token), url)
            .await
    }

    pub async fn post_json<T, B>(&self, url: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(self.http.post(url).json(body), url).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("reading body from {}", url))?;

        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), truncate_body(&body)).into());
        }

        serde_json::from_str(&body)
            .map_err(|e| FetchError::Malformed(format!("{}: {}", url, e)).into())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_are_clipped() {
        let long = "x".repeat(500);
        assert_eq!(truncate_body(&long).len(), 203);
        assert_eq!(truncate_body("bad symbol"), "bad symbol");
    }
}
