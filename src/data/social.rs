//! Social feeds: the news account's timeline and the message-channel relay.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::DASHBOARD;
use crate::data::{FetchError, JsonClient};
use crate::domain::{ChannelInfo, ChannelPost, NewsItem, NewsMetrics};
use crate::utils::format_utils::truncate_with_ellipsis;

#[derive(Debug, Deserialize)]
struct UserLookup {
    data: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    #[serde(default)]
    data: Vec<Tweet>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    reply_count: u64,
}

fn tweet_to_news(tweet: Tweet, account: &str) -> NewsItem {
    let timestamp = tweet
        .created_at
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0);
    let metrics = tweet.public_metrics.unwrap_or_default();

    NewsItem {
        title: truncate_with_ellipsis(&tweet.text, DASHBOARD.social.title_max_chars),
        summary: tweet.text,
        timestamp,
        source: format!("@{}", account),
        url: format!("https://twitter.com/{}/status/{}", account, tweet.id),
        category: "News".to_string(),
        metrics: NewsMetrics {
            retweets: metrics.retweet_count,
            likes: metrics.like_count,
            replies: metrics.reply_count,
        },
        id: tweet.id,
    }
}

pub fn parse_timeline(payload: serde_json::Value, account: &str) -> Result<Vec<NewsItem>> {
    let timeline: Timeline = serde_json::from_value(payload)
        .map_err(|e| FetchError::Malformed(format!("timeline: {}", e)))?;
    Ok(timeline
        .data
        .into_iter()
        .map(|t| tweet_to_news(t, account))
        .collect())
}

/// Twitter v2: resolve the account id, then read its latest posts.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: JsonClient,
    bearer: Option<String>,
}

impl TwitterClient {
    pub fn new(http: JsonClient, bearer: Option<String>) -> Self {
        Self { http, bearer }
    }

    pub async fn news_posts(&self) -> Result<Vec<NewsItem>> {
        let token = self
            .bearer
            .as_deref()
            .ok_or(FetchError::MissingCredential("TWITTER_BEARER_TOKEN"))?;
        let base = DASHBOARD.social.twitter_api_url;
        let account = DASHBOARD.social.news_account;

        let lookup: UserLookup = self
            .http
            .get_json_bearer(
                &format!("{}/users/by/username/{}", base, account),
                &[] as &[(&str, &str)],
                token,
            )
            .await
            .context("twitter user lookup")?;
        let user_id = lookup
            .data
            .map(|d| d.id)
            .ok_or_else(|| FetchError::Malformed(format!("user {} not found", account)))?;

        let max_results = DASHBOARD.social.max_results.to_string();
        let payload: serde_json::Value = self
            .http
            .get_json_bearer(
                &format!("{}/users/{}/tweets", base, user_id),
                &[
                    ("max_results", max_results.as_str()),
                    ("tweet.fields", "created_at,public_metrics"),
                ],
                token,
            )
            .await
            .context("twitter timeline")?;
        parse_timeline(payload, account)
    }
}

/// Source of channel messages. The relay is the only production implementation.
#[async_trait]
pub trait ChannelFeed: Send + Sync {
    async fn channel_info(&self, channel: &str) -> Result<ChannelInfo>;
    async fn recent_posts(&self, channel: &str, limit: u32) -> Result<Vec<ChannelPost>>;
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: i64,
    #[serde(default, alias = "text")]
    message: Option<String>,
    #[serde(default)]
    date: serde_json::Value,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    views: Option<u64>,
}

/// Seconds since epoch from either a number or an RFC 3339 string.
fn post_date_secs(date: &serde_json::Value) -> i64 {
    match date {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
        serde_json::Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp())
            .unwrap_or(0),
        _ => 0,
    }
}

/// Relay answers either a bare array or `{messages: [...]}`.
pub fn parse_posts(payload: serde_json::Value) -> Result<Vec<ChannelPost>> {
    let items = match payload {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("messages") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return Err(FetchError::Malformed("posts: no messages array".into()).into()),
        },
        _ => return Err(FetchError::Malformed("posts: unexpected payload".into()).into()),
    };

    Ok(items
        .into_iter()
        .filter_map(|v| serde_json::from_value::<RawPost>(v).ok())
        .map(|p| ChannelPost {
            id: p.id,
            text: p.message.unwrap_or_default(),
            date: post_date_secs(&p.date),
            sender: p.sender.unwrap_or_else(|| "Channel".to_string()),
            views: p.views.unwrap_or(0),
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct RelayChannelFeed {
    http: JsonClient,
    base_url: Option<String>,
}

impl RelayChannelFeed {
    pub fn new(http: JsonClient, base_url: Option<String>) -> Self {
        Self { http, base_url }
    }

    fn url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .ok_or_else(|| FetchError::MissingCredential("MESSAGE_FEED_URL").into())
    }
}

#[async_trait]
impl ChannelFeed for RelayChannelFeed {
    async fn channel_info(&self, channel: &str) -> Result<ChannelInfo> {
        self.http
            .get_json(self.url()?, &[("action", "channel_info"), ("channel", channel)])
            .await
            .with_context(|| format!("channel_info {}", channel))
    }

    async fn recent_posts(&self, channel: &str, limit: u32) -> Result<Vec<ChannelPost>> {
        let limit = limit.to_string();
        let payload: serde_json::Value = self
            .http
            .get_json(
                self.url()?,
                &[
                    ("action", "messages"),
                    ("channel", channel),
                    ("limit", limit.as_str()),
                ],
            )
            .await
            .with_context(|| format!("messages {}", channel))?;
        parse_posts(payload)
    }
}
