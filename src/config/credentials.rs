//! Upstream keys read from the environment. Missing keys disable the widget that needs them.

pub const FRED_API_KEY_VAR: &str = "FRED_API_KEY";
pub const ETHERSCAN_API_KEY_VAR: &str = "ETHERSCAN_API_KEY";
pub const TWITTER_BEARER_TOKEN_VAR: &str = "TWITTER_BEARER_TOKEN";
pub const MESSAGE_FEED_URL_VAR: &str = "MESSAGE_FEED_URL";

#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub fred: Option<String>,
    pub etherscan: Option<String>,
    pub twitter_bearer: Option<String>,
    pub message_feed_url: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self {
            fred: non_empty_var(FRED_API_KEY_VAR),
            etherscan: non_empty_var(ETHERSCAN_API_KEY_VAR),
            twitter_bearer: non_empty_var(TWITTER_BEARER_TOKEN_VAR),
            message_feed_url: non_empty_var(MESSAGE_FEED_URL_VAR),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
