use std::{error::Error, fmt, time::Duration};

/// Why a fetch produced no fresh data. Every variant is recoverable:
/// callers keep whatever they rendered last.
#[derive(Debug)]
pub enum FetchError {
    /// The request did not finish inside its deadline.
    Timeout(Duration),
    /// Upstream answered with a non-2xx status.
    Http { status: u16, body: String },
    /// Upstream explicitly rate limited us (HTTP 429).
    RateLimited,
    /// Our own throttle refused to start another request for this key.
    Throttled(String),
    /// A required key/URL is not configured.
    MissingCredential(&'static str),
    /// The payload did not have the expected shape.
    Malformed(String),
    /// Network or client-side failure.
    Transport(anyhow::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchError::Timeout(d) => write!(f, "request timed out after {:.1}s", d.as_secs_f64()),
            FetchError::Http { status, body } => write!(f, "upstream HTTP {}: {}", status, body),
            FetchError::RateLimited => write!(f, "upstream rate limit exceeded"),
            FetchError::Throttled(key) => write!(f, "request for '{}' throttled", key),
            FetchError::MissingCredential(var) => write!(f, "{} is not set", var),
            FetchError::Malformed(msg) => write!(f, "malformed payload: {}", msg),
            FetchError::Transport(e) => write!(f, "transport error: {:#}", e),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FetchError::Transport(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for FetchError {
    /// Gateways raise typed `FetchError`s through `anyhow`; recover them here.
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<FetchError>() {
            Ok(typed) => typed,
            Err(other) => FetchError::Transport(other),
        }
    }
}

impl FetchError {
    /// Map a non-success status into the taxonomy.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        if status == 429 {
            FetchError::RateLimited
        } else {
            FetchError::Http {
                status,
                body: body.into(),
            }
        }
    }
}
