//! Client failures and their classification.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Coarse failure class that drives the fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials missing or rejected. Retrying will not help.
    Auth,
    /// Rate or usage limit hit.
    Quota,
    /// Network error, timeout, or a server-side failure.
    Transport,
    /// The call went through but produced nothing usable.
    Malformed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Quota => "quota",
            Self::Transport => "transport",
            Self::Malformed => "malformed",
        }
    }
}

impl ClientError {
    /// Classify a non-success HTTP response.
    ///
    /// Providers report auth and quota failures with inconsistent status
    /// codes, so the body text is checked as well.
    pub fn from_status(status: u16, body: String) -> Self {
        let lower = body.to_ascii_lowercase();
        if status == 401
            || status == 403
            || lower.contains("api key not valid")
            || body.contains("API_KEY_INVALID")
        {
            Self::Auth(body)
        } else if status == 429 || body.contains("RESOURCE_EXHAUSTED") || lower.contains("quota") {
            Self::QuotaExceeded(body)
        } else {
            Self::Server { status, body }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::QuotaExceeded(_) => ErrorKind::Quota,
            Self::Http(_) | Self::Transport(_) | Self::Server { .. } => ErrorKind::Transport,
            Self::EmptyResponse | Self::Json(_) | Self::Malformed(_) => ErrorKind::Malformed,
        }
    }

    /// Whether a single retry is worth attempting.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}
