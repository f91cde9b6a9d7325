use thiserror::Error;

/// Failure of a single call to a text-generation provider.
///
/// Variants mirror the failure families a caller needs to tell apart when
/// deciding whether a retry can help: credentials, throttling, transport,
/// provider-side faults, and everything else.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed ({status}): {body}")]
    Authentication { status: u16, body: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response from provider")]
    EmptyResponse,
}

impl AiError {
    /// Map a non-success HTTP status and its body to a typed error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => AiError::Authentication { status, body },
            408 => AiError::Timeout(body),
            429 => AiError::RateLimited(body),
            500..=599 => AiError::Server { status, body },
            _ => AiError::Api { status, body },
        }
    }
}

impl From<reqwest::Error> for AiError {
    /// Any transport failure before a full response arrived (refused, reset,
    /// closed mid-request or mid-body) is a connection error.
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AiError::Timeout(e.to_string())
        } else if e.is_decode() {
            AiError::Parse(e.to_string())
        } else if e.is_connect() || e.is_request() || e.is_body() {
            AiError::Connection(e.to_string())
        } else {
            AiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::Parse(e.to_string())
    }
}
