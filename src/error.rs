use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MetaAiError>;

/// Hard failures surfaced to callers.
///
/// Soft conditions (a scrape marker that is not found, a streamed line that
/// does not decode, a body without a terminal record) never become values of
/// this type; they are absorbed where they occur and only steer control flow.
#[derive(Debug, Error)]
pub enum MetaAiError {
    #[error("handshake failed (HTTP {status}): {reason}")]
    Handshake { status: u16, reason: String },

    #[error(
        "no complete response after {attempts} attempts (last status: {})",
        display_status(*last_status)
    )]
    ServiceUnavailable {
        attempts: u32,
        last_status: Option<u16>,
    },

    /// `attempt` is one-based and `status` is the prompt response's HTTP
    /// status; both are `None` until the client attaches them.
    #[error(
        "terminal record is missing `{path}`{}",
        display_attempt(*attempt, *status)
    )]
    MalformedTerminalRecord {
        path: &'static str,
        attempt: Option<u32>,
        status: Option<u16>,
    },

    #[error(
        "failed to decode sources response (HTTP {status}){}: {source}",
        display_attempt(*attempt, None)
    )]
    SourcesDecode {
        status: u16,
        attempt: Option<u32>,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize request variables: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("invalid header `{name}`")]
    InvalidHeader { name: String },

    #[error("failed to initialize transport runtime: {0}")]
    Runtime(String),
}

impl MetaAiError {
    #[must_use]
    pub fn handshake(status: u16, reason: impl Into<String>) -> Self {
        Self::Handshake {
            status,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn malformed_terminal_record(path: &'static str) -> Self {
        Self::MalformedTerminalRecord {
            path,
            attempt: None,
            status: None,
        }
    }

    /// Attaches the prompt attempt and response status to errors raised
    /// while completing an answer. Other variants are returned unchanged.
    #[must_use]
    pub fn at_attempt(self, attempt_number: u32, response_status: u16) -> Self {
        match self {
            Self::MalformedTerminalRecord { path, .. } => Self::MalformedTerminalRecord {
                path,
                attempt: Some(attempt_number),
                status: Some(response_status),
            },
            Self::SourcesDecode { status, source, .. } => Self::SourcesDecode {
                status,
                attempt: Some(attempt_number),
                source,
            },
            other => other,
        }
    }

    /// Returns true for the terminal "retries exhausted" failure.
    #[must_use]
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. })
    }
}

fn display_attempt(attempt: Option<u32>, status: Option<u16>) -> String {
    match (attempt, status) {
        (Some(attempt), Some(status)) => format!(" (attempt {attempt}, HTTP {status})"),
        (Some(attempt), None) => format!(" (attempt {attempt})"),
        (None, _) => String::new(),
    }
}

fn display_status(status: Option<u16>) -> String {
    status
        .map(|status| status.to_string())
        .unwrap_or_else(|| "n/a".to_owned())
}
