//! Client configuration.

use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use crate::retry::{DEFAULT_RETRY_DELAY, MAX_ATTEMPTS};
use crate::url::{
    endpoint_or_default, DEFAULT_GRAPHQL_URL, DEFAULT_HANDSHAKE_URL, DEFAULT_LANDING_URL,
};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Configuration for [`crate::MetaAi`] and its default transport.
#[derive(Debug, Clone)]
pub struct MetaAiConfig {
    /// Page scraped for anonymous tokens.
    pub landing_url: String,
    /// Endpoint receiving the terms-of-service handshake.
    pub handshake_url: String,
    /// Endpoint receiving prompts and source lookups.
    pub graphql_url: String,
    /// Browser `User-Agent` presented on every request.
    pub user_agent: String,
    /// Optional per-request timeout applied by the transport.
    pub timeout: Option<Duration>,
    /// Optional proxy URL applied by the transport. Not validated.
    pub proxy: Option<String>,
    /// Total prompt attempts, including the first one.
    pub max_attempts: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
    /// Whether to issue the secondary sources call.
    pub fetch_sources: bool,
    /// Additional headers merged into every request.
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for MetaAiConfig {
    fn default() -> Self {
        Self {
            landing_url: DEFAULT_LANDING_URL.to_owned(),
            handshake_url: DEFAULT_HANDSHAKE_URL.to_owned(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: None,
            proxy: None,
            max_attempts: MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            fetch_sources: true,
            extra_headers: BTreeMap::new(),
        }
    }
}

impl MetaAiConfig {
    /// Defaults overlaid with `META_AI_*` environment variables. Blank or
    /// unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("META_AI_LANDING_URL") {
            config.landing_url = endpoint_or_default(&url, DEFAULT_LANDING_URL);
        }
        if let Ok(url) = env::var("META_AI_HANDSHAKE_URL") {
            config.handshake_url = endpoint_or_default(&url, DEFAULT_HANDSHAKE_URL);
        }
        if let Ok(url) = env::var("META_AI_GRAPHQL_URL") {
            config.graphql_url = endpoint_or_default(&url, DEFAULT_GRAPHQL_URL);
        }
        if let Some(proxy) = env_string_opt("META_AI_PROXY") {
            config.proxy = Some(proxy);
        }
        if let Some(secs) = env_parse::<u64>("META_AI_TIMEOUT_SECS") {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(attempts) = env_parse::<u32>("META_AI_MAX_ATTEMPTS") {
            config.max_attempts = attempts.max(1);
        }
        if let Some(millis) = env_parse::<u64>("META_AI_RETRY_DELAY_MS") {
            config.retry_delay = Duration::from_millis(millis);
        }
        if let Some(user_agent) = env_string_opt("META_AI_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(value) = env_string_opt("META_AI_FETCH_SOURCES") {
            config.fetch_sources = !matches!(value.trim(), "0" | "false" | "FALSE" | "no" | "NO");
        }

        config
    }

    pub fn with_landing_url(mut self, url: impl Into<String>) -> Self {
        self.landing_url = url.into();
        self
    }

    pub fn with_handshake_url(mut self, url: impl Into<String>) -> Self {
        self.handshake_url = url.into();
        self
    }

    pub fn with_graphql_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Values below one are raised to one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_fetch_sources(mut self, fetch_sources: bool) -> Self {
        self.fetch_sources = fetch_sources;
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string_opt(key).and_then(|value| value.trim().parse().ok())
}
