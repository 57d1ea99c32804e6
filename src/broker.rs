//! Exchange of scraped anonymous tokens for a short-lived access credential.

use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use crate::config::MetaAiConfig;
use crate::error::{MetaAiError, Result};
use crate::headers::{handshake_headers, landing_headers};
use crate::payload::{handshake_form, ACCEPT_TERMS};
use crate::scrape::AnonymousTokens;
use crate::transport::Transport;

/// Key path from the handshake response root to the access token.
pub const CREDENTIAL_PATH: [&str; 4] = [
    "data",
    "xab_abra_accept_terms_of_service",
    "new_temp_user_auth",
    "access_token",
];

/// Opaque bearer token with service-controlled expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessCredential(String);

impl AccessCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessCredential(<redacted>)")
    }
}

/// Tokens and credential produced by one handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tokens: AnonymousTokens,
    pub access_token: AccessCredential,
}

/// Performs the landing-page scrape and terms-of-service handshake.
///
/// One call is one handshake; retrying is the caller's decision.
pub struct CredentialBroker<'a> {
    config: &'a MetaAiConfig,
    transport: &'a dyn Transport,
}

impl<'a> CredentialBroker<'a> {
    pub fn new(config: &'a MetaAiConfig, transport: &'a dyn Transport) -> Self {
        Self { config, transport }
    }

    pub fn acquire_credential(&self) -> Result<Credentials> {
        let tokens = self.scrape_tokens()?;

        let headers = handshake_headers(self.config, &ACCEPT_TERMS, &tokens);
        let body = handshake_form(&tokens.lsd)?;
        let response = self
            .transport
            .post_form(&self.config.handshake_url, &headers, &body)?;
        debug!(status = response.status, "handshake response received");

        let access_token = parse_credential(response.status, &response.body)?;
        info!("acquired anonymous access credential");

        Ok(Credentials {
            tokens,
            access_token,
        })
    }

    fn scrape_tokens(&self) -> Result<AnonymousTokens> {
        let response = self
            .transport
            .get(&self.config.landing_url, &landing_headers(self.config))?;
        debug!(
            status = response.status,
            bytes = response.body.len(),
            "landing page fetched"
        );
        Ok(AnonymousTokens::from_landing_page(&response.body))
    }
}

/// Walks [`CREDENTIAL_PATH`] in a handshake response body.
pub fn parse_credential(status: u16, body: &str) -> Result<AccessCredential> {
    let root: Value = serde_json::from_str(body).map_err(|error| {
        MetaAiError::handshake(status, format!("response is not a JSON document: {error}"))
    })?;

    let mut current = &root;
    for (depth, key) in CREDENTIAL_PATH.iter().enumerate() {
        current = current.get(key).filter(|value| !value.is_null()).ok_or_else(|| {
            MetaAiError::handshake(
                status,
                format!("missing `{}`", CREDENTIAL_PATH[..=depth].join(".")),
            )
        })?;
    }

    match current.as_str() {
        Some(token) if !token.is_empty() => Ok(AccessCredential::new(token)),
        _ => Err(MetaAiError::handshake(
            status,
            format!("`{}` is not a non-empty string", CREDENTIAL_PATH.join(".")),
        )),
    }
}
