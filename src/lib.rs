//! Unofficial blocking client for the Meta AI web chat.
//!
//! The service exposes no public API. A session is bootstrapped by scraping
//! anonymous tokens from the landing page, exchanging them for a short-lived
//! access token, and posting prompts to the internal GraphQL endpoint. The
//! response arrives as newline-delimited JSON records; the answer is taken
//! from the last record that reports generation as complete.
//!
//! # Overview
//! - [`MetaAi`] orchestrates a conversation: lazy handshake, prompt, bounded
//!   refresh-and-retry, optional sources lookup.
//! - [`scrape::extract_value`] and [`offline_id::generate_offline_threading_id`]
//!   are the pure building blocks of the handshake and request stamping.
//! - [`reconcile::reconcile`] and [`reconcile::format_response`] turn a raw
//!   response body into text.
//! - [`Transport`] is the HTTP boundary; [`ReqwestTransport`] is the default.
//!
//! Upstream operation names and document ids live in [`payload`] and are
//! expected to drift.

pub mod answer;
pub mod broker;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod offline_id;
pub mod payload;
pub mod reconcile;
pub mod record;
pub mod retry;
pub mod scrape;
pub mod transport;
pub mod url;

pub use answer::{MediaReference, ReconciledAnswer, SourceReference};
pub use broker::{AccessCredential, CredentialBroker, Credentials};
pub use client::{MetaAi, PromptEvent, PromptOptions};
pub use config::MetaAiConfig;
pub use error::{MetaAiError, Result};
pub use offline_id::generate_offline_threading_id;
pub use reconcile::{format_response, reconcile, StreamReconciler};
pub use record::{StreamRecord, StreamingState};
pub use retry::RetryPolicy;
pub use scrape::{extract_value, AnonymousTokens};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
