use std::sync::Arc;
use std::thread;

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::answer::{sources_from_response, ReconciledAnswer, SourceReference};
use crate::broker::{CredentialBroker, Credentials};
use crate::config::MetaAiConfig;
use crate::error::{MetaAiError, Result};
use crate::headers::graphql_headers;
use crate::offline_id::generate_offline_threading_id;
use crate::payload::{prompt_form, sources_form, PromptRequest, SEARCH_SOURCES, SEND_MESSAGE};
use crate::reconcile::{extract_media, format_response, partial_text, StreamReconciler};
use crate::record::StreamRecord;
use crate::retry::RetryPolicy;
use crate::transport::{ReqwestTransport, Transport};

/// Per-call prompt switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptOptions {
    /// Rotate the conversation id before sending.
    pub new_conversation: bool,
    /// Overrides [`MetaAiConfig::fetch_sources`] for this call.
    pub fetch_sources: Option<bool>,
}

/// Progress reported while a prompt is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    /// Text of the latest decoded record that carried content.
    Partial { text: String },
    /// A previous attempt ended without a terminal record; `attempt` is zero-based.
    Retrying { attempt: u32, max_attempts: u32 },
}

#[derive(Debug)]
struct Session {
    credentials: Option<Credentials>,
    external_conversation_id: String,
}

impl Session {
    fn new() -> Self {
        Self {
            credentials: None,
            external_conversation_id: Uuid::new_v4().to_string(),
        }
    }
}

struct Attempt {
    status: u16,
    terminal: Option<StreamRecord>,
}

/// Anonymous Meta AI conversation client.
///
/// The session credential is acquired lazily on first use and replaced
/// whenever a response stream ends without a terminal record. Prompts take
/// `&mut self`; use one instance per concurrent conversation.
pub struct MetaAi {
    config: MetaAiConfig,
    transport: Arc<dyn Transport>,
    session: Session,
}

impl MetaAi {
    /// Creates a client using the `reqwest` transport.
    pub fn new(config: MetaAiConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client over a caller-supplied transport.
    pub fn with_transport(config: MetaAiConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            session: Session::new(),
        }
    }

    pub fn config(&self) -> &MetaAiConfig {
        &self.config
    }

    pub fn has_credential(&self) -> bool {
        self.session.credentials.is_some()
    }

    pub fn conversation_id(&self) -> &str {
        &self.session.external_conversation_id
    }

    /// Starts a fresh upstream conversation on the next prompt.
    pub fn new_conversation(&mut self) {
        self.session.external_conversation_id = Uuid::new_v4().to_string();
    }

    /// Performs a handshake and replaces the session credential.
    pub fn refresh_credential(&mut self) -> Result<()> {
        let credentials =
            CredentialBroker::new(&self.config, self.transport.as_ref()).acquire_credential()?;
        self.session.credentials = Some(credentials);
        Ok(())
    }

    pub fn prompt(&mut self, message: &str) -> Result<ReconciledAnswer> {
        self.prompt_with_options(message, PromptOptions::default())
    }

    pub fn prompt_with_options(
        &mut self,
        message: &str,
        options: PromptOptions,
    ) -> Result<ReconciledAnswer> {
        self.prompt_with_handler(message, options, |_| {})
    }

    /// Sends `message` and reconciles the streamed answer.
    ///
    /// An attempt whose stream never reaches a terminal record refreshes the
    /// credential and tries again, up to [`MetaAiConfig::max_attempts`]
    /// attempts in total. Exhausting them yields
    /// [`MetaAiError::ServiceUnavailable`]; every other error is returned
    /// immediately.
    pub fn prompt_with_handler<F>(
        &mut self,
        message: &str,
        options: PromptOptions,
        mut on_event: F,
    ) -> Result<ReconciledAnswer>
    where
        F: FnMut(PromptEvent),
    {
        if options.new_conversation {
            self.new_conversation();
        }
        let fetch_sources = options.fetch_sources.unwrap_or(self.config.fetch_sources);
        let policy = RetryPolicy::new(self.config.max_attempts, self.config.retry_delay);
        let mut last_status = None;

        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                on_event(PromptEvent::Retrying {
                    attempt,
                    max_attempts: policy.max_attempts,
                });
                if !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
                self.refresh_credential()?;
            } else if self.session.credentials.is_none() {
                self.refresh_credential()?;
            }

            let outcome = self.send_prompt(message, &mut on_event)?;
            last_status = Some(outcome.status);

            if let Some(terminal) = outcome.terminal {
                return self
                    .complete_answer(&terminal, fetch_sources)
                    .map_err(|error| error.at_attempt(attempt + 1, outcome.status));
            }

            if policy.allows_retry_after(attempt) {
                warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    status = outcome.status,
                    "response stream ended without a terminal record; refreshing credential"
                );
            }
        }

        Err(MetaAiError::ServiceUnavailable {
            attempts: policy.max_attempts,
            last_status,
        })
    }

    /// Looks up the citations keyed by a terminal record's fetch id.
    pub fn fetch_sources(&mut self, fetch_id: &str) -> Result<Vec<SourceReference>> {
        let access_token = self.ensure_credentials()?.access_token.as_str().to_owned();
        let tokens = self
            .session
            .credentials
            .as_ref()
            .map(|credentials| &credentials.tokens);

        let headers = graphql_headers(&self.config, &SEARCH_SOURCES, tokens);
        let body = sources_form(&access_token, fetch_id)?;
        let response = self
            .transport
            .post_form(&self.config.graphql_url, &headers, &body)?;
        debug!(
            status = response.status,
            success = response.is_success(),
            "sources response received"
        );

        let value: Value = serde_json::from_str(&response.body).map_err(|source| {
            MetaAiError::SourcesDecode {
                status: response.status,
                attempt: None,
                source,
            }
        })?;
        Ok(sources_from_response(&value))
    }

    fn ensure_credentials(&mut self) -> Result<&Credentials> {
        if self.session.credentials.is_none() {
            self.refresh_credential()?;
        }
        self.session
            .credentials
            .as_ref()
            .ok_or_else(|| MetaAiError::handshake(0, "credential missing after handshake"))
    }

    fn send_prompt<F>(&self, message: &str, on_event: &mut F) -> Result<Attempt>
    where
        F: FnMut(PromptEvent),
    {
        let credentials = self
            .session
            .credentials
            .as_ref()
            .ok_or_else(|| MetaAiError::handshake(0, "prompt sent without a credential"))?;
        let offline_threading_id = generate_offline_threading_id();
        let body = prompt_form(&PromptRequest {
            access_token: credentials.access_token.as_str(),
            message,
            external_conversation_id: &self.session.external_conversation_id,
            offline_threading_id: &offline_threading_id,
        })?;
        let headers = graphql_headers(&self.config, &SEND_MESSAGE, None);

        let mut reconciler = StreamReconciler::default();
        let status = self.transport.post_form_streaming(
            &self.config.graphql_url,
            &headers,
            &body,
            &mut |chunk: &[u8]| reconciler.feed(chunk, |record| emit_partial(record, &mut *on_event)),
        )?;
        debug!(
            status,
            decoded = reconciler.decoded_lines(),
            skipped = reconciler.skipped_lines(),
            complete = reconciler.has_terminal(),
            "prompt response body read"
        );
        let terminal = reconciler.finish(|record| emit_partial(record, &mut *on_event));

        Ok(Attempt { status, terminal })
    }

    fn complete_answer(
        &mut self,
        terminal: &StreamRecord,
        fetch_sources: bool,
    ) -> Result<ReconciledAnswer> {
        let message = format_response(terminal)?;
        let media = extract_media(terminal);

        if let Some(conversation_id) = terminal.conversation_id() {
            self.session.external_conversation_id = conversation_id.to_owned();
        }

        let sources = match terminal.fetch_id() {
            Some(fetch_id) if fetch_sources => self.fetch_sources(fetch_id)?,
            _ => Vec::new(),
        };

        Ok(ReconciledAnswer {
            message,
            sources,
            media,
        })
    }
}

fn emit_partial<F>(record: &StreamRecord, on_event: &mut F)
where
    F: FnMut(PromptEvent),
{
    if let Some(text) = partial_text(record) {
        on_event(PromptEvent::Partial { text });
    }
}
