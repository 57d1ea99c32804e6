#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use meta_ai::headers::{Headers, HEADER_FRIENDLY_NAME};
use meta_ai::payload::{ACCEPT_TERMS, SEARCH_SOURCES, SEND_MESSAGE};
use meta_ai::{MetaAi, MetaAiConfig, Result, Transport, TransportResponse};

pub const LANDING_PAGE: &str = concat!(
    r#"<html><script>{"datr":{"value":"DATR-VALUE","expiration":1},"#,
    r#""_js_datr":{"value":"JSDATR-VALUE","expiration":1},"#,
    r#""abra_csrf":{"value":"CSRF-VALUE","expiration":1}}</script>"#,
    r#"<script>["LSD",[],{"token":"LSD-VALUE"},323]</script></html>"#,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: String,
}

impl RecordedRequest {
    pub fn friendly_name(&self) -> Option<&str> {
        self.headers.get(HEADER_FRIENDLY_NAME).map(String::as_str)
    }

    /// Decoded value of one form field.
    pub fn form_field(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    }

    pub fn variables(&self) -> serde_json::Value {
        let raw = self.form_field("variables").expect("variables field");
        serde_json::from_str(&raw).expect("variables are JSON")
    }
}

#[derive(Debug, Default)]
pub struct TransportTrace {
    pub requests: Vec<RecordedRequest>,
    handshakes_issued: usize,
}

impl TransportTrace {
    pub fn count(&self, friendly_name: &str) -> usize {
        self.requests
            .iter()
            .filter(|request| request.friendly_name() == Some(friendly_name))
            .count()
    }

    pub fn handshakes(&self) -> usize {
        self.count(ACCEPT_TERMS.friendly_name)
    }

    pub fn prompts(&self) -> Vec<&RecordedRequest> {
        self.requests
            .iter()
            .filter(|request| request.friendly_name() == Some(SEND_MESSAGE.friendly_name))
            .collect()
    }

    pub fn landing_fetches(&self) -> usize {
        self.requests
            .iter()
            .filter(|request| request.method == Method::Get)
            .count()
    }
}

/// In-memory [`Transport`] routing requests by GraphQL operation.
///
/// Handshakes succeed with `token-<n>` unless a response was queued.
/// Prompt bodies are served from a queue; running dry is a test bug.
pub struct ScriptedTransport {
    trace: Arc<Mutex<TransportTrace>>,
    landing: String,
    handshakes: Mutex<VecDeque<TransportResponse>>,
    prompts: Mutex<VecDeque<TransportResponse>>,
    sources: Mutex<VecDeque<TransportResponse>>,
    chunk_size: Option<usize>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            trace: Arc::new(Mutex::new(TransportTrace::default())),
            landing: LANDING_PAGE.to_owned(),
            handshakes: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(VecDeque::new()),
            sources: Mutex::new(VecDeque::new()),
            chunk_size: None,
        }
    }

    pub fn with_landing(mut self, html: &str) -> Self {
        self.landing = html.to_owned();
        self
    }

    pub fn with_handshake(self, status: u16, body: &str) -> Self {
        lock_unpoisoned(&self.handshakes).push_back(TransportResponse::new(status, body));
        self
    }

    pub fn with_prompt(self, body: &str) -> Self {
        lock_unpoisoned(&self.prompts).push_back(TransportResponse::new(200, body));
        self
    }

    pub fn with_prompts(self, count: usize, body: &str) -> Self {
        (0..count).fold(self, |transport, _| transport.with_prompt(body))
    }

    pub fn with_sources(self, status: u16, body: &str) -> Self {
        lock_unpoisoned(&self.sources).push_back(TransportResponse::new(status, body));
        self
    }

    /// Delivers streamed bodies in chunks of `size` bytes.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn trace(&self) -> Arc<Mutex<TransportTrace>> {
        Arc::clone(&self.trace)
    }

    fn record(&self, method: Method, url: &str, headers: &Headers, body: &str) {
        lock_unpoisoned(&self.trace).requests.push(RecordedRequest {
            method,
            url: url.to_owned(),
            headers: headers.clone(),
            body: body.to_owned(),
        });
    }

    fn next_handshake(&self) -> TransportResponse {
        if let Some(response) = lock_unpoisoned(&self.handshakes).pop_front() {
            return response;
        }
        let mut trace = lock_unpoisoned(&self.trace);
        trace.handshakes_issued += 1;
        TransportResponse::new(200, handshake_body(&format!("token-{}", trace.handshakes_issued)))
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, headers: &Headers) -> Result<TransportResponse> {
        self.record(Method::Get, url, headers, "");
        Ok(TransportResponse::new(200, self.landing.clone()))
    }

    fn post_form(&self, url: &str, headers: &Headers, body: &str) -> Result<TransportResponse> {
        self.record(Method::Post, url, headers, body);
        let friendly_name = headers.get(HEADER_FRIENDLY_NAME).map(String::as_str);

        let response = if friendly_name == Some(ACCEPT_TERMS.friendly_name) {
            self.next_handshake()
        } else if friendly_name == Some(SEND_MESSAGE.friendly_name) {
            lock_unpoisoned(&self.prompts)
                .pop_front()
                .expect("unexpected prompt request: no scripted body left")
        } else if friendly_name == Some(SEARCH_SOURCES.friendly_name) {
            lock_unpoisoned(&self.sources)
                .pop_front()
                .unwrap_or_else(|| TransportResponse::new(200, r#"{"data":{"message":null}}"#))
        } else {
            panic!("unexpected operation: {friendly_name:?}");
        };
        Ok(response)
    }

    fn post_form_streaming(
        &self,
        url: &str,
        headers: &Headers,
        body: &str,
        on_chunk: &mut dyn FnMut(&[u8]),
    ) -> Result<u16> {
        let response = self.post_form(url, headers, body)?;
        match self.chunk_size {
            Some(size) => response.body.as_bytes().chunks(size).for_each(|chunk| on_chunk(chunk)),
            None => on_chunk(response.body.as_bytes()),
        }
        Ok(response.status)
    }
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub fn test_config() -> MetaAiConfig {
    MetaAiConfig::default().with_retry_delay(Duration::ZERO)
}

/// Client over `transport`, plus a handle on its request trace.
pub fn client_with(transport: ScriptedTransport) -> (MetaAi, Arc<Mutex<TransportTrace>>) {
    client_with_config(transport, test_config())
}

pub fn client_with_config(
    transport: ScriptedTransport,
    config: MetaAiConfig,
) -> (MetaAi, Arc<Mutex<TransportTrace>>) {
    let trace = transport.trace();
    let transport: Arc<dyn Transport> = Arc::new(transport);
    (MetaAi::with_transport(config, transport), trace)
}

pub fn handshake_body(token: &str) -> String {
    serde_json::json!({
        "data": {
            "xab_abra_accept_terms_of_service": {
                "new_temp_user_auth": { "access_token": token }
            }
        }
    })
    .to_string()
}

pub fn streaming_line(text: &str) -> String {
    bot_line("STREAMING", text, serde_json::json!({}))
}

pub fn done_line(text: &str) -> String {
    bot_line("OVERALL_DONE", text, serde_json::json!({}))
}

pub fn done_line_with(text: &str, extra: serde_json::Value) -> String {
    bot_line("OVERALL_DONE", text, extra)
}

fn bot_line(state: &str, text: &str, extra: serde_json::Value) -> String {
    let mut bot = serde_json::json!({
        "streaming_state": state,
        "composed_text": { "content": [ { "text": text } ] },
    });
    if let (Some(bot), Some(extra)) = (bot.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            bot.insert(key.clone(), value.clone());
        }
    }
    serde_json::json!({ "data": { "node": { "bot_response_message": bot } } }).to_string()
}

/// Response body that never reaches a terminal record.
pub fn incomplete_body() -> String {
    format!("{{\"errors\":{{}}}}\n{}\n", streaming_line("partial"))
}
