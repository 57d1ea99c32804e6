//! Blocking request/response boundary between the protocol core and HTTP.

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy, RequestBuilder};
use tokio::runtime::Runtime;

use crate::config::MetaAiConfig;
use crate::error::{MetaAiError, Result};
use crate::headers::Headers;

/// Status and fully-read body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP capability used by the core.
///
/// Non-2xx statuses are returned as responses, not errors. Connection and
/// read timeouts are the implementation's concern.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, headers: &Headers) -> Result<TransportResponse>;

    fn post_form(&self, url: &str, headers: &Headers, body: &str) -> Result<TransportResponse>;

    /// Like [`Transport::post_form`] but hands body bytes to `on_chunk` as
    /// they arrive and returns only the status.
    fn post_form_streaming(
        &self,
        url: &str,
        headers: &Headers,
        body: &str,
        on_chunk: &mut dyn FnMut(&[u8]),
    ) -> Result<u16> {
        let response = self.post_form(url, headers, body)?;
        on_chunk(response.body.as_bytes());
        Ok(response.status)
    }
}

/// [`Transport`] backed by `reqwest`, driven by a private current-thread runtime.
#[derive(Debug)]
pub struct ReqwestTransport {
    http: Client,
    runtime: Runtime,
}

impl ReqwestTransport {
    pub fn new(config: &MetaAiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = config.proxy.as_deref() {
            builder = builder.proxy(Proxy::all(proxy)?);
        }
        let http = builder.build()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| MetaAiError::Runtime(error.to_string()))?;

        Ok(Self { http, runtime })
    }

    fn form_request(&self, url: &str, headers: &Headers, body: &str) -> Result<RequestBuilder> {
        Ok(self
            .http
            .post(url)
            .headers(to_header_map(headers)?)
            .body(body.to_owned()))
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, headers: &Headers) -> Result<TransportResponse> {
        let request = self.http.get(url).headers(to_header_map(headers)?);
        self.runtime.block_on(read_text(url, request))
    }

    fn post_form(&self, url: &str, headers: &Headers, body: &str) -> Result<TransportResponse> {
        let request = self.form_request(url, headers, body)?;
        self.runtime.block_on(read_text(url, request))
    }

    fn post_form_streaming(
        &self,
        url: &str,
        headers: &Headers,
        body: &str,
        on_chunk: &mut dyn FnMut(&[u8]),
    ) -> Result<u16> {
        let request = self.form_request(url, headers, body)?;
        self.runtime.block_on(read_chunks(url, request, on_chunk))
    }
}

async fn send(url: &str, request: RequestBuilder) -> Result<reqwest::Response> {
    request
        .send()
        .await
        .map_err(|error| MetaAiError::transport(url, error.to_string()))
}

async fn read_text(url: &str, request: RequestBuilder) -> Result<TransportResponse> {
    let response = send(url, request).await?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|error| MetaAiError::transport(url, error.to_string()))?;
    Ok(TransportResponse { status, body })
}

async fn read_chunks(
    url: &str,
    request: RequestBuilder,
    on_chunk: &mut dyn FnMut(&[u8]),
) -> Result<u16> {
    let response = send(url, request).await?;
    let status = response.status().as_u16();
    let mut bytes = response.bytes_stream();
    while let Some(chunk) = bytes.next().await {
        let chunk = chunk.map_err(|error| MetaAiError::transport(url, error.to_string()))?;
        on_chunk(&chunk[..]);
    }
    Ok(status)
}

fn to_header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut out = HeaderMap::new();
    for (key, value) in headers {
        out.insert(
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| MetaAiError::InvalidHeader { name: key.clone() })?,
            HeaderValue::from_str(value)
                .map_err(|_| MetaAiError::InvalidHeader { name: key.clone() })?,
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BufferedOnly;

    impl Transport for BufferedOnly {
        fn get(&self, _url: &str, _headers: &Headers) -> Result<TransportResponse> {
            Ok(TransportResponse::new(200, ""))
        }

        fn post_form(&self, _url: &str, _headers: &Headers, _body: &str) -> Result<TransportResponse> {
            Ok(TransportResponse::new(202, "line-1\nline-2"))
        }
    }

    #[test]
    fn default_streaming_delivers_whole_body_once() {
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let status = BufferedOnly
            .post_form_streaming("http://unused", &Headers::new(), "", &mut |chunk: &[u8]| {
                chunks.push(chunk.to_vec())
            })
            .expect("buffered streaming should succeed");

        assert_eq!(status, 202);
        assert_eq!(chunks, vec![b"line-1\nline-2".to_vec()]);
    }

    #[test]
    fn header_map_rejects_invalid_names() {
        let mut headers = Headers::new();
        headers.insert("bad header".to_owned(), "v".to_owned());
        let error = to_header_map(&headers).expect_err("space in header name is invalid");
        assert!(matches!(error, MetaAiError::InvalidHeader { name } if name == "bad header"));
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(302, "").is_success());
    }
}
