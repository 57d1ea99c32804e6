use std::collections::BTreeMap;

use crate::config::MetaAiConfig;
use crate::payload::Operation;
use crate::scrape::AnonymousTokens;

/// Ordered header map handed to the transport.
pub type Headers = BTreeMap<String, String>;

pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_COOKIE: &str = "cookie";
pub const HEADER_USER_AGENT: &str = "user-agent";
pub const HEADER_FRIENDLY_NAME: &str = "x-fb-friendly-name";
pub const HEADER_LSD: &str = "x-fb-lsd";
pub const HEADER_DPR: &str = "dpr";
pub const HEADER_SEC_FETCH_SITE: &str = "sec-fetch-site";
pub const HEADER_ACCEPT_LANGUAGE: &str = "accept-language";

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Headers for the landing page fetch.
pub fn landing_headers(config: &MetaAiConfig) -> Headers {
    let mut headers = base_headers(config);
    headers.insert(HEADER_ACCEPT_LANGUAGE.to_owned(), "en-US,en;q=0.9".to_owned());
    headers
}

/// Headers for the terms-of-service handshake.
pub fn handshake_headers(
    config: &MetaAiConfig,
    operation: &Operation,
    tokens: &AnonymousTokens,
) -> Headers {
    let mut headers = operation_headers(config, operation);
    headers.insert(HEADER_COOKIE.to_owned(), tokens.cookie_header());
    headers.insert(HEADER_LSD.to_owned(), tokens.lsd.clone());
    headers.insert(HEADER_DPR.to_owned(), "2".to_owned());
    headers.insert(HEADER_SEC_FETCH_SITE.to_owned(), "same-origin".to_owned());
    headers
}

/// Headers for a GraphQL operation authenticated by form-carried access token.
pub fn graphql_headers(
    config: &MetaAiConfig,
    operation: &Operation,
    tokens: Option<&AnonymousTokens>,
) -> Headers {
    let mut headers = operation_headers(config, operation);
    if let Some(tokens) = tokens {
        headers.insert(
            HEADER_COOKIE.to_owned(),
            format!(
                "dpr=2; abra_csrf={}; datr={}; ps_n=1; ps_l=1",
                tokens.abra_csrf, tokens.datr
            ),
        );
    }
    headers
}

fn operation_headers(config: &MetaAiConfig, operation: &Operation) -> Headers {
    let mut headers = base_headers(config);
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        FORM_CONTENT_TYPE.to_owned(),
    );
    headers.insert(
        HEADER_FRIENDLY_NAME.to_owned(),
        operation.friendly_name.to_owned(),
    );
    headers
}

fn base_headers(config: &MetaAiConfig) -> Headers {
    let mut headers = BTreeMap::new();
    headers.insert(
        HEADER_USER_AGENT.to_owned(),
        config.user_agent.trim().to_owned(),
    );
    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ACCEPT_TERMS, SEARCH_SOURCES};

    fn tokens() -> AnonymousTokens {
        AnonymousTokens {
            js_datr: "js".to_owned(),
            abra_csrf: "csrf".to_owned(),
            datr: "dt".to_owned(),
            lsd: "lsd-token".to_owned(),
        }
    }

    #[test]
    fn handshake_headers_carry_cookies_and_lsd() {
        let headers = handshake_headers(&MetaAiConfig::default(), &ACCEPT_TERMS, &tokens());
        assert_eq!(headers[HEADER_COOKIE], "_js_datr=js; abra_csrf=csrf;");
        assert_eq!(headers[HEADER_LSD], "lsd-token");
        assert_eq!(headers[HEADER_FRIENDLY_NAME], ACCEPT_TERMS.friendly_name);
        assert_eq!(headers[HEADER_CONTENT_TYPE], FORM_CONTENT_TYPE);
    }

    #[test]
    fn graphql_cookie_carries_datr() {
        let headers = graphql_headers(&MetaAiConfig::default(), &SEARCH_SOURCES, Some(&tokens()));
        assert_eq!(
            headers[HEADER_COOKIE],
            "dpr=2; abra_csrf=csrf; datr=dt; ps_n=1; ps_l=1"
        );
    }

    #[test]
    fn graphql_headers_without_tokens_have_no_cookie() {
        let headers = graphql_headers(&MetaAiConfig::default(), &SEARCH_SOURCES, None);
        assert!(!headers.contains_key(HEADER_COOKIE));
        assert_eq!(headers[HEADER_FRIENDLY_NAME], SEARCH_SOURCES.friendly_name);
    }

    #[test]
    fn extra_headers_are_normalized_and_merged() {
        let config = MetaAiConfig::default().insert_header(" X-Trace ", " abc ");
        let headers = landing_headers(&config);
        assert_eq!(headers.get("x-trace").map(String::as_str), Some("abc"));
        assert!(headers.contains_key(HEADER_USER_AGENT));
    }
}
