//! Marker-delimited token extraction from served landing-page markup.
//!
//! The landing page embeds its anonymous session configuration as serialized
//! string literals inside inline scripts, so extraction is plain substring
//! search between two literal markers rather than DOM traversal.

use tracing::debug;

pub const JS_DATR_START: &str = r#"_js_datr":{"value":""#;
pub const ABRA_CSRF_START: &str = r#"abra_csrf":{"value":""#;
pub const DATR_START: &str = r#"datr":{"value":""#;
pub const COOKIE_VALUE_END: &str = r#"","#;
pub const LSD_START: &str = r#""LSD",[],{"token":""#;
pub const LSD_END: &str = r#""}"#;

/// Token name and start/end markers for each value scraped from the landing page.
pub const TOKEN_MARKERS: [(&str, &str, &str); 4] = [
    ("_js_datr", JS_DATR_START, COOKIE_VALUE_END),
    ("abra_csrf", ABRA_CSRF_START, COOKIE_VALUE_END),
    ("datr", DATR_START, COOKIE_VALUE_END),
    ("lsd", LSD_START, LSD_END),
];

/// Returns the text between the first `start_marker` and the next `end_marker`.
///
/// Extraction is best-effort and counts positions in characters. A missing
/// start marker makes the search begin at character `start_marker.chars().count() - 1`,
/// and a missing end marker makes the slice stop before the last character
/// of `text`, so a miss yields an empty or garbage value instead of an error.
/// Callers learn about a miss only when the handshake rejects what was scraped.
pub fn extract_value(text: &str, start_marker: &str, end_marker: &str) -> String {
    let start = match text.find(start_marker) {
        Some(index) => index + start_marker.len(),
        None => {
            debug!(marker = start_marker, "start marker not found in scraped text");
            char_offset(text, start_marker.chars().count().saturating_sub(1))
        }
    };

    let end = match text
        .get(start..)
        .and_then(|rest| rest.find(end_marker))
    {
        Some(offset) => start + offset,
        None => {
            debug!(marker = end_marker, "end marker not found in scraped text");
            without_last_char(text)
        }
    };

    if start >= end {
        return String::new();
    }

    text.get(start..end).map(str::to_owned).unwrap_or_default()
}

/// Byte offset of the `chars`-th character, or `text.len()` past the end.
fn char_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

fn without_last_char(text: &str) -> usize {
    text.char_indices().next_back().map_or(0, |(index, _)| index)
}

/// Names of the tokens whose start marker does not occur in `html`.
pub fn missing_markers(html: &str) -> Vec<&'static str> {
    TOKEN_MARKERS
        .iter()
        .filter(|(_, start, _)| !html.contains(start))
        .map(|(name, _, _)| *name)
        .collect()
}

/// Anonymous tokens scraped from the landing page ahead of the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnonymousTokens {
    pub js_datr: String,
    pub abra_csrf: String,
    pub datr: String,
    pub lsd: String,
}

impl AnonymousTokens {
    /// Scrapes every token. Missing markers still produce best-effort values.
    pub fn from_landing_page(html: &str) -> Self {
        let missing = missing_markers(html);
        if !missing.is_empty() {
            debug!(?missing, "landing page lacks token markers");
        }

        let [js_datr, abra_csrf, datr, lsd] =
            TOKEN_MARKERS.map(|(_, start, end)| extract_value(html, start, end));
        Self {
            js_datr,
            abra_csrf,
            datr,
            lsd,
        }
    }

    /// Cookie header value sent with the handshake.
    pub fn cookie_header(&self) -> String {
        format!("_js_datr={}; abra_csrf={};", self.js_datr, self.abra_csrf)
    }
}
