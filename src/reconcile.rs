//! Reconciliation of newline-delimited JSON prompt responses.
//!
//! Every line of a prompt response is an independent JSON document. Lines
//! that fail to decode are skipped. The authoritative record is the last one
//! whose bot response reports `OVERALL_DONE`.

use tracing::{debug, trace};

use crate::answer::{media_from_bot_response, MediaReference};
use crate::error::{MetaAiError, Result};
use crate::record::{StreamRecord, CONTENT_PATH, CONTENT_TEXT_PATH};

/// Incremental reconciler fed with arbitrary body chunks.
#[derive(Debug, Default)]
pub struct StreamReconciler {
    buffer: Vec<u8>,
    terminal: Option<StreamRecord>,
    decoded: usize,
    skipped: usize,
}

impl StreamReconciler {
    /// Feeds bytes and reports every record completed by them, in order.
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_record: F)
    where
        F: FnMut(&StreamRecord),
    {
        self.buffer.extend_from_slice(bytes);

        while let Some(split) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=split).collect();
            self.observe_line(&line[..split], &mut on_record);
        }
    }

    /// Flushes a trailing unterminated line and returns the terminal record.
    pub fn finish<F>(mut self, mut on_record: F) -> Option<StreamRecord>
    where
        F: FnMut(&StreamRecord),
    {
        let rest = std::mem::take(&mut self.buffer);
        self.observe_line(&rest, &mut on_record);
        self.terminal
    }

    pub fn decoded_lines(&self) -> usize {
        self.decoded
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }

    pub fn has_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    fn observe_line<F>(&mut self, line: &[u8], on_record: &mut F)
    where
        F: FnMut(&StreamRecord),
    {
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }

        let Some(record) = StreamRecord::from_line(line) else {
            self.skipped += 1;
            trace!(bytes = line.len(), "skipping undecodable stream line");
            return;
        };

        self.decoded += 1;
        if record.has_errors() {
            debug!("stream record carries an `errors` key");
        }
        on_record(&record);
        if record.is_terminal() {
            self.terminal = Some(record);
        }
    }
}

/// Returns the last terminal record of a complete response body, if any.
pub fn reconcile(raw_body: &str) -> Option<StreamRecord> {
    let mut reconciler = StreamReconciler::default();
    reconciler.feed(raw_body.as_bytes(), |_| {});
    reconciler.finish(|_| {})
}

/// Concatenates the terminal record's content fragments, each followed by `\n`.
///
/// The record has already been judged terminal, so a missing content path
/// is a contract violation rather than a transient condition.
pub fn format_response(record: &StreamRecord) -> Result<String> {
    let fragments = record
        .content_fragments()
        .ok_or_else(|| MetaAiError::malformed_terminal_record(CONTENT_PATH))?;

    let mut text = String::new();
    for fragment in fragments {
        let fragment = fragment
            .get("text")
            .and_then(|value| value.as_str())
            .ok_or_else(|| MetaAiError::malformed_terminal_record(CONTENT_TEXT_PATH))?;
        text.push_str(fragment);
        text.push('\n');
    }
    Ok(text)
}

/// Lenient text view of an in-flight record, used for partial updates.
pub fn partial_text(record: &StreamRecord) -> Option<String> {
    let fragments = record.content_fragments()?;
    let text: String = fragments
        .iter()
        .filter_map(|fragment| fragment.get("text").and_then(|value| value.as_str()))
        .flat_map(|fragment| [fragment, "\n"])
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Generated media carried by a record's bot response.
pub fn extract_media(record: &StreamRecord) -> Vec<MediaReference> {
    record
        .bot_response()
        .map(media_from_bot_response)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DONE_HELLO: &str = r#"{"data":{"node":{"bot_response_message":{"streaming_state":"OVERALL_DONE","composed_text":{"content":[{"text":"Hello"}]}}}}}"#;

    #[test]
    fn feed_handles_records_split_across_chunks() {
        let mut reconciler = StreamReconciler::default();
        let (head, tail) = DONE_HELLO.split_at(20);
        let mut seen = 0;

        reconciler.feed(head.as_bytes(), |_| seen += 1);
        assert_eq!(seen, 0);
        reconciler.feed(tail.as_bytes(), |_| seen += 1);
        reconciler.feed(b"\n", |_| seen += 1);
        assert_eq!(seen, 1);
        assert!(reconciler.has_terminal());
    }

    #[test]
    fn feed_handles_multibyte_text_split_mid_character() {
        let line = r#"{"data":{"node":{"bot_response_message":{"streaming_state":"OVERALL_DONE","composed_text":{"content":[{"text":"héllo"}]}}}}}"#;
        let bytes = line.as_bytes();
        let split = line.find('é').expect("accent present") + 1;

        let mut reconciler = StreamReconciler::default();
        reconciler.feed(&bytes[..split], |_| {});
        reconciler.feed(&bytes[split..], |_| {});
        let terminal = reconciler.finish(|_| {}).expect("terminal record");

        assert_eq!(format_response(&terminal).expect("format"), "héllo\n");
    }

    #[test]
    fn counts_skipped_and_decoded_lines() {
        let mut reconciler = StreamReconciler::default();
        reconciler.feed(b"{\"errors\":{}}\nnot json\n\n{\"a\":1}\n", |_| {});
        assert_eq!(reconciler.decoded_lines(), 2);
        assert_eq!(reconciler.skipped_lines(), 1);
        assert!(!reconciler.has_terminal());
    }

    #[test]
    fn partial_text_ignores_fragments_without_text() {
        let record = StreamRecord::new(serde_json::json!({"data":{"node":{"bot_response_message":{
            "streaming_state":"STREAMING",
            "composed_text":{"content":[{"text":"Hel"},{"kind":"x"}]}
        }}}}));
        assert_eq!(partial_text(&record).as_deref(), Some("Hel\n"));
    }
}
