use serde_json::Value;

pub const BOT_RESPONSE_POINTER: &str = "/data/node/bot_response_message";
pub const CONTENT_PATH: &str = "data.node.bot_response_message.composed_text.content";
pub const CONTENT_TEXT_PATH: &str = "data.node.bot_response_message.composed_text.content[].text";

/// Generation state reported by the bot-response object of a streamed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingState {
    Streaming,
    OverallDone,
}

impl StreamingState {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "STREAMING" => Self::Streaming,
            "OVERALL_DONE" => Self::OverallDone,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streaming => "STREAMING",
            Self::OverallDone => "OVERALL_DONE",
        }
    }
}

/// One decoded line of a streamed prompt response.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    value: Value,
}

impl StreamRecord {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Decodes one line. `None` for lines that are not a JSON document.
    pub fn from_line(line: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Value>(line).ok().map(Self::new)
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Whether the record carries a top-level `errors` key.
    pub fn has_errors(&self) -> bool {
        self.value.get("errors").is_some()
    }

    pub fn bot_response(&self) -> Option<&Value> {
        self.value.pointer(BOT_RESPONSE_POINTER)
    }

    pub fn streaming_state(&self) -> Option<StreamingState> {
        self.bot_response()?
            .get("streaming_state")?
            .as_str()
            .and_then(StreamingState::parse)
    }

    /// The record marks the answer as fully generated.
    pub fn is_terminal(&self) -> bool {
        self.streaming_state() == Some(StreamingState::OverallDone)
    }

    pub fn content_fragments(&self) -> Option<&Vec<Value>> {
        self.bot_response()?
            .pointer("/composed_text/content")?
            .as_array()
    }

    /// Identifier keying the auxiliary sources lookup.
    pub fn fetch_id(&self) -> Option<&str> {
        non_empty_str(self.bot_response()?.get("fetch_id")?)
    }

    pub fn message_id(&self) -> Option<&str> {
        non_empty_str(self.bot_response()?.get("id")?)
    }

    /// Conversation id from a `<conversation>_<offline>_<n>` message id.
    pub fn conversation_id(&self) -> Option<&str> {
        let mut parts = self.message_id()?.split('_');
        let conversation = parts.next()?;
        let _offline = parts.next()?;
        let _index = parts.next()?;
        if parts.next().is_some() || conversation.is_empty() {
            return None;
        }
        Some(conversation)
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|value| !value.is_empty())
}
