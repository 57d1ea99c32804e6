//! Upstream GraphQL operation descriptors and form-body builders.
//!
//! Everything here mirrors the web client's wire contract byte for byte and
//! is expected to drift as the upstream service changes. Stream
//! reconciliation never depends on these values.

use serde::Serialize;
use url::form_urlencoded;

use crate::error::Result;

/// A persisted GraphQL operation: friendly name plus document id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub friendly_name: &'static str,
    pub doc_id: &'static str,
}

pub const ACCEPT_TERMS: Operation = Operation {
    friendly_name: "useAbraAcceptTOSForTempUserMutation",
    doc_id: "7604648749596940",
};

pub const SEND_MESSAGE: Operation = Operation {
    friendly_name: "useAbraSendMessageMutation",
    doc_id: "7783822248314888",
};

pub const SEARCH_SOURCES: Operation = Operation {
    friendly_name: "AbraSearchPluginDialogQuery",
    doc_id: "6946734308765963",
};

pub const CALLER_CLASS: &str = "RelayModern";
const TEMP_USER_DOB: &str = "1999-01-01";
const ICEBREAKER_TEXT: &str = "TEXT";
const CHAT_ENTRYPOINT: &str = "ABRA__CHAT__TEXT";

#[derive(Debug, Serialize)]
struct AcceptTermsVariables {
    dob: &'static str,
    icebreaker_type: &'static str,
    #[serde(rename = "__relay_internal__pv__WebPixelRatiorelayprovider")]
    pixel_ratio: u8,
}

#[derive(Debug, Serialize)]
struct SensitiveString<'a> {
    sensitive_string_value: &'a str,
}

#[derive(Debug, Serialize)]
struct FlashVideoRecapInput {
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageVariables<'a> {
    message: SensitiveString<'a>,
    external_conversation_id: &'a str,
    offline_threading_id: &'a str,
    suggested_prompt_index: Option<u32>,
    flash_video_recap_input: FlashVideoRecapInput,
    flash_preview_input: Option<String>,
    prompt_prefix: Option<String>,
    entrypoint: &'static str,
    #[serde(rename = "icebreaker_type")]
    icebreaker_type: &'static str,
    #[serde(rename = "__relay_internal__pv__AbraDebugDevOnlyrelayprovider")]
    debug_dev_only: bool,
    #[serde(rename = "__relay_internal__pv__WebPixelRatiorelayprovider")]
    pixel_ratio: u8,
}

#[derive(Debug, Serialize)]
struct SearchSourcesVariables<'a> {
    #[serde(rename = "abraMessageFetchID")]
    fetch_id: &'a str,
}

/// Identifiers stamped on one outgoing prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest<'a> {
    pub access_token: &'a str,
    pub message: &'a str,
    pub external_conversation_id: &'a str,
    pub offline_threading_id: &'a str,
}

/// Form body accepting the terms of service for a temporary user.
pub fn handshake_form(lsd: &str) -> Result<String> {
    let variables = serde_json::to_string(&AcceptTermsVariables {
        dob: TEMP_USER_DOB,
        icebreaker_type: ICEBREAKER_TEXT,
        pixel_ratio: 1,
    })?;

    Ok(encode_form(&[
        ("lsd", lsd),
        ("fb_api_caller_class", CALLER_CLASS),
        ("fb_api_req_friendly_name", ACCEPT_TERMS.friendly_name),
        ("variables", variables.as_str()),
        ("server_timestamps", "true"),
        ("doc_id", ACCEPT_TERMS.doc_id),
    ]))
}

/// Form body submitting one prompt.
pub fn prompt_form(request: &PromptRequest<'_>) -> Result<String> {
    let variables = serde_json::to_string(&SendMessageVariables {
        message: SensitiveString {
            sensitive_string_value: request.message,
        },
        external_conversation_id: request.external_conversation_id,
        offline_threading_id: request.offline_threading_id,
        suggested_prompt_index: None,
        flash_video_recap_input: FlashVideoRecapInput { images: Vec::new() },
        flash_preview_input: None,
        prompt_prefix: None,
        entrypoint: CHAT_ENTRYPOINT,
        icebreaker_type: ICEBREAKER_TEXT,
        debug_dev_only: false,
        pixel_ratio: 1,
    })?;

    Ok(encode_form(&[
        ("access_token", request.access_token),
        ("fb_api_caller_class", CALLER_CLASS),
        ("fb_api_req_friendly_name", SEND_MESSAGE.friendly_name),
        ("variables", variables.as_str()),
        ("server_timestamps", "true"),
        ("doc_id", SEND_MESSAGE.doc_id),
    ]))
}

/// Form body looking up the citations attached to an answer.
pub fn sources_form(access_token: &str, fetch_id: &str) -> Result<String> {
    let variables = serde_json::to_string(&SearchSourcesVariables { fetch_id })?;

    Ok(encode_form(&[
        ("access_token", access_token),
        ("fb_api_caller_class", CALLER_CLASS),
        ("fb_api_req_friendly_name", SEARCH_SOURCES.friendly_name),
        ("variables", variables.as_str()),
        ("server_timestamps", "true"),
        ("doc_id", SEARCH_SOURCES.doc_id),
    ]))
}

fn encode_form(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
