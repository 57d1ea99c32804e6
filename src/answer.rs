use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Final answer for one prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledAnswer {
    /// Content fragments of the terminal record, each followed by `\n`.
    pub message: String,
    #[serde(default)]
    pub sources: Vec<SourceReference>,
    #[serde(default)]
    pub media: Vec<MediaReference>,
}

/// Citation attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub title: String,
    pub url: String,
}

/// Generated media attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub prompt: Option<String>,
}

/// Reads `data.message.searchResults.references[]` from a sources response.
///
/// Any missing or `null` step yields an empty list. References without a
/// `link` are skipped; a missing `title` becomes empty.
pub fn sources_from_response(response: &Value) -> Vec<SourceReference> {
    let Some(references) = response
        .pointer("/data/message/searchResults/references")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    references
        .iter()
        .filter_map(|reference| {
            let url = reference.get("link")?.as_str()?;
            let title = reference
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(SourceReference {
                title: title.to_owned(),
                url: url.to_owned(),
            })
        })
        .collect()
}

/// Reads `imagine_card.session.media_sets[].imagine_media[]` from a bot response.
pub fn media_from_bot_response(bot_response: &Value) -> Vec<MediaReference> {
    let Some(media_sets) = bot_response
        .pointer("/imagine_card/session/media_sets")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    media_sets
        .iter()
        .filter_map(|set| set.get("imagine_media").and_then(Value::as_array))
        .flatten()
        .filter_map(|media| {
            let url = media.get("uri")?.as_str()?;
            Some(MediaReference {
                url: url.to_owned(),
                kind: media
                    .get("media_type")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned),
                prompt: media
                    .get("prompt")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned),
            })
        })
        .collect()
}
