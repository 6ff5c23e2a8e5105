use serde::Serialize;

use crate::voice::{TextNormalization, VoiceParams};

/// JSON body of a text-to-speech call.
#[derive(Debug, Serialize)]
pub(crate) struct TtsRequest<'a> {
    pub text: &'a str,
    pub model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<&'a str>,
    pub apply_text_normalization: TextNormalization,
    pub voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
pub(crate) struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl<'a> TtsRequest<'a> {
    pub fn new(text: &'a str, voice: &'a VoiceParams) -> Self {
        let language_code = Some(voice.language_code.trim()).filter(|c| !c.is_empty());
        Self {
            text,
            model_id: &voice.model_id,
            language_code,
            apply_text_normalization: voice.text_normalization,
            voice_settings: VoiceSettings {
                stability: voice.stability,
                similarity_boost: voice.similarity_boost,
                style: voice.style,
                use_speaker_boost: voice.use_speaker_boost,
            },
        }
    }
}

/// Best human-readable message from an error response body.
///
/// Handles `{"detail": {"message": ..}}`, `{"detail": ".."}` and validation
/// lists of `{"msg": ..}`; anything else is returned as (truncated) text.
pub(crate) fn api_error_message(body: &[u8]) -> String {
    const MAX_RAW: usize = 300;

    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        let detail = &json["detail"];
        if let Some(message) = detail["message"].as_str() {
            return message.to_string();
        }
        if let Some(message) = detail.as_str() {
            return message.to_string();
        }
        if let Some(items) = detail.as_array() {
            let msgs: Vec<&str> = items.iter().filter_map(|i| i["msg"].as_str()).collect();
            if !msgs.is_empty() {
                return msgs.join("; ");
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "no details".to_string();
    }
    match text.char_indices().nth(MAX_RAW) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
