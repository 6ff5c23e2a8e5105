use std::fmt;
use std::str::FromStr;

use derive_builder::Builder;
use serde::Serialize;

pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";
pub const DEFAULT_LANGUAGE_CODE: &str = "hi";
pub const DEFAULT_OUTPUT_FORMAT: &str = "mp3_44100_128";

/// How the provider normalizes numbers, dates and abbreviations in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextNormalization {
    Auto,
    On,
    #[default]
    Off,
}

impl FromStr for TextNormalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(format!("unknown text normalization '{other}' (expected auto, on or off)")),
        }
    }
}

impl fmt::Display for TextNormalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::On => "on",
            Self::Off => "off",
        };
        f.write_str(s)
    }
}

/// Voice and model settings shared by every synthesis call in a run.
///
/// Only `voice_id` is required; everything else defaults to the settings the
/// chant recordings were tuned with.
///
/// ```
/// use chant_rs::VoiceParamsBuilder;
///
/// let voice = VoiceParamsBuilder::default()
///     .voice_id("nPczCjzI2devNBz1zQrb")
///     .stability(0.5)
///     .build()
///     .unwrap();
/// assert_eq!(voice.output_format, "mp3_44100_128");
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct VoiceParams {
    #[builder(setter(into))]
    pub voice_id: String,
    #[builder(setter(into), default = "DEFAULT_MODEL_ID.to_string()")]
    pub model_id: String,
    /// ISO 639-1 code; empty leaves language detection to the model.
    #[builder(setter(into), default = "DEFAULT_LANGUAGE_CODE.to_string()")]
    pub language_code: String,
    /// Provider format string, e.g. `mp3_44100_128` or `pcm_24000`.
    #[builder(setter(into), default = "DEFAULT_OUTPUT_FORMAT.to_string()")]
    pub output_format: String,
    #[builder(default = "0.90")]
    pub stability: f32,
    #[builder(default = "0.75")]
    pub similarity_boost: f32,
    #[builder(default = "0.0")]
    pub style: f32,
    #[builder(default = "true")]
    pub use_speaker_boost: bool,
    #[builder(default)]
    pub text_normalization: TextNormalization,
}

impl VoiceParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(id) = &self.voice_id {
            if id.trim().is_empty() {
                return Err("voice_id cannot be empty".to_string());
            }
        }
        if let Some(format) = &self.output_format {
            if format.trim().is_empty() {
                return Err("output_format cannot be empty".to_string());
            }
        }
        let unit = [
            ("stability", self.stability),
            ("similarity_boost", self.similarity_boost),
            ("style", self.style),
        ];
        for (name, value) in unit {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(format!("{name} must be between 0.0 and 1.0 (got {v})"));
                }
            }
        }
        Ok(())
    }
}
