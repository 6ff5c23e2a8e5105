//! Run configuration: credentials, output targets and bitrates.
//!
//! Everything here is validated before the first synthesis call so a bad
//! invocation never costs a network round trip or leaves a partial file.

use std::path::{Path, PathBuf};

use crate::audio::encode::{encode_mp3, encode_wav, MP3_BITRATES};
use crate::audio::{AudioBuffer, AudioError};

/// Environment variable consulted for the API key when none is given.
pub const DEFAULT_API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// MP3 bitrate used when none is given.
pub const DEFAULT_MP3_BITRATE: &str = "320k";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(
        "Missing ElevenLabs API key.\n\
         Provide one using:\n  --api-key <KEY>\n\
         or export an environment variable and (optionally) pass its name via:\n  \
         --api-key-env <ENV_VAR_NAME>\n\
         (Current --api-key-env is '{env_name}')"
    )]
    MissingApiKey { env_name: String },
    #[error("{name} must be >= 0 (got {value}).")]
    NegativeDuration { name: &'static str, value: i64 },
    #[error("--out must end with .mp3 or .wav (got {})", .path.display())]
    UnsupportedExtension { path: PathBuf },
    #[error("Unsupported MP3 bitrate '{value}' (expected a standard LAME bitrate such as 320k)")]
    InvalidBitrate { value: String },
    #[error("Invalid voice settings: {0}")]
    Voice(String),
    #[error("Invalid voice spec '{0}' (expected NAME=VOICE_ID)")]
    VoiceSpec(String),
}

/// Pick the API key: an explicit value wins, then the named variable.
///
/// `lookup` reads an environment variable; blank values count as unset.
pub fn resolve_api_key<F>(explicit: Option<&str>, env_name: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = explicit.map(str::trim).filter(|k| !k.is_empty());
    if let Some(key) = explicit {
        return Ok(key.to_string());
    }
    lookup(env_name)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ConfigError::MissingApiKey {
            env_name: env_name.to_string(),
        })
}

/// [`resolve_api_key`] against the process environment.
pub fn resolve_api_key_from_env(explicit: Option<&str>, env_name: &str) -> Result<String, ConfigError> {
    resolve_api_key(explicit, env_name, |name| std::env::var(name).ok())
}

/// Container and codec of the exported track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    /// 16-bit PCM WAV.
    Wav,
    /// Constant-bitrate MP3.
    Mp3 { kbps: u32 },
}

impl OutputTarget {
    /// Choose the target from the output path's extension.
    ///
    /// The bitrate is validated even for WAV output so a typo is caught early.
    pub fn from_path(path: &Path, mp3_bitrate: &str) -> Result<Self, ConfigError> {
        let kbps = parse_bitrate(mp3_bitrate)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("wav") => Ok(OutputTarget::Wav),
            Some("mp3") => Ok(OutputTarget::Mp3 { kbps }),
            _ => Err(ConfigError::UnsupportedExtension {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>, AudioError> {
        match *self {
            OutputTarget::Wav => encode_wav(buffer),
            OutputTarget::Mp3 { kbps } => encode_mp3(buffer, kbps),
        }
    }
}

/// Parse a bitrate like `320k`, `192K` or `128` into kbps.
pub fn parse_bitrate(value: &str) -> Result<u32, ConfigError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_suffix(['k', 'K'])
        .unwrap_or(trimmed);
    digits
        .parse::<u32>()
        .ok()
        .filter(|kbps| MP3_BITRATES.contains(kbps))
        .ok_or_else(|| ConfigError::InvalidBitrate {
            value: value.to_string(),
        })
}

/// Parse a `NAME=VOICE_ID` pair.
pub fn parse_voice_spec(spec: &str) -> Result<(String, String), ConfigError> {
    match spec.split_once('=') {
        Some((name, id)) if !name.trim().is_empty() && !id.trim().is_empty() => {
            Ok((name.trim().to_string(), id.trim().to_string()))
        }
        _ => Err(ConfigError::VoiceSpec(spec.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn explicit_key_beats_environment() {
        let key = resolve_api_key(Some("sk-flag"), "ELEVENLABS_API_KEY", env(&[("ELEVENLABS_API_KEY", "sk-env")]));
        assert_eq!(key.unwrap(), "sk-flag");
    }

    #[test]
    fn falls_back_to_named_variable() {
        let lookup = env(&[("ELEVENLABS_API_KEY", "sk-default"), ("MY_KEY", "sk-custom")]);
        assert_eq!(resolve_api_key(None, "MY_KEY", &lookup).unwrap(), "sk-custom");
        assert_eq!(resolve_api_key(Some("  "), "ELEVENLABS_API_KEY", &lookup).unwrap(), "sk-default");
    }

    #[test]
    fn missing_key_names_the_variable() {
        let err = resolve_api_key(None, "MY_KEY", env(&[("MY_KEY", "")])).unwrap_err();
        assert!(matches!(&err, ConfigError::MissingApiKey { env_name } if env_name == "MY_KEY"));
        assert!(err.to_string().contains("--api-key <KEY>"));
    }

    #[test]
    fn output_target_follows_extension() {
        assert_eq!(OutputTarget::from_path(Path::new("a.WAV"), "320k").unwrap(), OutputTarget::Wav);
        assert_eq!(
            OutputTarget::from_path(Path::new("dir/a.mp3"), "192k").unwrap(),
            OutputTarget::Mp3 { kbps: 192 }
        );
        assert!(matches!(
            OutputTarget::from_path(Path::new("a.ogg"), "320k"),
            Err(ConfigError::UnsupportedExtension { .. })
        ));
        assert!(matches!(
            OutputTarget::from_path(Path::new("noext"), "320k"),
            Err(ConfigError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn parses_bitrates() {
        assert_eq!(parse_bitrate("320k").unwrap(), 320);
        assert_eq!(parse_bitrate("128").unwrap(), 128);
        assert_eq!(parse_bitrate(" 64K ").unwrap(), 64);
        assert!(parse_bitrate("100k").is_err());
        assert!(parse_bitrate("fast").is_err());
    }

    #[test]
    fn parses_voice_specs() {
        assert_eq!(
            parse_voice_spec("Brian=nPczCjzI2devNBz1zQrb").unwrap(),
            ("Brian".to_string(), "nPczCjzI2devNBz1zQrb".to_string())
        );
        assert!(parse_voice_spec("Brian").is_err());
        assert!(parse_voice_spec("=id").is_err());
    }
}
