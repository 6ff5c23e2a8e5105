//! Voice auditions: one phrase rendered with several voices.
//!
//! The provider's bytes are written untouched, one file per voice, so the
//! files can be played back to pick a voice before building a track.

use std::fs;
use std::path::{Path, PathBuf};

use crate::voice::VoiceParams;
use crate::{Error, SynthesisEngine};

/// File extension for a provider output format.
pub fn extension_for(output_format: &str) -> &'static str {
    let lower = output_format.to_ascii_lowercase();
    if lower.starts_with("pcm") {
        "pcm"
    } else if lower.starts_with("wav") {
        "wav"
    } else {
        "mp3"
    }
}

/// Synthesize `text` once per `(name, voice_id)` and save each result as
/// `<out_dir>/<name>.<ext>`.
///
/// `base` supplies every setting except the voice id. Stops at the first
/// failure; files already written are kept.
pub fn sample_voices<E>(
    mut engine: E,
    text: &str,
    voices: &[(String, String)],
    base: &VoiceParams,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, Error>
where
    E: SynthesisEngine<SynthesisParams = VoiceParams>,
{
    fs::create_dir_all(out_dir).map_err(|source| crate::TrackError::Export {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let ext = extension_for(&base.output_format);
    let mut saved = Vec::with_capacity(voices.len());
    for (name, voice_id) in voices {
        let params = VoiceParams {
            voice_id: voice_id.clone(),
            ..base.clone()
        };
        log::info!("Sampling voice {name} ({voice_id})");
        let audio = engine.synthesize(text, &params)?;

        let path = out_dir.join(format!("{name}.{ext}"));
        fs::write(&path, &audio).map_err(|source| crate::TrackError::Export {
            path: path.clone(),
            source,
        })?;
        saved.push(path);
    }
    Ok(saved)
}
