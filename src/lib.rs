//! # chant-rs
//!
//! A Rust library for assembling breath-paced chant recordings from a
//! text-to-speech provider.
//!
//! ## Features
//!
//! - **Timed tracks**: every breath cycle is inhale speech, hold silence,
//!   exhale speech and rest silence, each forced to an exact duration
//! - **Tail cleaning**: trailing synthesis noise is detected and cut before
//!   a clip is fitted to its slot
//! - **CSV chant lists**: `inhale`/`exhale` columns with optional repeats
//! - **ElevenLabs**: blocking HTTP engine behind the [`SynthesisEngine`] trait
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! chant-rs = { version = "2026.10", features = ["elevenlabs"] }
//! ```
//!
//! ```ignore
//! use std::path::Path;
//! use chant_rs::{
//!     chants::load_chants, config::OutputTarget, engines::elevenlabs::ElevenLabsEngine,
//!     TimingSpec, TrackBuilder, VoiceParamsBuilder,
//! };
//!
//! let chants = load_chants(Path::new("chants.csv"))?;
//! let voice = VoiceParamsBuilder::default().voice_id("nPczCjzI2devNBz1zQrb").build()?;
//! let timing = TimingSpec::new(4000, 4000, 4000, 4000)?;
//! let engine = ElevenLabsEngine::new(std::env::var("ELEVENLABS_API_KEY")?)?;
//!
//! let track = TrackBuilder::new(engine, voice, timing).build(&chants)?;
//! track.export(Path::new("timed.mp3"), OutputTarget::Mp3 { kbps: 320 })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod chants;
pub mod config;
pub mod engines;
pub mod sample;
pub mod track;
pub mod troubleshoot;
pub mod voice;

pub use audio::{AudioBuffer, AudioError, TailCleanParams};
pub use chants::{ChantError, ChantPair};
pub use config::ConfigError;
pub use engines::SynthesisError;
pub use track::{build_track, TimingSpec, Track, TrackBuilder, TrackError};
pub use voice::{TextNormalization, VoiceParams, VoiceParamsBuilder};

/// Common interface for text-to-speech providers.
///
/// An engine turns one phrase into the provider's encoded audio bytes. It is
/// called once per phrase, strictly in order, and any error aborts the
/// caller's run; engines do not retry.
pub trait SynthesisEngine {
    /// Parameters passed unchanged to every call (voice, model, format, ...)
    type SynthesisParams;

    /// Synthesize `text` and return the encoded audio.
    fn synthesize(
        &mut self,
        text: &str,
        params: &Self::SynthesisParams,
    ) -> Result<Vec<u8>, SynthesisError>;
}

impl<E: SynthesisEngine + ?Sized> SynthesisEngine for &mut E {
    type SynthesisParams = E::SynthesisParams;

    fn synthesize(
        &mut self,
        text: &str,
        params: &Self::SynthesisParams,
    ) -> Result<Vec<u8>, SynthesisError> {
        (**self).synthesize(text, params)
    }
}

/// Top-level failure of a chant run, grouped by how the process should exit.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Chants(#[from] ChantError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

impl Error {
    /// Exit status for the `chant` binary.
    ///
    /// 2 for bad configuration or chant sources, 3 when the speech service
    /// could not be reached, 1 for anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) | Error::Chants(_) => 2,
            _ if self.is_connectivity() => 3,
            _ => 1,
        }
    }

    /// True when the run failed because the speech service was unreachable.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Error::Track(TrackError::Synthesis { source, .. }) | Error::Synthesis(source) => {
                source.is_connectivity()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_class() {
        let config = Error::from(ConfigError::MissingApiKey {
            env_name: "ELEVENLABS_API_KEY".into(),
        });
        assert_eq!(config.exit_code(), 2);

        assert_eq!(Error::from(ChantError::Empty).exit_code(), 2);

        let offline = Error::from(TrackError::Synthesis {
            label: "inhale: so".into(),
            source: SynthesisError::Connectivity("dns error".into()),
        });
        assert_eq!(offline.exit_code(), 3);
        assert!(offline.is_connectivity());

        let rejected = Error::from(SynthesisError::Api {
            status: 401,
            message: "invalid api key".into(),
        });
        assert_eq!(rejected.exit_code(), 1);
    }
}
