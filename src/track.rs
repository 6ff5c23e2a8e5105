//! Breath-cycle track assembly.
//!
//! Every chant pair becomes one cycle of four slots: inhale speech, hold
//! silence, exhale speech, rest silence. Each slot is forced to its exact
//! duration, so a run of `n` chants always lasts `n * cycle_ms`.
//!
//! Slot boundaries are placed on a running millisecond clock rather than by
//! summing per-slot frame counts, which keeps sample rates that do not divide
//! evenly into milliseconds from drifting over long tracks.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::audio::decode::{decode, output_sample_rate, DEFAULT_SAMPLE_RATE};
use crate::audio::{clean_tail, fit_frames, AudioBuffer, AudioError, TailCleanParams};
use crate::chants::ChantPair;
use crate::config::{ConfigError, OutputTarget};
use crate::engines::SynthesisError;
use crate::voice::VoiceParams;
use crate::SynthesisEngine;

#[derive(thiserror::Error, Debug)]
pub enum TrackError {
    #[error("Synthesis failed for {label}: {source}")]
    Synthesis {
        label: String,
        #[source]
        source: SynthesisError,
    },
    #[error("Could not decode audio for {label}: {source}")]
    Decode {
        label: String,
        #[source]
        source: AudioError,
    },
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("Failed to write {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durations of the four phases of a breath cycle, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSpec {
    pub inhale_ms: u64,
    pub hold_ms: u64,
    pub exhale_ms: u64,
    pub rest_ms: u64,
}

impl TimingSpec {
    /// Validate signed user input; any negative phase is rejected.
    pub fn new(inhale_ms: i64, hold_ms: i64, exhale_ms: i64, rest_ms: i64) -> Result<Self, ConfigError> {
        let check = |name: &'static str, value: i64| {
            u64::try_from(value).map_err(|_| ConfigError::NegativeDuration { name, value })
        };
        Ok(Self {
            inhale_ms: check("inhale_ms", inhale_ms)?,
            hold_ms: check("hold_ms", hold_ms)?,
            exhale_ms: check("exhale_ms", exhale_ms)?,
            rest_ms: check("rest_ms", rest_ms)?,
        })
    }

    /// Length of one full cycle.
    pub fn cycle_ms(&self) -> u64 {
        self.inhale_ms + self.hold_ms + self.exhale_ms + self.rest_ms
    }
}

/// The output buffer of a build, grown one slot at a time.
#[derive(Debug, Clone)]
pub struct Track {
    buffer: AudioBuffer,
    elapsed_ms: u64,
}

impl Track {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            buffer: AudioBuffer::empty(sample_rate, channels),
            elapsed_ms: 0,
        }
    }

    /// Fit `clip` to a slot of `slot_ms` and append it.
    ///
    /// The clip is converted to the track's layout first. Overruns are
    /// trimmed with a warning naming `label`.
    pub fn push_slot(&mut self, clip: AudioBuffer, slot_ms: u64, label: &str) -> Result<(), AudioError> {
        let clip = clip.conform(self.buffer.sample_rate(), self.buffer.channels());
        self.elapsed_ms += slot_ms;
        let end = self.buffer.ms_to_frames(self.elapsed_ms);
        let frames = end.saturating_sub(self.buffer.frames());
        self.buffer.append(fit_frames(clip, frames, slot_ms, label))
    }

    /// Append `slot_ms` of silence.
    pub fn push_silence(&mut self, slot_ms: u64) -> Result<(), AudioError> {
        let silence = self.buffer.silent_like(0);
        self.push_slot(silence, slot_ms, "silence")
    }

    pub fn duration_ms(&self) -> u64 {
        self.buffer.duration_ms()
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> AudioBuffer {
        self.buffer
    }

    /// Encode the track and write it to `path`.
    ///
    /// The bytes land in a temporary file next to `path` that is renamed over
    /// it once complete, so a failed export never leaves a partial file.
    pub fn export(&self, path: &Path, target: OutputTarget) -> Result<(), TrackError> {
        let bytes = target.encode(&self.buffer)?;
        let export_err = |source: std::io::Error| TrackError::Export {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(export_err)?;
        tmp.write_all(&bytes).map_err(export_err)?;
        tmp.flush().map_err(export_err)?;
        tmp.persist(path).map_err(|e| export_err(e.error))?;

        log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// Builds breath-paced tracks from a synthesis engine.
///
/// Calls are strictly sequential: the inhale clip of a chant is synthesized
/// and placed before its exhale clip is requested. The first failure aborts
/// the build and the partial track is dropped.
pub struct TrackBuilder<E> {
    engine: E,
    voice: VoiceParams,
    timing: TimingSpec,
    clean: TailCleanParams,
}

impl<E> TrackBuilder<E>
where
    E: SynthesisEngine<SynthesisParams = VoiceParams>,
{
    pub fn new(engine: E, voice: VoiceParams, timing: TimingSpec) -> Self {
        Self {
            engine,
            voice,
            timing,
            clean: TailCleanParams::default(),
        }
    }

    /// Override the tail cleaner's tuning.
    pub fn tail_clean(mut self, params: TailCleanParams) -> Self {
        self.clean = params;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Sample rate of the track, taken from the voice's output format.
    pub fn sample_rate(&self) -> u32 {
        output_sample_rate(&self.voice.output_format).unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Synthesize every chant and assemble the track.
    pub fn build(&mut self, chants: &[ChantPair]) -> Result<Track, TrackError> {
        let mut track = Track::new(self.sample_rate(), 1);
        let total = chants.len();
        let timing = self.timing;

        for (i, chant) in chants.iter().enumerate() {
            log::info!("[{}/{}] {} / {}", i + 1, total, chant.inhale(), chant.exhale());

            let label = format!("inhale: {}", chant.inhale());
            let inhale = self.clip(&label, chant.inhale())?;
            track.push_slot(inhale, timing.inhale_ms, &label)?;
            track.push_silence(timing.hold_ms)?;

            let label = format!("exhale: {}", chant.exhale());
            let exhale = self.clip(&label, chant.exhale())?;
            track.push_slot(exhale, timing.exhale_ms, &label)?;
            track.push_silence(timing.rest_ms)?;
        }

        log::info!("Built {} cycles, {}ms", total, track.duration_ms());
        Ok(track)
    }

    /// Synthesize, decode and tail-clean one phrase.
    fn clip(&mut self, label: &str, text: &str) -> Result<AudioBuffer, TrackError> {
        let bytes = self
            .engine
            .synthesize(text, &self.voice)
            .map_err(|source| TrackError::Synthesis {
                label: label.to_string(),
                source,
            })?;
        let decoded = decode(&bytes, &self.voice.output_format).map_err(|source| TrackError::Decode {
            label: label.to_string(),
            source,
        })?;
        let raw_ms = decoded.duration_ms();
        let cleaned = clean_tail(decoded.conform(self.sample_rate(), 1), &self.clean);
        log::debug!("{label}: {raw_ms}ms raw, {}ms after tail clean", cleaned.duration_ms());
        Ok(cleaned)
    }
}

/// Build a track with default tail cleaning.
///
/// Pass `&mut engine` to keep using the engine afterwards.
pub fn build_track<E>(
    chants: &[ChantPair],
    timing: TimingSpec,
    voice: &VoiceParams,
    engine: E,
) -> Result<Track, TrackError>
where
    E: SynthesisEngine<SynthesisParams = VoiceParams>,
{
    TrackBuilder::new(engine, voice.clone(), timing).build(chants)
}
