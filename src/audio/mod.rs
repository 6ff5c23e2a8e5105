//! PCM buffers and the signal-level stages of the chant pipeline.
//!
//! Clips flow through a fixed sequence: [`decode`](decode::decode) the
//! synthesizer's bytes, [`clean_tail`] to drop trailing synthesis noise, then
//! [`fit_to`] a slot. The finished track is written with [`encode`].

pub mod buffer;
pub mod decode;
pub mod encode;
pub mod fit;
pub mod silence;

pub use buffer::AudioBuffer;
pub use decode::EncodedFormat;
pub use fit::{fit_frames, fit_to};
pub use silence::{clean_tail, detect_nonsilent, TailCleanParams};

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("Invalid audio layout: {sample_rate} Hz, {channels} channel(s)")]
    InvalidLayout { sample_rate: u32, channels: u16 },
    #[error("{samples} samples do not divide into {channels}-channel frames")]
    PartialFrame { samples: usize, channels: u16 },
    #[error("Cannot join {found:?} audio onto a {expected:?} (Hz, channels) buffer")]
    LayoutMismatch {
        expected: (u32, u16),
        found: (u32, u16),
    },
    #[error("Target duration must be >= 0 (got {0}ms)")]
    NegativeDuration(i64),
    #[error("MP3 decode error: {0}")]
    Symphonia(#[from] symphonia::core::errors::Error),
    #[error("No decodable audio track in synthesizer output")]
    NoAudioTrack,
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported MP3 bitrate: {0}k")]
    UnsupportedBitrate(u32),
    #[error("MP3 encode error: {0}")]
    Mp3(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
