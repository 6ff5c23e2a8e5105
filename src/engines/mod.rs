//! Speech synthesis engines.
//!
//! This module contains the text-to-speech providers a chant track can be
//! built from.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `elevenlabs` - ElevenLabs HTTP API (blocking reqwest client)

#[cfg(feature = "elevenlabs")]
pub mod elevenlabs;

#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("Unable to connect to the speech service: {0}")]
    Connectivity(String),
    #[error("Speech service rejected the request (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Speech service returned no audio")]
    EmptyResponse,
    #[error("Invalid synthesis request: {0}")]
    InvalidRequest(String),
}

impl SynthesisError {
    /// DNS, connect, timeout and transport failures; the cases proxy hints help with.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SynthesisError::Connectivity(_))
    }
}
