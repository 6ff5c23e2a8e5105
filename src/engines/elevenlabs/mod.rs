//! ElevenLabs text-to-speech engine.
//!
//! A thin blocking client for the `text-to-speech` endpoint. Voice, model,
//! output format and voice settings come from [`VoiceParams`](crate::VoiceParams);
//! the engine only adds the API key and the base URL.
//!
//! # Errors
//!
//! | Failure | Error |
//! |---|---|
//! | DNS, connect, TLS, timeout, broken body stream | [`SynthesisError::Connectivity`](crate::SynthesisError::Connectivity) |
//! | Non-2xx status (bad key, unknown voice, quota) | [`SynthesisError::Api`](crate::SynthesisError::Api) |
//! | 2xx with an empty body | [`SynthesisError::EmptyResponse`](crate::SynthesisError::EmptyResponse) |
//!
//! Only connectivity failures are worth showing proxy hints for; see
//! [`troubleshoot`](crate::troubleshoot).

mod engine;
mod request;

pub use engine::{ElevenLabsEngine, DEFAULT_BASE_URL};
