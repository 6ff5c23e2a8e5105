use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;

use crate::engines::SynthesisError;
use crate::voice::VoiceParams;
use crate::SynthesisEngine;

use super::request::{api_error_message, TtsRequest};

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

const XI_API_KEY_HEADER: &str = "xi-api-key";

/// ElevenLabs text-to-speech over HTTPS.
///
/// Each [`synthesize`](SynthesisEngine::synthesize) call is one blocking
/// `POST /v1/text-to-speech/{voice_id}`; the streamed response body is
/// collected into a single byte vector. Requests are never retried.
///
/// ```rust,no_run
/// use chant_rs::{SynthesisEngine, VoiceParamsBuilder};
/// use chant_rs::engines::elevenlabs::ElevenLabsEngine;
///
/// let mut engine = ElevenLabsEngine::new(std::env::var("ELEVENLABS_API_KEY")?)?;
/// let voice = VoiceParamsBuilder::default().voice_id("nPczCjzI2devNBz1zQrb").build()?;
/// let mp3 = engine.synthesize("Om namah shivaya", &voice)?;
/// std::fs::write("om.mp3", mp3)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ElevenLabsEngine {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl std::fmt::Debug for ElevenLabsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsEngine")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ElevenLabsEngine {
    /// Create an engine against the production API.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SynthesisError::InvalidRequest(format!("HTTP client: {e}")))?;
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| SynthesisError::InvalidRequest(format!("base URL: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
        })
    }

    /// Point the engine at another host, e.g. a proxy or a local mock.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, SynthesisError> {
        let url = Url::parse(base_url.trim())
            .map_err(|e| SynthesisError::InvalidRequest(format!("base URL '{base_url}': {e}")))?;
        if url.cannot_be_a_base() {
            return Err(SynthesisError::InvalidRequest(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full request URL for one voice and output format.
    pub fn endpoint(&self, voice_id: &str, output_format: &str) -> Result<Url, SynthesisError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SynthesisError::InvalidRequest("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["v1", "text-to-speech", voice_id]);
        url.query_pairs_mut().append_pair("output_format", output_format);
        Ok(url)
    }
}

impl SynthesisEngine for ElevenLabsEngine {
    type SynthesisParams = VoiceParams;

    fn synthesize(&mut self, text: &str, params: &VoiceParams) -> Result<Vec<u8>, SynthesisError> {
        let url = self.endpoint(&params.voice_id, &params.output_format)?;
        log::debug!("POST {} ({} chars)", url.path(), text.chars().count());

        let mut response = self
            .client
            .post(url)
            .header(XI_API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "audio/*")
            .json(&TtsRequest::new(text, params))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().map(|b| b.to_vec()).unwrap_or_default();
            return Err(SynthesisError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let mut audio = Vec::new();
        response
            .read_to_end(&mut audio)
            .map_err(|e| SynthesisError::Connectivity(error_chain(&e)))?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }
        log::debug!("Received {} bytes", audio.len());
        Ok(audio)
    }
}

fn transport_error(err: reqwest::Error) -> SynthesisError {
    if err.is_builder() {
        SynthesisError::InvalidRequest(error_chain(&err))
    } else {
        SynthesisError::Connectivity(error_chain(&err))
    }
}

/// An error and all of its sources, joined with `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
