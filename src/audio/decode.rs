use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::{AudioBuffer, AudioError};

/// Sample rate assumed when an output format string does not carry one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Container family of the bytes returned by the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedFormat {
    Mp3,
    Wav,
}

impl EncodedFormat {
    /// Classify a provider output format such as `mp3_44100_128` or `pcm_16000`.
    ///
    /// `mp3*` decodes as MP3, `pcm*` and `wav*` as WAV; anything else is
    /// attempted as MP3.
    pub fn from_output_format(output_format: &str) -> Self {
        let lower = output_format.to_ascii_lowercase();
        if lower.starts_with("pcm") || lower.starts_with("wav") {
            EncodedFormat::Wav
        } else {
            EncodedFormat::Mp3
        }
    }
}

/// Sample rate encoded in a provider output format (`mp3_22050_32` → 22050).
pub fn output_sample_rate(output_format: &str) -> Option<u32> {
    output_format
        .split('_')
        .nth(1)
        .and_then(|rate| rate.parse().ok())
        .filter(|&rate| rate > 0)
}

/// Decode synthesizer output into PCM.
pub fn decode(bytes: &[u8], output_format: &str) -> Result<AudioBuffer, AudioError> {
    match EncodedFormat::from_output_format(output_format) {
        EncodedFormat::Mp3 => decode_mp3(bytes),
        EncodedFormat::Wav if bytes.starts_with(b"RIFF") => decode_wav(bytes),
        EncodedFormat::Wav if output_format.to_ascii_lowercase().starts_with("pcm") => {
            // pcm_* responses are headerless 16-bit little-endian mono
            let rate = output_sample_rate(output_format).unwrap_or(DEFAULT_SAMPLE_RATE);
            decode_raw_pcm16(bytes, rate)
        }
        EncodedFormat::Wav => decode_wav(bytes),
    }
}

/// Decode an in-memory RIFF/WAVE file.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer, AudioError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    AudioBuffer::new(samples, spec.sample_rate, spec.channels)
}

/// Interpret headerless signed 16-bit little-endian mono PCM.
pub fn decode_raw_pcm16(bytes: &[u8], sample_rate: u32) -> Result<AudioBuffer, AudioError> {
    if bytes.len() % 2 != 0 {
        log::warn!("Raw PCM payload has an odd byte count, dropping the last byte");
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    AudioBuffer::new(samples, sample_rate, 1)
}

/// Decode an in-memory MP3 stream, keeping its channel layout.
pub fn decode_mp3(bytes: &[u8]) -> Result<AudioBuffer, AudioError> {
    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;
    let track_id = track.id;
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping corrupt MP3 frame: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count() as u16);

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    let (Some(sample_rate), Some(channels)) = (sample_rate, channels) else {
        return Err(AudioError::NoAudioTrack);
    };
    AudioBuffer::new(samples, sample_rate, channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn classifies_output_formats() {
        assert_eq!(EncodedFormat::from_output_format("mp3_44100_128"), EncodedFormat::Mp3);
        assert_eq!(EncodedFormat::from_output_format("PCM_16000"), EncodedFormat::Wav);
        assert_eq!(EncodedFormat::from_output_format("wav_44100"), EncodedFormat::Wav);
        assert_eq!(EncodedFormat::from_output_format("opus_48000_64"), EncodedFormat::Mp3);
        assert_eq!(EncodedFormat::from_output_format(""), EncodedFormat::Mp3);
    }

    #[test]
    fn reads_sample_rate_from_output_format() {
        assert_eq!(output_sample_rate("mp3_22050_32"), Some(22050));
        assert_eq!(output_sample_rate("pcm_16000"), Some(16000));
        assert_eq!(output_sample_rate("mp3"), None);
        assert_eq!(output_sample_rate("ulaw_x"), None);
    }

    #[test]
    fn decodes_wav_container() {
        let bytes = wav_bytes(&[0, 16384, -16384, 0], 8000, 2);
        let buf = decode(&bytes, "wav_8000").unwrap();
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.sample_rate(), 8000);
        assert_eq!(buf.samples(), &[0.0, 0.5, -0.5, 0.0]);
    }

    #[test]
    fn decodes_headerless_pcm_at_format_rate() {
        let bytes: Vec<u8> = [0i16, 16384, -32768]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let buf = decode(&bytes, "pcm_24000").unwrap();
        assert_eq!(buf.sample_rate(), 24000);
        assert_eq!(buf.samples(), &[0.0, 0.5, -1.0]);
    }

    #[test]
    fn pcm_format_still_accepts_riff_payload() {
        let bytes = wav_bytes(&[0; 160], 16000, 1);
        let buf = decode(&bytes, "pcm_44100").unwrap();
        assert_eq!(buf.sample_rate(), 16000);
        assert_eq!(buf.duration_ms(), 10);
    }

    #[test]
    fn garbage_mp3_is_an_error() {
        assert!(decode(b"definitely not audio", "mp3_44100_128").is_err());
    }
}
