use std::io::Cursor;

use mp3lame_encoder::{max_required_buffer_size, Bitrate, Builder, FlushNoGap, MonoPcm, Quality};

use super::{AudioBuffer, AudioError};

/// Bitrates (kbps) LAME accepts for constant-bitrate output.
pub const MP3_BITRATES: &[u32] = &[
    8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Frames handed to LAME per call.
const MP3_CHUNK_FRAMES: usize = 1152 * 64;

/// Encode as a 16-bit PCM WAV file.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>, AudioError> {
    let spec = hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in buffer.samples() {
            writer.write_sample(to_i16(sample))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Encode as constant-bitrate mono MP3.
///
/// Multi-channel input is downmixed first.
pub fn encode_mp3(buffer: &AudioBuffer, kbps: u32) -> Result<Vec<u8>, AudioError> {
    let bitrate = lame_bitrate(kbps).ok_or(AudioError::UnsupportedBitrate(kbps))?;
    let buffer = buffer.clone().into_mono();

    let mut builder = Builder::new().ok_or_else(|| AudioError::Mp3("LAME allocation failed".into()))?;
    builder
        .set_num_channels(1)
        .map_err(|e| AudioError::Mp3(format!("channels: {e:?}")))?;
    builder
        .set_sample_rate(buffer.sample_rate())
        .map_err(|e| AudioError::Mp3(format!("sample rate {}: {e:?}", buffer.sample_rate())))?;
    builder
        .set_brate(bitrate)
        .map_err(|e| AudioError::Mp3(format!("bitrate: {e:?}")))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| AudioError::Mp3(format!("quality: {e:?}")))?;
    let mut encoder = builder
        .build()
        .map_err(|e| AudioError::Mp3(format!("init: {e:?}")))?;

    let pcm: Vec<i16> = buffer.samples().iter().map(|&s| to_i16(s)).collect();
    let mut out = Vec::new();

    // The *_to_vec helpers only write into spare capacity, so room is
    // reserved up front for each call.
    for chunk in pcm.chunks(MP3_CHUNK_FRAMES) {
        out.reserve(max_required_buffer_size(chunk.len()));
        encoder
            .encode_to_vec(MonoPcm(chunk), &mut out)
            .map_err(|e| AudioError::Mp3(format!("encode: {e:?}")))?;
    }

    out.reserve(max_required_buffer_size(0));
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(|e| AudioError::Mp3(format!("flush: {e:?}")))?;

    Ok(out)
}

fn lame_bitrate(kbps: u32) -> Option<Bitrate> {
    let bitrate = match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        _ => return None,
    };
    Some(bitrate)
}

fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}
