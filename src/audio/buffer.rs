use super::AudioError;

/// Decoded PCM audio held as interleaved `f32` frames.
///
/// Durations are measured in whole milliseconds: a buffer of `n` frames at
/// `rate` Hz lasts `round(n * 1000 / rate)` ms, and a millisecond offset maps
/// back to frame `round(ms * rate / 1000)`. At any sample rate above 1 kHz
/// these two mappings round-trip, so a buffer cut or padded to `t` ms always
/// reports a duration of exactly `t` ms.
///
/// Transformations take `self` by value and hand back the result, so a buffer
/// is owned by exactly one pipeline stage at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Wrap interleaved samples.
    ///
    /// Fails if the layout is degenerate or the sample count is not a whole
    /// number of frames.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        if sample_rate == 0 || channels == 0 {
            return Err(AudioError::InvalidLayout {
                sample_rate,
                channels,
            });
        }
        if samples.len() % channels as usize != 0 {
            return Err(AudioError::PartialFrame {
                samples: samples.len(),
                channels,
            });
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// A zero-length buffer with the given layout.
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    /// Digital silence lasting `duration_ms`.
    pub fn silent(duration_ms: u64, sample_rate: u32, channels: u16) -> Self {
        let mut buffer = Self::empty(sample_rate, channels);
        let frames = buffer.ms_to_frames(duration_ms);
        buffer.samples = vec![0.0; frames * buffer.channels as usize];
        buffer
    }

    /// Silence with this buffer's layout.
    pub fn silent_like(&self, duration_ms: u64) -> Self {
        Self::silent(duration_ms, self.sample_rate, self.channels)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration rounded to the nearest millisecond.
    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(self.frames(), self.sample_rate)
    }

    /// Frame index corresponding to a millisecond offset.
    pub fn ms_to_frames(&self, ms: u64) -> usize {
        ms_to_frames(ms, self.sample_rate)
    }

    /// Copy out `[start_ms, end_ms)`, clamped to the buffer.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> Self {
        let frames = self.frames();
        let start = self.ms_to_frames(start_ms).min(frames);
        let end = self.ms_to_frames(end_ms).clamp(start, frames);
        let ch = self.channels as usize;
        Self {
            samples: self.samples[start * ch..end * ch].to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Keep at most the first `frames` frames.
    pub fn truncate_frames(mut self, frames: usize) -> Self {
        self.samples.truncate(frames * self.channels as usize);
        self
    }

    /// Keep at most the first `ms` milliseconds.
    pub fn truncate_ms(self, ms: u64) -> Self {
        let frames = self.ms_to_frames(ms);
        self.truncate_frames(frames)
    }

    /// Append `frames` frames of silence.
    pub fn pad_frames(mut self, frames: usize) -> Self {
        let len = self.samples.len() + frames * self.channels as usize;
        self.samples.resize(len, 0.0);
        self
    }

    /// Concatenate `other` onto the end of this buffer.
    pub fn append(&mut self, other: AudioBuffer) -> Result<(), AudioError> {
        if other.sample_rate != self.sample_rate || other.channels != self.channels {
            return Err(AudioError::LayoutMismatch {
                expected: (self.sample_rate, self.channels),
                found: (other.sample_rate, other.channels),
            });
        }
        if self.samples.is_empty() {
            self.samples = other.samples;
        } else {
            self.samples.extend_from_slice(&other.samples);
        }
        Ok(())
    }

    /// Ramp the final `ms` milliseconds linearly down to silence.
    ///
    /// The window is clamped to the buffer length; the last frame ends at zero.
    pub fn fade_out(mut self, ms: u64) -> Self {
        let frames = self.frames();
        let window = self.ms_to_frames(ms).min(frames);
        if window == 0 {
            return self;
        }

        let ch = self.channels as usize;
        let start = frames - window;
        for i in 0..window {
            let gain = 1.0 - (i + 1) as f32 / window as f32;
            let offset = (start + i) * ch;
            for sample in &mut self.samples[offset..offset + ch] {
                *sample *= gain;
            }
        }
        self
    }

    /// Root-mean-square level over every sample, full scale = 1.0.
    pub fn rms(&self) -> f64 {
        rms(&self.samples)
    }

    /// Average loudness in dBFS; `-inf` for an empty or all-zero buffer.
    pub fn dbfs(&self) -> f64 {
        amplitude_to_db(self.rms())
    }

    /// Average all channels down to one.
    pub fn into_mono(self) -> Self {
        if self.channels == 1 {
            return self;
        }
        let ch = self.channels as usize;
        let samples = self
            .samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect();
        Self {
            samples,
            sample_rate: self.sample_rate,
            channels: 1,
        }
    }

    /// Copy a mono signal into `channels` identical channels.
    fn upmix(self, channels: u16) -> Self {
        debug_assert_eq!(self.channels, 1);
        let ch = channels as usize;
        let mut samples = Vec::with_capacity(self.samples.len() * ch);
        for s in self.samples {
            samples.extend(std::iter::repeat(s).take(ch));
        }
        Self {
            samples,
            sample_rate: self.sample_rate,
            channels,
        }
    }

    /// Linear-interpolation resample of a mono buffer.
    fn resample_mono(self, dst_rate: u32) -> Self {
        debug_assert_eq!(self.channels, 1);
        if self.sample_rate == dst_rate || self.samples.is_empty() {
            return Self {
                sample_rate: dst_rate,
                ..self
            };
        }

        let input = &self.samples;
        let src_rate = self.sample_rate as f64;
        let duration = input.len() as f64 / src_rate;
        let n_out = (duration * dst_rate as f64).round() as usize;
        let last = input.len() - 1;
        let mut out = Vec::with_capacity(n_out);
        for i in 0..n_out {
            let pos = i as f64 / dst_rate as f64 * src_rate;
            let idx = (pos.floor() as usize).min(last);
            let frac = pos - idx as f64;
            let x0 = input[idx] as f64;
            let x1 = input[(idx + 1).min(last)] as f64;
            out.push(((1.0 - frac) * x0 + frac * x1) as f32);
        }

        Self {
            samples: out,
            sample_rate: dst_rate,
            channels: 1,
        }
    }

    /// Convert to the given layout, downmixing and resampling as needed.
    pub fn conform(self, sample_rate: u32, channels: u16) -> Self {
        if self.sample_rate == sample_rate && self.channels == channels {
            return self;
        }
        log::debug!(
            "Converting clip from {} Hz/{} ch to {} Hz/{} ch",
            self.sample_rate,
            self.channels,
            sample_rate,
            channels
        );
        let mono = self.into_mono().resample_mono(sample_rate.max(1));
        if channels > 1 {
            mono.upmix(channels)
        } else {
            mono
        }
    }
}

pub(crate) fn ms_to_frames(ms: u64, sample_rate: u32) -> usize {
    ((ms as u128 * sample_rate as u128 + 500) / 1000) as usize
}

pub(crate) fn frames_to_ms(frames: usize, sample_rate: u32) -> u64 {
    let rate = sample_rate.max(1) as u128;
    ((frames as u128 * 1000 + rate / 2) / rate) as u64
}

pub(crate) fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

pub(crate) fn amplitude_to_db(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * amplitude.log10()
    }
}

pub(crate) fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}
