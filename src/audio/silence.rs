use std::ops::Range;

use super::buffer::{db_to_amplitude, AudioBuffer};

/// Tuning for [`clean_tail`].
///
/// The defaults were tuned by ear against neural TTS output; none of them
/// has a derivation beyond that, so every value can be overridden.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailCleanParams {
    /// Lowest threshold (dBFS) ever used to classify audio as silent.
    pub floor_db: f64,
    /// How far below the clip's average loudness silence starts (dB).
    pub margin_db: f64,
    /// Gaps shorter than this stay inside one spoken run (ms).
    pub min_silence_ms: u64,
    /// Audio kept after the last spoken run to preserve natural decay (ms).
    pub cushion_ms: u64,
    /// Length of the linear fade applied at the cut (ms).
    pub fade_ms: u64,
}

impl Default for TailCleanParams {
    fn default() -> Self {
        Self {
            floor_db: -45.0,
            margin_db: 20.0,
            min_silence_ms: 180,
            cushion_ms: 60,
            fade_ms: 120,
        }
    }
}

impl TailCleanParams {
    /// Silence threshold for a clip with the given average loudness.
    pub fn threshold_db(&self, average_dbfs: f64) -> f64 {
        self.floor_db.max(average_dbfs - self.margin_db)
    }
}

/// Cut trailing synthesis noise from a clip.
///
/// Keeps everything up to the end of the last non-silent run plus the
/// cushion, then fades the cut to silence. A clip with no non-silent run at
/// all is pure noise and comes back empty.
pub fn clean_tail(buffer: AudioBuffer, params: &TailCleanParams) -> AudioBuffer {
    let len_ms = buffer.duration_ms();
    if len_ms == 0 {
        return buffer;
    }

    let threshold = params.threshold_db(buffer.dbfs());
    let runs = detect_nonsilent(&buffer, params.min_silence_ms, threshold);

    let Some(last) = runs.last() else {
        log::debug!("Clip of {len_ms}ms has no speech above {threshold:.1} dBFS, dropping it");
        return AudioBuffer::empty(buffer.sample_rate(), buffer.channels());
    };

    let end_ms = len_ms.min(last.end + params.cushion_ms);
    if end_ms < len_ms {
        log::debug!("Trimmed {}ms of tail noise", len_ms - end_ms);
    }
    buffer.truncate_ms(end_ms).fade_out(params.fade_ms)
}

/// Millisecond ranges whose level stays above `threshold_db`.
///
/// A window of `min_silence_ms` is slid across the clip one millisecond at a
/// time. Window positions at or below the threshold are silent; overlapping
/// silent windows merge into silent ranges, and the non-silent runs are the
/// gaps between them. A clip shorter than the window is one run.
pub fn detect_nonsilent(
    buffer: &AudioBuffer,
    min_silence_ms: u64,
    threshold_db: f64,
) -> Vec<Range<u64>> {
    let len_ms = buffer.duration_ms();
    let silent = detect_silence(buffer, min_silence_ms, threshold_db);

    let Some(first) = silent.first() else {
        return vec![0..len_ms];
    };
    if first.start == 0 && first.end == len_ms {
        return Vec::new();
    }

    let mut runs = Vec::with_capacity(silent.len() + 1);
    let mut prev_end = 0;
    for range in &silent {
        runs.push(prev_end..range.start);
        prev_end = range.end;
    }
    if prev_end != len_ms {
        runs.push(prev_end..len_ms);
    }
    if runs.first() == Some(&(0..0)) {
        runs.remove(0);
    }
    runs
}

/// Millisecond ranges at or below `threshold_db` for at least `min_silence_ms`.
pub fn detect_silence(
    buffer: &AudioBuffer,
    min_silence_ms: u64,
    threshold_db: f64,
) -> Vec<Range<u64>> {
    let len_ms = buffer.duration_ms();
    if len_ms < min_silence_ms {
        return Vec::new();
    }

    let threshold = db_to_amplitude(threshold_db);
    let energy = FrameEnergy::new(buffer);

    let last_start = len_ms - min_silence_ms;
    let starts = (0..=last_start).filter(|&i| {
        let from = buffer.ms_to_frames(i);
        let to = buffer.ms_to_frames(i + min_silence_ms);
        energy.rms(from, to) <= threshold
    });

    let mut ranges = Vec::new();
    let mut current: Option<(u64, u64)> = None;
    for start in starts {
        current = match current {
            None => Some((start, start)),
            Some((range_start, prev)) => {
                let continuous = start == prev + 1;
                let has_gap = start > prev + min_silence_ms;
                if !continuous && has_gap {
                    ranges.push(range_start..prev + min_silence_ms);
                    Some((start, start))
                } else {
                    Some((range_start, start))
                }
            }
        };
    }
    if let Some((range_start, prev)) = current {
        ranges.push(range_start..prev + min_silence_ms);
    }
    ranges
}

/// Prefix sums of squared samples, one entry per frame boundary.
struct FrameEnergy {
    prefix: Vec<f64>,
    channels: usize,
}

impl FrameEnergy {
    fn new(buffer: &AudioBuffer) -> Self {
        let channels = buffer.channels() as usize;
        let mut prefix = Vec::with_capacity(buffer.frames() + 1);
        let mut acc = 0.0;
        prefix.push(acc);
        for frame in buffer.samples().chunks_exact(channels) {
            acc += frame.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>();
            prefix.push(acc);
        }
        Self { prefix, channels }
    }

    fn rms(&self, from: usize, to: usize) -> f64 {
        let last = self.prefix.len() - 1;
        let (from, to) = (from.min(last), to.min(last));
        if to <= from {
            return 0.0;
        }
        let count = ((to - from) * self.channels) as f64;
        ((self.prefix[to] - self.prefix[from]).max(0.0) / count).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    /// Concatenate (level, ms) segments of a 440 Hz tone; level 0.0 is silence.
    fn segments(parts: &[(f32, u64)]) -> AudioBuffer {
        let mut out = AudioBuffer::empty(RATE, 1);
        for &(level, ms) in parts {
            let frames = out.ms_to_frames(ms);
            let samples = (0..frames)
                .map(|i| {
                    let t = i as f32 / RATE as f32;
                    (t * 440.0 * std::f32::consts::TAU).sin() * level
                })
                .collect();
            out.append(AudioBuffer::new(samples, RATE, 1).unwrap())
                .unwrap();
        }
        out
    }

    #[test]
    fn empty_clip_is_returned_unchanged() {
        let empty = AudioBuffer::empty(RATE, 1);
        assert_eq!(clean_tail(empty.clone(), &TailCleanParams::default()), empty);
    }

    #[test]
    fn all_silent_clip_collapses_to_zero_duration() {
        let cleaned = clean_tail(
            AudioBuffer::silent(1000, RATE, 1),
            &TailCleanParams::default(),
        );
        assert_eq!(cleaned.duration_ms(), 0);
        assert_eq!(cleaned.sample_rate(), RATE);
    }

    #[test]
    fn trailing_noise_is_cut_after_cushion() {
        // speech, long silence, then faint mumbling well below the threshold
        let clip = segments(&[(0.5, 800), (0.0, 600), (0.001, 400)]);
        let cleaned = clean_tail(clip, &TailCleanParams::default());
        let kept = cleaned.duration_ms();
        assert!((855..=865).contains(&kept), "kept {kept}ms");
        assert_eq!(*cleaned.samples().last().unwrap(), 0.0);
    }

    #[test]
    fn short_pause_inside_phrase_is_kept() {
        // 100ms pause is shorter than the 180ms run separation
        let clip = segments(&[(0.5, 400), (0.0, 100), (0.5, 400), (0.0, 500)]);
        let runs = detect_nonsilent(&clip, 180, -30.0);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, 0);
        assert!((895..=905).contains(&runs[0].end), "{:?}", runs);
    }

    #[test]
    fn long_pause_splits_runs() {
        let clip = segments(&[(0.5, 400), (0.0, 400), (0.5, 400)]);
        let runs = detect_nonsilent(&clip, 180, -30.0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].end, 1200);
    }

    #[test]
    fn clip_shorter_than_window_is_one_run() {
        let clip = segments(&[(0.0, 100)]);
        assert_eq!(detect_nonsilent(&clip, 180, -45.0), vec![0..100]);
    }

    #[test]
    fn cushion_never_extends_past_clip_end() {
        let clip = segments(&[(0.5, 700)]);
        let cleaned = clean_tail(clip, &TailCleanParams::default());
        assert_eq!(cleaned.duration_ms(), 700);
    }

    #[test]
    fn threshold_is_clamped_to_floor() {
        let params = TailCleanParams::default();
        assert_eq!(params.threshold_db(f64::NEG_INFINITY), -45.0);
        assert_eq!(params.threshold_db(-10.0), -30.0);
        assert_eq!(params.threshold_db(-60.0), -45.0);
    }
}
