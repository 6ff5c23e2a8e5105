use super::{AudioBuffer, AudioError};

/// Force `buffer` to last exactly `target_ms`.
///
/// Longer clips are truncated with a warning naming `label`; shorter ones are
/// padded with trailing silence. A negative target is a caller bug and is
/// rejected before anything is produced.
pub fn fit_to(buffer: AudioBuffer, target_ms: i64, label: &str) -> Result<AudioBuffer, AudioError> {
    let target_ms = u64::try_from(target_ms).map_err(|_| AudioError::NegativeDuration(target_ms))?;
    let frames = buffer.ms_to_frames(target_ms);
    Ok(fit_frames(buffer, frames, target_ms, label))
}

/// Frame-exact variant of [`fit_to`].
///
/// `target_ms` is only used for the overrun warning; the frame count is
/// authoritative. The track builder uses this to place slot boundaries on its
/// running clock so rounding never accumulates across cycles.
pub fn fit_frames(buffer: AudioBuffer, frames: usize, target_ms: u64, label: &str) -> AudioBuffer {
    let have = buffer.frames();
    if have > frames {
        // A slot placed on the running clock can be a frame short of its
        // nominal length; only a real overrun is worth a warning.
        if overruns(&buffer, target_ms) {
            log::warn!(
                "'{label}' was {}ms > {target_ms}ms, trimming.",
                buffer.duration_ms()
            );
        }
        buffer.truncate_frames(frames)
    } else {
        buffer.pad_frames(frames - have)
    }
}

/// True when `buffer` is longer than `target_ms` at millisecond resolution.
pub(crate) fn overruns(buffer: &AudioBuffer, target_ms: u64) -> bool {
    buffer.duration_ms() > target_ms
}
