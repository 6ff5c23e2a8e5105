use std::fs;
use std::path::Path;

use chant_rs::audio::decode::decode_mp3;
use chant_rs::audio::encode::encode_wav;
use chant_rs::chants::load_chants;
use chant_rs::config::OutputTarget;
use chant_rs::{
    AudioBuffer, Error, SynthesisEngine, SynthesisError, TimingSpec, TrackBuilder, VoiceParams,
    VoiceParamsBuilder,
};

/// Answers every request with a WAV tone whose length follows a script.
struct FakeEngine {
    clip_ms: Vec<u64>,
    rate: u32,
    calls: usize,
    offline_from: Option<usize>,
}

impl FakeEngine {
    fn new(clip_ms: Vec<u64>, rate: u32) -> Self {
        Self {
            clip_ms,
            rate,
            calls: 0,
            offline_from: None,
        }
    }
}

impl SynthesisEngine for FakeEngine {
    type SynthesisParams = VoiceParams;

    fn synthesize(&mut self, _text: &str, _params: &VoiceParams) -> Result<Vec<u8>, SynthesisError> {
        let call = self.calls;
        self.calls += 1;
        if self.offline_from.is_some_and(|n| call >= n) {
            return Err(SynthesisError::Connectivity(
                "error sending request: dns error: failed to lookup address information".into(),
            ));
        }
        let ms = self.clip_ms[call % self.clip_ms.len()];
        let frames = (ms * self.rate as u64 / 1000) as usize;
        let samples = (0..frames)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / self.rate as f32).sin())
            .collect();
        let tone = AudioBuffer::new(samples, self.rate, 1).unwrap();
        Ok(encode_wav(&tone).unwrap())
    }
}

fn write_chants(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("chants.csv");
    fs::write(&path, "inhale,exhale,repeat\nSo,Ham,\nOm namah,shivaya,1\n").unwrap();
    path
}

fn voice(format: &str) -> VoiceParams {
    VoiceParamsBuilder::default()
        .voice_id("fake")
        .output_format(format)
        .build()
        .unwrap()
}

#[test]
fn padded_and_truncated_clips_give_exact_track_length() {
    let dir = tempfile::tempdir().unwrap();
    let chants = load_chants(&write_chants(dir.path())).unwrap();
    let timing = TimingSpec::new(4000, 4000, 4000, 4000).unwrap();
    let out = dir.path().join("timed.wav");

    let mut engine = FakeEngine::new(vec![1500, 9000], 22_050);
    let track = TrackBuilder::new(&mut engine, voice("pcm_22050"), timing)
        .build(&chants)
        .unwrap();
    track.export(&out, OutputTarget::from_path(&out, "320k").unwrap()).unwrap();

    assert_eq!(engine.calls, 4);
    assert_eq!(track.duration_ms(), 2 * (4000 + 4000 + 4000 + 4000));

    let reader = hound::WavReader::open(&out).unwrap();
    let spec = reader.spec();
    assert_eq!((spec.channels, spec.sample_rate), (1, 22_050));
    assert_eq!(reader.duration() as u64, 32 * 22_050);
}

#[test]
fn connectivity_failure_on_second_chant_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let chants = load_chants(&write_chants(dir.path())).unwrap();
    let timing = TimingSpec::new(4000, 4000, 4000, 4000).unwrap();
    let out = dir.path().join("timed.mp3");

    let mut engine = FakeEngine::new(vec![1500], 22_050);
    engine.offline_from = Some(2);

    let result = TrackBuilder::new(&mut engine, voice("pcm_22050"), timing).build(&chants);
    let err = Error::from(result.unwrap_err());

    assert!(err.is_connectivity());
    assert_eq!(err.exit_code(), 3);
    assert_eq!(engine.calls, 3);
    assert!(!out.exists());
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1, "only the chants file should exist");
}

#[test]
fn mp3_export_decodes_to_roughly_the_track_length() {
    let dir = tempfile::tempdir().unwrap();
    let chants = load_chants(&write_chants(dir.path())).unwrap();
    let timing = TimingSpec::new(1000, 500, 1000, 500).unwrap();
    let out = dir.path().join("timed.MP3");

    let mut engine = FakeEngine::new(vec![700], 44_100);
    let track = TrackBuilder::new(&mut engine, voice("wav_44100"), timing)
        .build(&chants)
        .unwrap();
    let target = OutputTarget::from_path(&out, "128k").unwrap();
    assert_eq!(target, OutputTarget::Mp3 { kbps: 128 });
    track.export(&out, target).unwrap();

    let decoded = decode_mp3(&fs::read(&out).unwrap()).unwrap();
    let diff = decoded.duration_ms().abs_diff(track.duration_ms());
    assert!(diff <= 150, "decoded {}ms vs {}ms", decoded.duration_ms(), track.duration_ms());
}

#[test]
fn bad_configuration_maps_to_exit_code_two() {
    let dir = tempfile::tempdir().unwrap();

    let negative = Error::from(TimingSpec::new(-1, 0, 0, 0).unwrap_err());
    assert_eq!(negative.exit_code(), 2);

    let extension = Error::from(OutputTarget::from_path(Path::new("track.ogg"), "320k").unwrap_err());
    assert_eq!(extension.exit_code(), 2);

    let empty = dir.path().join("empty.csv");
    fs::write(&empty, "inhale,exhale\n").unwrap();
    assert_eq!(Error::from(load_chants(&empty).unwrap_err()).exit_code(), 2);
}
