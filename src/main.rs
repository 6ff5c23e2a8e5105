//! chant - breath-paced chant tracks from ElevenLabs text-to-speech
//!
//! `chant build` turns a CSV of inhale/exhale phrases into one timed track;
//! `chant sample` renders a phrase with several voices for comparison.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use chant_rs::chants::load_chants;
use chant_rs::config::{
    parse_voice_spec, resolve_api_key_from_env, ConfigError, OutputTarget, DEFAULT_API_KEY_ENV,
    DEFAULT_MP3_BITRATE,
};
use chant_rs::engines::elevenlabs::{ElevenLabsEngine, DEFAULT_BASE_URL};
use chant_rs::sample::sample_voices;
use chant_rs::troubleshoot::{host_of, network_hints};
use chant_rs::voice::{DEFAULT_LANGUAGE_CODE, DEFAULT_MODEL_ID, DEFAULT_OUTPUT_FORMAT};
use chant_rs::{Error, TailCleanParams, TimingSpec, TrackBuilder, VoiceParams, VoiceParamsBuilder};

/// Generate timed chant audio with ElevenLabs TTS
#[derive(Parser)]
#[command(name = "chant")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one breath-paced track from a chants CSV
    Build {
        /// Path to CSV with columns inhale, exhale (optional repeat)
        #[arg(long)]
        chants_csv: PathBuf,

        /// Inhale speak duration in ms
        #[arg(long, allow_hyphen_values = true)]
        inhale_ms: i64,

        /// Hold (silence) duration in ms
        #[arg(long, allow_hyphen_values = true)]
        hold_ms: i64,

        /// Exhale speak duration in ms
        #[arg(long, allow_hyphen_values = true)]
        exhale_ms: i64,

        /// Rest (silence) duration in ms
        #[arg(long, allow_hyphen_values = true)]
        rest_ms: i64,

        /// ElevenLabs voice ID to use
        #[arg(long)]
        voice_id: String,

        /// Output path (must end with .mp3 or .wav)
        #[arg(long)]
        out: PathBuf,

        /// MP3 bitrate when --out ends with .mp3
        #[arg(long, default_value = DEFAULT_MP3_BITRATE)]
        mp3_bitrate: String,

        #[command(flatten)]
        service: ServiceArgs,

        #[command(flatten)]
        voice: VoiceArgs,

        #[command(flatten)]
        tail: TailArgs,
    },

    /// Render one phrase with several voices, one file per voice
    Sample {
        /// Text to speak
        #[arg(long, default_value = "The first move is what sets everything in motion.")]
        text: String,

        /// Voice to sample as NAME=VOICE_ID (repeatable)
        #[arg(long = "voice", required = true)]
        voices: Vec<String>,

        /// Directory for the rendered files
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        #[command(flatten)]
        service: ServiceArgs,

        #[command(flatten)]
        voice: VoiceArgs,
    },
}

#[derive(Args)]
struct ServiceArgs {
    /// ElevenLabs API key (overrides the environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Name of the environment variable holding the API key
    #[arg(long, default_value = DEFAULT_API_KEY_ENV)]
    api_key_env: String,

    /// API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[derive(Args)]
struct VoiceArgs {
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    model_id: String,

    #[arg(long, default_value = DEFAULT_LANGUAGE_CODE)]
    language_code: String,

    /// Provider output format, e.g. mp3_44100_128 or pcm_24000
    #[arg(long, default_value = DEFAULT_OUTPUT_FORMAT)]
    output_format: String,

    #[arg(long, default_value = "off", value_parser = ["auto", "on", "off"])]
    apply_text_normalization: String,

    #[arg(long, default_value_t = 0.90)]
    stability: f32,

    #[arg(long, default_value_t = 0.75)]
    similarity_boost: f32,

    #[arg(long, default_value_t = 0.0)]
    style: f32,

    /// Enable speaker boost (default)
    #[arg(long, overrides_with = "no_speaker_boost")]
    use_speaker_boost: bool,

    /// Disable speaker boost
    #[arg(long, overrides_with = "use_speaker_boost")]
    no_speaker_boost: bool,
}

impl VoiceArgs {
    fn params(&self, voice_id: &str) -> Result<VoiceParams, ConfigError> {
        let normalization = self
            .apply_text_normalization
            .parse()
            .map_err(ConfigError::Voice)?;
        VoiceParamsBuilder::default()
            .voice_id(voice_id)
            .model_id(self.model_id.as_str())
            .language_code(self.language_code.as_str())
            .output_format(self.output_format.as_str())
            .text_normalization(normalization)
            .stability(self.stability)
            .similarity_boost(self.similarity_boost)
            .style(self.style)
            .use_speaker_boost(self.use_speaker_boost || !self.no_speaker_boost)
            .build()
            .map_err(|e| ConfigError::Voice(e.to_string()))
    }
}

#[derive(Args)]
struct TailArgs {
    /// Lowest silence threshold in dBFS
    #[arg(long, default_value_t = -45.0, allow_hyphen_values = true)]
    silence_floor_db: f64,

    /// Silence starts this many dB below the clip's average loudness
    #[arg(long, default_value_t = 20.0)]
    silence_margin_db: f64,

    /// Gaps shorter than this stay inside one spoken run
    #[arg(long, default_value_t = 180)]
    min_silence_ms: u64,

    /// Audio kept after the last spoken run
    #[arg(long, default_value_t = 60)]
    tail_cushion_ms: u64,

    /// Fade applied where the tail is cut
    #[arg(long, default_value_t = 120)]
    fade_out_ms: u64,
}

impl From<&TailArgs> for TailCleanParams {
    fn from(args: &TailArgs) -> Self {
        Self {
            floor_db: args.silence_floor_db,
            margin_db: args.silence_margin_db,
            min_silence_ms: args.min_silence_ms,
            cushion_ms: args.tail_cushion_ms,
            fade_ms: args.fade_out_ms,
        }
    }
}

impl ServiceArgs {
    fn engine(&self) -> Result<ElevenLabsEngine, Error> {
        let api_key = resolve_api_key_from_env(self.api_key.as_deref(), &self.api_key_env)?;
        Ok(ElevenLabsEngine::new(api_key)?.with_base_url(&self.base_url)?)
    }
}

#[allow(clippy::too_many_arguments)]
fn build(
    chants_csv: &Path,
    timing: (i64, i64, i64, i64),
    voice_id: &str,
    out: &Path,
    mp3_bitrate: &str,
    service: &ServiceArgs,
    voice: &VoiceArgs,
    tail: &TailArgs,
) -> Result<(), Error> {
    // Validate everything before the first network call.
    let timing = TimingSpec::new(timing.0, timing.1, timing.2, timing.3)?;
    let target = OutputTarget::from_path(out, mp3_bitrate)?;
    let params = voice.params(voice_id)?;
    let chants = load_chants(chants_csv)?;
    let engine = service.engine()?;

    let track = TrackBuilder::new(engine, params, timing)
        .tail_clean(tail.into())
        .build(&chants)?;
    track.export(out, target)?;

    println!("Saved: {}  (duration_ms={})", out.display(), track.duration_ms());
    Ok(())
}

fn sample(
    text: &str,
    voices: &[String],
    out_dir: &Path,
    service: &ServiceArgs,
    voice: &VoiceArgs,
) -> Result<(), Error> {
    let voices = voices
        .iter()
        .map(String::as_str)
        .map(parse_voice_spec)
        .collect::<Result<Vec<_>, _>>()?;
    let Some((_, first_id)) = voices.first() else {
        return Ok(());
    };
    let base = voice.params(first_id)?;
    let engine = service.engine()?;

    for path in sample_voices(engine, text, &voices, &base, out_dir)? {
        println!("Saved: {}", path.display());
    }
    Ok(())
}

/// Text printed to stderr for a failed run.
///
/// Connectivity failures get proxy and DNS hints for the configured host;
/// `lookup` reads environment variables.
fn failure_report<F>(err: &Error, base_url: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if err.is_connectivity() {
        format!(
            "\nERROR: Unable to connect to ElevenLabs: {err}\n{}",
            network_hints(host_of(base_url), lookup)
        )
    } else {
        format!("ERROR: {err}")
    }
}

fn exit_status(result: &Result<(), Error>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => err.exit_code(),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let (result, base_url) = match &cli.command {
        Commands::Build {
            chants_csv,
            inhale_ms,
            hold_ms,
            exhale_ms,
            rest_ms,
            voice_id,
            out,
            mp3_bitrate,
            service,
            voice,
            tail,
        } => (
            build(
                chants_csv,
                (*inhale_ms, *hold_ms, *exhale_ms, *rest_ms),
                voice_id,
                out,
                mp3_bitrate,
                service,
                voice,
                tail,
            ),
            &service.base_url,
        ),
        Commands::Sample {
            text,
            voices,
            out_dir,
            service,
            voice,
        } => (
            sample(text, voices, out_dir, service, voice),
            &service.base_url,
        ),
    };

    if let Err(err) = &result {
        eprintln!("{}", failure_report(err, base_url, |name| std::env::var(name).ok()));
    }
    ExitCode::from(exit_status(&result))
}
