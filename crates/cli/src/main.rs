#![deny(warnings)]

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tone_engine_core::config::{resolve_engine_config, EngineConfig, Env, StdEnv};
use tone_engine_core::decode::{Decoder, EncodedAudio, SymphoniaDecoder};
use tone_engine_core::emotion::{
    Analysis, CandidateScore, FeatureVector, NormalizedFeatureVector, Tone, ToneEngine,
};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "ffmpeg")]
use tone_engine_core::config::{resolve_parsed_with_default, ENV_DECODE_SAMPLE_RATE};
#[cfg(feature = "ffmpeg")]
use tone_engine_core::decode::{FfmpegAudioDecoder, DEFAULT_DECODE_SAMPLE_RATE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DecoderKind {
    /// In-process decode (wav, mp3, flac, ogg/vorbis, aac).
    Symphonia,
    /// Pipe through an ffmpeg subprocess; handles webm/opus and anything else ffmpeg reads.
    #[cfg(feature = "ffmpeg")]
    Ffmpeg,
}

#[derive(Parser, Debug)]
#[command(name = "tone-engine")]
#[command(about = "Classify the emotional tone of recorded voice clips")]
struct Args {
    /// Audio files to analyze.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = DecoderKind::Symphonia)]
    decoder: DecoderKind,

    /// Output rate requested from ffmpeg.
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Fixed jitter seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    jitter_min: Option<f32>,

    #[arg(long)]
    jitter_max: Option<f32>,

    /// Include raw and normalized features plus every candidate score.
    #[arg(long)]
    explain: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize, Debug)]
struct Report<'a> {
    input: &'a str,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum Outcome {
    Analyzed {
        tone: Tone,
        intensity: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        explain: Option<Explain>,
    },
    Failed {
        error: String,
    },
}

#[derive(Serialize, Debug)]
struct Explain {
    features: FeatureVector,
    normalized: NormalizedFeatureVector,
    scores: Vec<CandidateScore>,
}

impl Outcome {
    fn from_analysis(analysis: Analysis, explain: bool) -> Self {
        let result = analysis.result();
        Outcome::Analyzed {
            tone: result.tone,
            intensity: result.intensity,
            explain: explain.then(|| Explain {
                features: analysis.features,
                normalized: analysis.normalized,
                scores: analysis.classification.scores,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;
    let decoder = build_decoder(args.decoder, args.sample_rate, &env)?;
    let engine = ToneEngine::new(cfg);

    tracing::info!(
        inputs = args.inputs.len(),
        decoder = ?args.decoder,
        seed = ?cfg.seed,
        "starting analysis"
    );

    let outcomes = futures::future::join_all(
        args.inputs
            .iter()
            .map(|path| analyze_path(&engine, &decoder, path)),
    )
    .await;

    let mut failures = 0usize;
    let mut out = std::io::stdout().lock();
    for (path, outcome) in args.inputs.iter().zip(outcomes) {
        let outcome = match outcome {
            Ok(analysis) => Outcome::from_analysis(analysis, args.explain),
            Err(e) => {
                failures += 1;
                tracing::warn!(input = %path.display(), error = %e, "input failed");
                Outcome::Failed {
                    error: format!("{e:#}"),
                }
            }
        };
        let input = path.to_string_lossy();
        serde_json::to_writer(&mut out, &Report { input: &input, outcome })?;
        writeln!(out)?;
    }
    out.flush()?;

    if failures > 0 {
        anyhow::bail!("{failures} of {} inputs could not be analyzed", args.inputs.len());
    }
    Ok(())
}

async fn analyze_path(
    engine: &ToneEngine,
    decoder: &Decoder,
    path: &Path,
) -> anyhow::Result<Analysis> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut audio = EncodedAudio::new(bytes);
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        audio = audio.with_hint(ext.to_ascii_lowercase());
    }

    let analysis = engine
        .analyze_encoded(decoder, audio)
        .await
        .with_context(|| format!("failed to analyze {}", path.display()))?;
    Ok(analysis)
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    // stdout carries the JSON reports.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: &Args, env: &impl Env) -> anyhow::Result<EngineConfig> {
    let cfg = resolve_engine_config(args.seed, args.jitter_min, args.jitter_max, env)?;
    Ok(cfg)
}

#[cfg_attr(not(feature = "ffmpeg"), allow(unused_variables))]
fn build_decoder(
    kind: DecoderKind,
    sample_rate: Option<u32>,
    env: &impl Env,
) -> anyhow::Result<Decoder> {
    match kind {
        DecoderKind::Symphonia => Ok(Decoder::new(Arc::new(SymphoniaDecoder::new()))),
        #[cfg(feature = "ffmpeg")]
        DecoderKind::Ffmpeg => {
            let rate = resolve_parsed_with_default(
                sample_rate,
                ENV_DECODE_SAMPLE_RATE,
                env,
                DEFAULT_DECODE_SAMPLE_RATE,
            )?;
            Ok(Decoder::new(Arc::new(FfmpegAudioDecoder::new(rate)?)))
        }
    }
}
