#[cfg(feature = "ffmpeg")]
mod ffmpeg;
mod native;

use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegAudioDecoder;
pub use native::SymphoniaDecoder;
#[cfg(test)]
pub(crate) use native::wav_bytes;

pub const DEFAULT_DECODE_SAMPLE_RATE: u32 = 44_100;

/// Decoded mono audio handed to the emotion engine.
///
/// Samples are sanitized on construction: non-finite values become silence
/// and everything is clamped to [-1, 1]. The buffer is immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    duration: Duration,
}

impl SampleBuffer {
    pub fn new(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        for s in samples.iter_mut() {
            *s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
        }
        let duration = duration_from_sample_count(sample_rate, 1, samples.len());
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration.as_secs_f32()
    }
}

/// Encoded container bytes as received from a recorder or upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedAudio {
    pub bytes: Bytes,
    /// File extension or container name used as a probe hint ("wav", "mp3", ...).
    pub format_hint: Option<String>,
}

impl EncodedAudio {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            format_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("unsupported or unrecognized audio container: {0}")]
    Unsupported(String),

    #[error("corrupt audio stream: {0}")]
    Corrupt(String),

    #[error("no decodable audio track found")]
    NoAudioTrack,

    #[error("audio track has no sample rate")]
    UnknownSampleRate,

    #[error("ffmpeg unavailable: {0}")]
    FfmpegUnavailable(String),

    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),

    #[error("invalid pcm output: {0}")]
    InvalidPcm(String),

    #[error("decode worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

pub trait AudioDecoder: Send + Sync {
    fn decode(&self, audio: EncodedAudio) -> BoxFuture<'_, Result<SampleBuffer>>;
}

#[derive(Clone)]
pub struct Decoder {
    inner: Arc<dyn AudioDecoder>,
}

impl Decoder {
    pub fn new(inner: Arc<dyn AudioDecoder>) -> Self {
        Self { inner }
    }
}

impl AudioDecoder for Decoder {
    fn decode(&self, audio: EncodedAudio) -> BoxFuture<'_, Result<SampleBuffer>> {
        self.inner.decode(audio)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(Arc::new(SymphoniaDecoder::default()))
    }
}

/// Averages interleaved frames down to a single channel.
pub fn downmix_interleaved(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

pub fn duration_from_sample_count(
    sample_rate_hz: u32,
    channels: u16,
    sample_count: usize,
) -> Duration {
    if sample_rate_hz == 0 || channels == 0 {
        return Duration::from_secs(0);
    }
    let frames = sample_count / usize::from(channels);
    let micros = (u128::from(frames as u64) * 1_000_000u128) / u128::from(sample_rate_hz);
    Duration::from_micros(micros.min(u128::from(u64::MAX)) as u64)
}
