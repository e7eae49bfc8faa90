use crate::decode::{
    AudioDecoder, DecodeError, EncodedAudio, Result, SampleBuffer, DEFAULT_DECODE_SAMPLE_RATE,
};
use bytes::Bytes;
use ffmpeg_sidecar::{download, paths::ffmpeg_path};
use futures::future::BoxFuture;
use futures::FutureExt;

const LOG_TARGET: &str = "decode::ffmpeg";

/// Decodes anything ffmpeg understands (webm/opus recordings included) by
/// piping the container through an ffmpeg subprocess into f32le mono PCM.
#[derive(Clone, Debug)]
pub struct FfmpegAudioDecoder {
    sample_rate: u32,
}

impl Default for FfmpegAudioDecoder {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_DECODE_SAMPLE_RATE,
        }
    }
}

impl FfmpegAudioDecoder {
    pub fn new(sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DecodeError::InvalidPcm(
                "output sample rate must be > 0".to_owned(),
            ));
        }
        Ok(Self { sample_rate })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn ensure_ffmpeg_available(&self) -> Result<()> {
        download::auto_download().map_err(|e| DecodeError::FfmpegUnavailable(e.to_string()))
    }

    fn parse_f32le_mono(raw: &[u8]) -> Result<Vec<f32>> {
        if !raw.len().is_multiple_of(4usize) {
            return Err(DecodeError::InvalidPcm(format!(
                "f32le byte length must be multiple of 4, got {}",
                raw.len()
            )));
        }
        let mut out = Vec::with_capacity(raw.len() / 4);
        for chunk in raw.chunks_exact(4) {
            out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        Ok(out)
    }

    async fn decode_with_ffmpeg(&self, input: Bytes) -> Result<Vec<f32>> {
        let rate = self.sample_rate.to_string();

        // ffmpeg probes piped input itself, so the container hint is not forwarded.
        let mut child = tokio::process::Command::new(ffmpeg_path())
            .args([
                "-hide_banner",
                "-nostdin",
                "-loglevel",
                "error",
                "-i",
                "pipe:0",
                "-vn",
                "-sn",
                "-dn",
                "-ac",
                "1",
                "-ar",
                rate.as_str(),
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "pipe:1",
            ])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            DecodeError::FfmpegFailed("ffmpeg stdin unavailable (pipe not created)".to_owned())
        })?;
        let mut stdout = child.stdout.take().ok_or_else(|| {
            DecodeError::FfmpegFailed("ffmpeg stdout unavailable (pipe not created)".to_owned())
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            DecodeError::FfmpegFailed("ffmpeg stderr unavailable (pipe not created)".to_owned())
        })?;

        let stdin_task = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            stdin.write_all(&input).await?;
            stdin.shutdown().await?;
            Ok::<(), std::io::Error>(())
        });

        let stdout_task = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await?;
            Ok::<Vec<u8>, std::io::Error>(buf)
        });

        let stderr_task = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await?;
            Ok::<Vec<u8>, std::io::Error>(buf)
        });

        let status = child
            .wait()
            .await
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        if let Err(e) = stdin_task
            .await
            .map_err(|e| DecodeError::Worker(e.to_string()))?
        {
            tracing::debug!(target: LOG_TARGET, error = %e, "ffmpeg stopped reading input");
        }

        let stdout_bytes = stdout_task
            .await
            .map_err(|e| DecodeError::Worker(e.to_string()))?
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        let stderr_bytes = stderr_task
            .await
            .map_err(|e| DecodeError::Worker(e.to_string()))?
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        if !status.success() {
            let stderr_s = String::from_utf8_lossy(&stderr_bytes).trim().to_owned();
            return Err(DecodeError::Unsupported(format!(
                "ffmpeg exit_code={:?} stderr={stderr_s}",
                status.code()
            )));
        }

        Self::parse_f32le_mono(&stdout_bytes)
    }
}

impl AudioDecoder for FfmpegAudioDecoder {
    fn decode(&self, audio: EncodedAudio) -> BoxFuture<'_, Result<SampleBuffer>> {
        let this = self.clone();
        async move {
            this.ensure_ffmpeg_available()?;
            let samples = this.decode_with_ffmpeg(audio.bytes).await?;
            tracing::debug!(
                target: LOG_TARGET,
                samples = samples.len(),
                sample_rate = this.sample_rate,
                "ffmpeg decoded audio"
            );
            Ok(SampleBuffer::new(samples, this.sample_rate))
        }
        .boxed()
    }
}
