use crate::decode::{
    downmix_interleaved, AudioDecoder, DecodeError, EncodedAudio, Result, SampleBuffer,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer as InterleavedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const LOG_TARGET: &str = "decode::symphonia";

/// Pure-Rust container decoder (WAV, MP3, FLAC, OGG/Vorbis, AAC).
///
/// Decoding runs on a blocking worker so async callers stay responsive.
#[derive(Clone, Debug, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes the whole stream into a mono buffer at the track's native rate.
    pub fn decode_blocking(audio: EncodedAudio) -> Result<SampleBuffer> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(audio.bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = audio.format_hint.as_deref() {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or(DecodeError::UnknownSampleRate)?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let mut mono: Vec<f32> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(DecodeError::Corrupt(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    skipped_packets += 1;
                    tracing::warn!(target: LOG_TARGET, reason = msg, "skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(DecodeError::Corrupt(e.to_string())),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let mut interleaved = InterleavedBuffer::<f32>::new(decoded.frames() as u64, spec);
            interleaved.copy_interleaved_ref(decoded);

            mono.extend(downmix_interleaved(interleaved.samples(), channels));
        }

        tracing::debug!(
            target: LOG_TARGET,
            samples = mono.len(),
            sample_rate,
            skipped_packets,
            "decoded audio"
        );

        Ok(SampleBuffer::new(mono, sample_rate))
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, audio: EncodedAudio) -> BoxFuture<'_, Result<SampleBuffer>> {
        async move {
            tokio::task::spawn_blocking(move || Self::decode_blocking(audio))
                .await
                .map_err(|e| DecodeError::Worker(e.to_string()))?
        }
        .boxed()
    }
}

#[cfg(test)]
pub(crate) fn wav_bytes(sample_rate: u32, channels: u16, pcm: &[i16]) -> Vec<u8> {
    let data_len = (pcm.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * u32::from(channels) * 2).to_le_bytes());
    out.extend_from_slice(&(channels * 2).to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in pcm {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}
