use crate::config::EngineConfig;
use crate::decode::{AudioDecoder, EncodedAudio, SampleBuffer};
use crate::emotion::classifier::{Classification, Classifier};
use crate::emotion::features::FeatureVector;
use crate::emotion::jitter::{JitterSource, SeededJitter};
use crate::emotion::normalize::NormalizedFeatureVector;
use crate::emotion::{EmotionAnalyzer, EmotionError, EmotionResult};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "emotion::analyzer";

/// Mean |sample| below which a buffer activates no candidate.
pub const SIGNAL_FLOOR: f32 = 5e-4;

/// Everything one analysis produced, for callers that want more than the tone.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub features: FeatureVector,
    pub normalized: NormalizedFeatureVector,
    pub classification: Classification,
}

impl Analysis {
    pub fn result(&self) -> EmotionResult {
        self.classification.result
    }
}

/// Feature extraction, normalization and classification over one buffer.
///
/// Holds no per-call state, so one engine can serve concurrent analyses.
#[derive(Clone, Debug, Default)]
pub struct ToneEngine {
    config: EngineConfig,
    classifier: Classifier,
}

impl ToneEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            classifier: Classifier::default(),
        }
    }

    /// Fresh jitter stream for one analysis: the configured seed, or the clock.
    pub fn jitter_source(&self) -> SeededJitter {
        match self.config.seed {
            Some(seed) => SeededJitter::new(seed, self.config.jitter),
            None => SeededJitter::from_clock(self.config.jitter),
        }
    }

    pub fn analyze_with(&self, buffer: &SampleBuffer, jitter: &mut dyn JitterSource) -> Analysis {
        let features = FeatureVector::extract(buffer);
        let normalized = NormalizedFeatureVector::from_raw(&features);

        let classification = if features.average_amplitude < SIGNAL_FLOOR {
            tracing::debug!(
                target: LOG_TARGET,
                average_amplitude = features.average_amplitude,
                "no signal above floor, skipping candidate scoring"
            );
            Classification::neutral()
        } else {
            self.classifier.classify(&normalized, jitter)
        };

        tracing::info!(
            target: LOG_TARGET,
            tone = %classification.result.tone,
            intensity = classification.result.intensity,
            duration_seconds = features.duration_seconds,
            "analysis complete"
        );

        Analysis {
            features,
            normalized,
            classification,
        }
    }

    pub fn analyze(&self, buffer: &SampleBuffer) -> Analysis {
        let mut jitter = self.jitter_source();
        self.analyze_with(buffer, &mut jitter)
    }

    /// Runs `analyze` on a blocking worker thread.
    pub async fn analyze_detached(&self, buffer: SampleBuffer) -> Result<Analysis, EmotionError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.analyze(&buffer))
            .await
            .map_err(|e| EmotionError::WorkerFailed(e.to_string()))
    }

    /// Decodes `audio` with the caller's decoder, then analyzes it.
    pub async fn analyze_encoded(
        &self,
        decoder: &dyn AudioDecoder,
        audio: EncodedAudio,
    ) -> Result<Analysis, EmotionError> {
        let buffer = decoder.decode(audio).await?;
        self.analyze_detached(buffer).await
    }
}

impl EmotionAnalyzer for ToneEngine {
    fn analyze_buffer(
        &self,
        buffer: SampleBuffer,
    ) -> BoxFuture<'_, Result<EmotionResult, EmotionError>> {
        async move { Ok(self.analyze_detached(buffer).await?.result()) }.boxed()
    }
}
