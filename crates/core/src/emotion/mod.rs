mod analyzer;
pub mod catalog;
pub mod classifier;
pub mod features;
pub mod jitter;
pub mod normalize;

use crate::decode::{DecodeError, SampleBuffer};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use analyzer::{Analysis, ToneEngine, SIGNAL_FLOOR};
pub use classifier::{CandidateScore, Classification, Classifier};
pub use features::FeatureVector;
pub use jitter::{FixedJitter, JitterSource, SeededJitter};
pub use normalize::{Feature, NormalizedFeatureVector};

pub const MIN_INTENSITY: f32 = 0.5;
pub const MAX_INTENSITY: f32 = 1.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Tone {
    Joyful,
    Excited,
    Hopeful,
    Grateful,
    Peaceful,
    Determined,
    Nostalgic,
    Contemplative,
    Melancholic,
    Sad,
    Anxious,
    Worried,
    Angry,
    Frustrated,
    Confused,
    Lonely,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Joyful => "Joyful",
            Tone::Excited => "Excited",
            Tone::Hopeful => "Hopeful",
            Tone::Grateful => "Grateful",
            Tone::Peaceful => "Peaceful",
            Tone::Determined => "Determined",
            Tone::Nostalgic => "Nostalgic",
            Tone::Contemplative => "Contemplative",
            Tone::Melancholic => "Melancholic",
            Tone::Sad => "Sad",
            Tone::Anxious => "Anxious",
            Tone::Worried => "Worried",
            Tone::Angry => "Angry",
            Tone::Frustrated => "Frustrated",
            Tone::Confused => "Confused",
            Tone::Lonely => "Lonely",
            Tone::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final `{tone, intensity}` value handed to storage and visualization.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionResult {
    pub tone: Tone,
    pub intensity: f32,
}

impl EmotionResult {
    pub fn neutral() -> Self {
        Self {
            tone: Tone::Neutral,
            intensity: MIN_INTENSITY,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EmotionError {
    #[error("could not decode audio: {0}")]
    Decode(#[from] DecodeError),

    #[error("analysis worker failed: {0}")]
    WorkerFailed(String),
}

pub trait EmotionAnalyzer: Send + Sync {
    fn analyze_buffer(
        &self,
        buffer: SampleBuffer,
    ) -> BoxFuture<'_, Result<EmotionResult, EmotionError>>;
}
