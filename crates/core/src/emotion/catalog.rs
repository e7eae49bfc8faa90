//! Static candidate table. Each tone is a weighted sum of 3-4 normalized
//! features; weights are positive and sum to 1.0, so a candidate's score is
//! itself in [0, 1]. Voicing-dependent inputs are read through
//! `NormalizedFeatureVector::effective`, which only grows with amplitude, so
//! a score never decreases when one of its inputs increases.
//! Declaration order is the tie-break order.

use crate::emotion::normalize::{Feature, NormalizedFeatureVector};
use crate::emotion::Tone;

use Feature::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub tone: Tone,
    pub weights: &'static [(Feature, f32)],
}

impl Candidate {
    /// Weighted sum of effective feature values, before jitter.
    pub fn score(&self, features: &NormalizedFeatureVector) -> f32 {
        self.weights
            .iter()
            .map(|&(feature, weight)| weight * features.effective(feature))
            .sum()
    }

    /// The feature carrying the largest weight.
    pub fn dominant_feature(&self) -> Option<Feature> {
        self.weights
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|&(feature, _)| feature)
    }
}

pub static CATALOG: [Candidate; 16] = [
    Candidate {
        tone: Tone::Joyful,
        weights: &[
            (AverageAmplitude, 0.35),
            (HighEnergyProxy, 0.25),
            (LowEnergyProxy, 0.2),
            (PitchVariation, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Excited,
        weights: &[
            (AverageAmplitude, 0.4),
            (HighEnergyProxy, 0.3),
            (TempoEstimate, 0.2),
            (EnergyVariance, 0.1),
        ],
    },
    Candidate {
        tone: Tone::Hopeful,
        weights: &[
            (PitchVariation, 0.35),
            (ZeroCrossingRate, 0.25),
            (HighEnergyProxy, 0.2),
            (VoiceStability, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Grateful,
        weights: &[
            (PitchVariation, 0.35),
            (LowEnergyProxy, 0.25),
            (ZeroCrossingRate, 0.2),
            (BreathingIrregularity, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Peaceful,
        weights: &[
            (SilenceRatio, 0.45),
            (VoiceStability, 0.35),
            (ZeroCrossingRate, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Determined,
        weights: &[
            (LowEnergyProxy, 0.35),
            (EnergyVariance, 0.3),
            (TempoEstimate, 0.2),
            (PitchVariation, 0.15),
        ],
    },
    Candidate {
        tone: Tone::Nostalgic,
        weights: &[
            (PitchVariation, 0.35),
            (SilenceRatio, 0.25),
            (BreathingIrregularity, 0.2),
            (SpectralCentroidProxy, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Contemplative,
        weights: &[
            (PitchVariation, 0.35),
            (BreathingIrregularity, 0.25),
            (SilenceRatio, 0.2),
            (ZeroCrossingRate, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Melancholic,
        weights: &[
            (SilenceRatio, 0.35),
            (BreathingIrregularity, 0.25),
            (LowEnergyProxy, 0.2),
            (PitchVariation, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Sad,
        weights: &[
            (BreathingIrregularity, 0.4),
            (SilenceRatio, 0.35),
            (EnergyVariance, 0.25),
        ],
    },
    Candidate {
        tone: Tone::Anxious,
        weights: &[
            (ZeroCrossingRate, 0.35),
            (PitchVariation, 0.25),
            (EnergyVariance, 0.2),
            (SpectralCentroidProxy, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Worried,
        weights: &[
            (BreathingIrregularity, 0.35),
            (PitchVariation, 0.25),
            (ZeroCrossingRate, 0.2),
            (EnergyVariance, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Angry,
        weights: &[
            (EnergyVariance, 0.35),
            (HighEnergyProxy, 0.3),
            (TempoEstimate, 0.2),
            (ZeroCrossingRate, 0.15),
        ],
    },
    Candidate {
        tone: Tone::Frustrated,
        weights: &[
            (EnergyVariance, 0.35),
            (TempoEstimate, 0.25),
            (LowEnergyProxy, 0.2),
            (BreathingIrregularity, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Confused,
        weights: &[
            (PitchVariation, 0.35),
            (SpectralCentroidProxy, 0.25),
            (BreathingIrregularity, 0.2),
            (ZeroCrossingRate, 0.2),
        ],
    },
    Candidate {
        tone: Tone::Lonely,
        weights: &[
            (SilenceRatio, 0.4),
            (VoiceStability, 0.25),
            (BreathingIrregularity, 0.2),
            (PitchVariation, 0.15),
        ],
    },
];
