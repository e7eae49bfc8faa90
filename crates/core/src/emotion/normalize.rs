//! Fixed scale-and-clamp calibration from raw descriptors to [0, 1].
//!
//! The constants are part of the engine's observable contract; changing one
//! shifts every stored tone.

use crate::emotion::features::{FeatureVector, SILENCE_THRESHOLD};
use serde::{Deserialize, Serialize};

pub const AMPLITUDE_SCALE: f32 = 20.0;
pub const VARIANCE_SCALE: f32 = 10.0;
pub const ZCR_DIVISOR: f32 = 0.05;
pub const CENTROID_DIVISOR: f32 = 2000.0;
pub const TEMPO_DIVISOR: f32 = 100.0;
pub const PITCH_VARIATION_SCALE: f32 = 5.0;
pub const LOW_ENERGY_SCALE: f32 = 10.0;
pub const HIGH_ENERGY_SCALE: f32 = 10.0;
pub const STABILITY_SCALE: f32 = 3.0;
/// Population stddev of a fraction tops out at 0.5.
pub const BREATHING_SCALE: f32 = 2.0;

/// Normalized amplitude of a buffer whose every sample sits under the
/// silence threshold. At or below it, voicing-dependent features score 0.
pub const VOICING_ONSET: f32 = SILENCE_THRESHOLD * AMPLITUDE_SCALE;
/// Normalized amplitude from which voicing-dependent features count in full.
pub const VOICING_FULL: f32 = 2.0 * VOICING_ONSET;

/// Named normalized descriptor, used by candidate weight tables.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Feature {
    AverageAmplitude,
    EnergyVariance,
    ZeroCrossingRate,
    SpectralCentroidProxy,
    TempoEstimate,
    PitchVariation,
    SilenceRatio,
    LowEnergyProxy,
    HighEnergyProxy,
    VoiceStability,
    BreathingIrregularity,
}

impl Feature {
    pub const ALL: [Feature; 11] = [
        Feature::AverageAmplitude,
        Feature::EnergyVariance,
        Feature::ZeroCrossingRate,
        Feature::SpectralCentroidProxy,
        Feature::TempoEstimate,
        Feature::PitchVariation,
        Feature::SilenceRatio,
        Feature::LowEnergyProxy,
        Feature::HighEnergyProxy,
        Feature::VoiceStability,
        Feature::BreathingIrregularity,
    ];

    /// Descriptors that only carry meaning over voiced audio. On a noise
    /// floor they saturate regardless of content.
    pub fn needs_voicing(self) -> bool {
        matches!(
            self,
            Feature::EnergyVariance
                | Feature::ZeroCrossingRate
                | Feature::SpectralCentroidProxy
                | Feature::TempoEstimate
                | Feature::PitchVariation
                | Feature::BreathingIrregularity
        )
    }
}

/// Every field lies in [0, 1]. Duration stays on the raw vector.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NormalizedFeatureVector {
    pub average_amplitude: f32,
    pub energy_variance: f32,
    pub zero_crossing_rate: f32,
    pub spectral_centroid_proxy: f32,
    pub tempo_estimate: f32,
    pub pitch_variation: f32,
    pub silence_ratio: f32,
    pub low_energy_proxy: f32,
    pub high_energy_proxy: f32,
    pub voice_stability: f32,
    pub breathing_irregularity: f32,
}

fn unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl NormalizedFeatureVector {
    pub fn from_raw(raw: &FeatureVector) -> Self {
        Self {
            average_amplitude: unit(raw.average_amplitude * AMPLITUDE_SCALE),
            energy_variance: unit(raw.energy_variance * VARIANCE_SCALE),
            zero_crossing_rate: unit(raw.zero_crossing_rate / ZCR_DIVISOR),
            spectral_centroid_proxy: unit(raw.spectral_centroid_proxy / CENTROID_DIVISOR),
            tempo_estimate: unit(raw.tempo_estimate / TEMPO_DIVISOR),
            pitch_variation: unit(raw.pitch_variation * PITCH_VARIATION_SCALE),
            silence_ratio: unit(raw.silence_ratio),
            low_energy_proxy: unit(raw.low_energy_proxy * LOW_ENERGY_SCALE),
            high_energy_proxy: unit(raw.high_energy_proxy * HIGH_ENERGY_SCALE),
            voice_stability: unit(raw.voice_stability * STABILITY_SCALE),
            breathing_irregularity: unit(raw.breathing_irregularity * BREATHING_SCALE),
        }
    }

    pub fn get(&self, feature: Feature) -> f32 {
        match feature {
            Feature::AverageAmplitude => self.average_amplitude,
            Feature::EnergyVariance => self.energy_variance,
            Feature::ZeroCrossingRate => self.zero_crossing_rate,
            Feature::SpectralCentroidProxy => self.spectral_centroid_proxy,
            Feature::TempoEstimate => self.tempo_estimate,
            Feature::PitchVariation => self.pitch_variation,
            Feature::SilenceRatio => self.silence_ratio,
            Feature::LowEnergyProxy => self.low_energy_proxy,
            Feature::HighEnergyProxy => self.high_energy_proxy,
            Feature::VoiceStability => self.voice_stability,
            Feature::BreathingIrregularity => self.breathing_irregularity,
        }
    }

    /// Ramp from 0 at `VOICING_ONSET` to 1 at `VOICING_FULL` over the
    /// normalized amplitude. Non-decreasing in amplitude.
    pub fn voicing(&self) -> f32 {
        unit((self.average_amplitude - VOICING_ONSET) / (VOICING_FULL - VOICING_ONSET))
    }

    /// The value a candidate weight sees: `get`, scaled by `voicing` for
    /// voicing-dependent features.
    pub fn effective(&self, feature: Feature) -> f32 {
        if feature.needs_voicing() {
            self.get(feature) * self.voicing()
        } else {
            self.get(feature)
        }
    }

    /// Returns a copy with one field replaced (clamped to [0, 1]).
    pub fn with(mut self, feature: Feature, value: f32) -> Self {
        let value = unit(value);
        let slot = match feature {
            Feature::AverageAmplitude => &mut self.average_amplitude,
            Feature::EnergyVariance => &mut self.energy_variance,
            Feature::ZeroCrossingRate => &mut self.zero_crossing_rate,
            Feature::SpectralCentroidProxy => &mut self.spectral_centroid_proxy,
            Feature::TempoEstimate => &mut self.tempo_estimate,
            Feature::PitchVariation => &mut self.pitch_variation,
            Feature::SilenceRatio => &mut self.silence_ratio,
            Feature::LowEnergyProxy => &mut self.low_energy_proxy,
            Feature::HighEnergyProxy => &mut self.high_energy_proxy,
            Feature::VoiceStability => &mut self.voice_stability,
            Feature::BreathingIrregularity => &mut self.breathing_irregularity,
        };
        *slot = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with(f: impl FnOnce(&mut FeatureVector)) -> NormalizedFeatureVector {
        let mut raw = FeatureVector::default();
        f(&mut raw);
        NormalizedFeatureVector::from_raw(&raw)
    }

    #[test]
    fn scale_constants_are_pinned() {
        assert_eq!(AMPLITUDE_SCALE, 20.0);
        assert_eq!(VARIANCE_SCALE, 10.0);
        assert_eq!(ZCR_DIVISOR, 0.05);
        assert_eq!(CENTROID_DIVISOR, 2000.0);
        assert_eq!(TEMPO_DIVISOR, 100.0);
        assert_eq!(PITCH_VARIATION_SCALE, 5.0);
        assert_eq!(LOW_ENERGY_SCALE, 10.0);
        assert_eq!(HIGH_ENERGY_SCALE, 10.0);
        assert_eq!(STABILITY_SCALE, 3.0);
        assert_eq!(BREATHING_SCALE, 2.0);
    }

    #[test]
    fn scales_each_descriptor() {
        let n = raw_with(|r| {
            r.average_amplitude = 0.02;
            r.energy_variance = 0.03;
            r.zero_crossing_rate = 0.01;
            r.spectral_centroid_proxy = 500.0;
            r.tempo_estimate = 40.0;
            r.pitch_variation = 0.1;
            r.silence_ratio = 0.3;
            r.low_energy_proxy = 0.05;
            r.high_energy_proxy = 0.07;
            r.voice_stability = 0.2;
            r.breathing_irregularity = 0.1;
        });
        let close = |a: f32, b: f32| (a - b).abs() < 1e-5;
        assert!(close(n.average_amplitude, 0.4));
        assert!(close(n.energy_variance, 0.3));
        assert!(close(n.zero_crossing_rate, 0.2));
        assert!(close(n.spectral_centroid_proxy, 0.25));
        assert!(close(n.tempo_estimate, 0.4));
        assert!(close(n.pitch_variation, 0.5));
        assert!(close(n.silence_ratio, 0.3));
        assert!(close(n.low_energy_proxy, 0.5));
        assert!(close(n.high_energy_proxy, 0.7));
        assert!(close(n.voice_stability, 0.6));
        assert!(close(n.breathing_irregularity, 0.2));
    }

    #[test]
    fn clamps_to_unit_range() {
        let n = raw_with(|r| {
            r.average_amplitude = 0.9;
            r.spectral_centroid_proxy = 11_000.0;
            r.tempo_estimate = 400.0;
            r.voice_stability = 1.0;
            r.energy_variance = -1.0;
            r.pitch_variation = f32::NAN;
        });
        assert_eq!(n.average_amplitude, 1.0);
        assert_eq!(n.spectral_centroid_proxy, 1.0);
        assert_eq!(n.tempo_estimate, 1.0);
        assert_eq!(n.voice_stability, 1.0);
        assert_eq!(n.energy_variance, 0.0);
        assert_eq!(n.pitch_variation, 0.0);
        for feature in Feature::ALL {
            let v = n.get(feature);
            assert!((0.0..=1.0).contains(&v), "{feature:?} = {v}");
        }
    }

    #[test]
    fn with_replaces_single_field() {
        let base = NormalizedFeatureVector::default();
        let n = base.with(Feature::TempoEstimate, 0.7);
        assert_eq!(n.get(Feature::TempoEstimate), 0.7);
        assert_eq!(n.with(Feature::TempoEstimate, 3.0).tempo_estimate, 1.0);
        for feature in Feature::ALL {
            if feature != Feature::TempoEstimate {
                assert_eq!(n.get(feature), 0.0);
            }
        }
    }

    #[test]
    fn voicing_ramps_over_amplitude() {
        let at = |a: f32| NormalizedFeatureVector::default().with(Feature::AverageAmplitude, a);
        assert_eq!(at(0.0).voicing(), 0.0);
        assert_eq!(at(VOICING_ONSET).voicing(), 0.0);
        assert!((at(0.3).voicing() - 0.5).abs() < 1e-4);
        assert_eq!(at(VOICING_FULL).voicing(), 1.0);
        assert_eq!(at(1.0).voicing(), 1.0);
    }

    #[test]
    fn sub_threshold_buffer_keeps_only_level_features() {
        // Every sample under the silence threshold caps the mean magnitude there too.
        let n = raw_with(|r| {
            r.average_amplitude = SILENCE_THRESHOLD * 0.99;
            r.zero_crossing_rate = 0.5;
            r.spectral_centroid_proxy = 11_000.0;
            r.pitch_variation = 0.8;
            r.breathing_irregularity = 0.4;
            r.silence_ratio = 1.0;
            r.voice_stability = 0.9;
        });
        for feature in Feature::ALL {
            if feature.needs_voicing() {
                assert_eq!(n.effective(feature), 0.0, "{feature:?}");
            } else {
                assert_eq!(n.effective(feature), n.get(feature), "{feature:?}");
            }
        }
        assert_eq!(n.effective(Feature::SilenceRatio), 1.0);
        assert_eq!(n.effective(Feature::VoiceStability), 1.0);
    }
}
