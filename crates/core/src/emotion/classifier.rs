use crate::emotion::catalog::{Candidate, CATALOG};
use crate::emotion::jitter::JitterSource;
use crate::emotion::normalize::NormalizedFeatureVector;
use crate::emotion::{EmotionResult, Tone, MAX_INTENSITY, MIN_INTENSITY};
use serde::{Deserialize, Serialize};

/// Below this jittered score no candidate counts as activated.
pub const NEUTRAL_SCORE_FLOOR: f32 = 0.05;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CandidateScore {
    pub tone: Tone,
    /// Weighted sum before jitter.
    pub raw: f32,
    pub jitter: f32,
    /// `raw * jitter`, the value compared across candidates.
    pub score: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub result: EmotionResult,
    /// Scores in catalog order; empty when classification was skipped.
    pub scores: Vec<CandidateScore>,
}

impl Classification {
    pub fn neutral() -> Self {
        Self {
            result: EmotionResult::neutral(),
            scores: Vec::new(),
        }
    }
}

/// Weighted-score argmax over a static candidate catalog.
#[derive(Clone, Copy, Debug)]
pub struct Classifier {
    candidates: &'static [Candidate],
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&CATALOG)
    }
}

impl Classifier {
    pub fn new(candidates: &'static [Candidate]) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &'static [Candidate] {
        self.candidates
    }

    /// Draws one jitter factor per candidate, in catalog order.
    pub fn score(
        &self,
        features: &NormalizedFeatureVector,
        jitter: &mut dyn JitterSource,
    ) -> Vec<CandidateScore> {
        self.candidates
            .iter()
            .map(|candidate| {
                let raw = candidate.score(features);
                let factor = jitter.next_factor();
                CandidateScore {
                    tone: candidate.tone,
                    raw,
                    jitter: factor,
                    score: raw * factor,
                }
            })
            .collect()
    }

    pub fn classify(
        &self,
        features: &NormalizedFeatureVector,
        jitter: &mut dyn JitterSource,
    ) -> Classification {
        let scores = self.score(features, jitter);

        // Strict comparison keeps the first-declared candidate on ties.
        let mut best: Option<&CandidateScore> = None;
        for s in &scores {
            if best.is_none_or(|b| s.score > b.score) {
                best = Some(s);
            }
        }

        let result = match best {
            Some(winner) if winner.score >= NEUTRAL_SCORE_FLOOR => EmotionResult {
                tone: winner.tone,
                intensity: calibrate_intensity(winner.raw, winner.jitter),
            },
            _ => EmotionResult::neutral(),
        };

        Classification { result, scores }
    }
}

/// `clamp(score * jitter, 0.5, 1.0)`; non-finite input maps to the minimum.
pub fn calibrate_intensity(score: f32, jitter: f32) -> f32 {
    let v = score * jitter;
    if v.is_finite() {
        v.clamp(MIN_INTENSITY, MAX_INTENSITY)
    } else {
        MIN_INTENSITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::jitter::FixedJitter;
    use crate::emotion::normalize::{Feature, VOICING_FULL, VOICING_ONSET};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    struct SequenceJitter {
        values: Vec<f32>,
        next: usize,
    }

    impl JitterSource for SequenceJitter {
        fn next_factor(&mut self) -> f32 {
            let v = self.values[self.next % self.values.len()];
            self.next += 1;
            v
        }
    }

    static TIED: [Candidate; 2] = [
        Candidate {
            tone: Tone::Sad,
            weights: &[(Feature::AverageAmplitude, 1.0)],
        },
        Candidate {
            tone: Tone::Joyful,
            weights: &[(Feature::AverageAmplitude, 1.0)],
        },
    ];

    /// The candidate's own inputs saturated, over just enough amplitude to
    /// count voicing-dependent inputs in full.
    fn indicator(candidate: &Candidate) -> NormalizedFeatureVector {
        let voiced = NormalizedFeatureVector::default().with(Feature::AverageAmplitude, VOICING_FULL);
        candidate
            .weights
            .iter()
            .fold(voiced, |v, &(f, _)| v.with(f, 1.0))
    }

    fn random_vector(rng: &mut StdRng) -> NormalizedFeatureVector {
        Feature::ALL
            .iter()
            .fold(NormalizedFeatureVector::default(), |v, &f| {
                v.with(f, rng.random_range(0.0..=1.0))
            })
    }

    #[test]
    fn every_candidate_is_reachable() {
        let classifier = Classifier::default();
        for candidate in classifier.candidates() {
            let c = classifier.classify(&indicator(candidate), &mut FixedJitter(1.0));
            assert_eq!(c.result.tone, candidate.tone);
            assert!((c.result.intensity - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn ties_go_to_first_declared() {
        let classifier = Classifier::new(&TIED);
        let features = NormalizedFeatureVector::default().with(Feature::AverageAmplitude, 0.6);
        let c = classifier.classify(&features, &mut FixedJitter(1.0));
        assert_eq!(c.result.tone, Tone::Sad);
    }

    #[test]
    fn jitter_is_drawn_in_catalog_order() {
        let classifier = Classifier::new(&TIED);
        let features = NormalizedFeatureVector::default().with(Feature::AverageAmplitude, 0.6);
        let mut jitter = SequenceJitter {
            values: vec![1.0, 1.2],
            next: 0,
        };
        let c = classifier.classify(&features, &mut jitter);
        assert_eq!(c.result.tone, Tone::Joyful);
        assert!((c.result.intensity - 0.72).abs() < 1e-6);
        assert_eq!(c.scores[0].jitter, 1.0);
        assert_eq!(c.scores[1].jitter, 1.2);
    }

    #[test]
    fn zero_vector_is_neutral() {
        let c = Classifier::default()
            .classify(&NormalizedFeatureVector::default(), &mut FixedJitter(1.2));
        assert_eq!(c.result, EmotionResult::neutral());
        assert_eq!(c.scores.len(), 16);
    }

    #[test]
    fn weak_activation_stays_below_floor() {
        let features = Feature::ALL
            .iter()
            .fold(NormalizedFeatureVector::default(), |v, &f| v.with(f, 0.03));
        let c = Classifier::default().classify(&features, &mut FixedJitter(1.2));
        assert_eq!(c.result.tone, Tone::Neutral);
        assert_eq!(c.result.intensity, MIN_INTENSITY);
    }

    #[test]
    fn intensity_is_clamped() {
        assert_eq!(calibrate_intensity(0.1, 1.0), 0.5);
        assert_eq!(calibrate_intensity(1.0, 1.2), 1.0);
        assert!((calibrate_intensity(0.7, 1.0) - 0.7).abs() < 1e-6);
        assert_eq!(calibrate_intensity(f32::NAN, 1.0), 0.5);
    }

    #[test]
    fn intensity_bounds_hold_for_random_vectors_and_jitter() {
        let mut rng = StdRng::seed_from_u64(11);
        let classifier = Classifier::default();
        for _ in 0..500 {
            let features = random_vector(&mut rng);
            let mut jitter = SequenceJitter {
                values: (0..16).map(|_| rng.random_range(0.8..=1.2)).collect(),
                next: 0,
            };
            let r = classifier.classify(&features, &mut jitter).result;
            assert!((MIN_INTENSITY..=MAX_INTENSITY).contains(&r.intensity));
        }
    }

    #[test]
    fn raising_dominant_feature_never_lowers_score() {
        let mut rng = StdRng::seed_from_u64(3);
        for candidate in &CATALOG {
            let dominant = candidate.dominant_feature().expect("non-empty weights");
            for _ in 0..50 {
                let base = random_vector(&mut rng);
                let lo = base.get(dominant);
                let hi = rng.random_range(lo..=1.0);
                let before = candidate.score(&base);
                let after = candidate.score(&base.with(dominant, hi));
                assert!(
                    after + 1e-6 >= before,
                    "{:?}: {before} -> {after}",
                    candidate.tone
                );
            }
        }
    }

    #[test]
    fn strongest_weighted_candidate_beats_many_weak_ones() {
        // Moderate activation across the board vs. a single saturated profile:
        // argmax follows the strongest weighted sum, not the number of inputs lit.
        let features = Feature::ALL
            .iter()
            .fold(NormalizedFeatureVector::default(), |v, &f| v.with(f, 0.3))
            .with(Feature::AverageAmplitude, 1.0)
            .with(Feature::HighEnergyProxy, 1.0)
            .with(Feature::TempoEstimate, 1.0);
        let c = Classifier::default().classify(&features, &mut FixedJitter(1.0));
        assert_eq!(c.result.tone, Tone::Excited);
    }

    #[test]
    fn noise_floor_stays_quiet_under_adversarial_jitter() {
        // Saturated texture on a buffer whose samples all sit under the
        // silence threshold; quiet tones get the lowest draw, the rest the highest.
        let features = Feature::ALL
            .iter()
            .fold(NormalizedFeatureVector::default(), |v, &f| v.with(f, 1.0))
            .with(Feature::AverageAmplitude, VOICING_ONSET)
            .with(Feature::LowEnergyProxy, 0.001)
            .with(Feature::HighEnergyProxy, 0.001);
        let quiet = [Tone::Peaceful, Tone::Melancholic, Tone::Lonely];
        let classifier = Classifier::default();
        let mut jitter = SequenceJitter {
            values: classifier
                .candidates()
                .iter()
                .map(|c| if quiet.contains(&c.tone) { 0.8 } else { 1.2 })
                .collect(),
            next: 0,
        };
        let c = classifier.classify(&features, &mut jitter);
        assert_eq!(c.result.tone, Tone::Peaceful);
    }
}
