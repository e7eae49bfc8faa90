//! Time-domain descriptors extracted from a decoded mono buffer.
//!
//! Every function here is total: buffers shorter than a window, empty
//! buffers and a zero sample rate all produce finite defaults.
//!
//! `spectral_centroid_proxy`, `low_energy_proxy` and `high_energy_proxy`
//! are heuristics over raw sample positions, not frequency-domain measures.
//! Their numeric behavior is kept stable so prior outputs stay comparable;
//! genuine spectral analysis belongs in a separate descriptor.

use crate::decode::SampleBuffer;
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "emotion::features";

pub const ENERGY_WINDOW: usize = 1024;
pub const CENTROID_WINDOW: usize = 2048;
pub const TEMPO_WINDOW_SECS: f32 = 0.1;
pub const TEMPO_PEAK_FACTOR: f32 = 1.5;
pub const PITCH_WINDOW: usize = 1024;
pub const PITCH_MIN_LAG: usize = 20;
pub const SILENCE_THRESHOLD: f32 = 0.01;
pub const BAND_PROXY_WINDOW: usize = 512;
pub const HIGH_BAND_OFFSET: f32 = 0.6;
pub const STABILITY_WINDOW: usize = 2048;
pub const BREATH_WINDOW_SECS: f32 = 0.5;
pub const BREATH_THRESHOLD: f32 = 0.005;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    pub average_amplitude: f32,
    pub energy_variance: f32,
    pub zero_crossing_rate: f32,
    pub spectral_centroid_proxy: f32,
    /// Energy peaks per minute.
    pub tempo_estimate: f32,
    pub pitch_variation: f32,
    pub silence_ratio: f32,
    pub low_energy_proxy: f32,
    pub high_energy_proxy: f32,
    pub voice_stability: f32,
    pub breathing_irregularity: f32,
    pub duration_seconds: f32,
}

impl FeatureVector {
    pub fn extract(buffer: &SampleBuffer) -> Self {
        let samples = buffer.samples();
        let sample_rate = buffer.sample_rate();
        let duration_seconds = if sample_rate == 0 {
            0.0
        } else {
            samples.len() as f32 / sample_rate as f32
        };

        let features = Self {
            average_amplitude: average_amplitude(samples),
            energy_variance: energy_variance(samples),
            zero_crossing_rate: zero_crossing_rate(samples),
            spectral_centroid_proxy: spectral_centroid_proxy(samples, sample_rate),
            tempo_estimate: tempo_estimate(samples, sample_rate, duration_seconds),
            pitch_variation: pitch_variation(samples),
            silence_ratio: silence_ratio(samples),
            low_energy_proxy: low_energy_proxy(samples),
            high_energy_proxy: high_energy_proxy(samples),
            voice_stability: voice_stability(samples),
            breathing_irregularity: breathing_irregularity(samples, sample_rate),
            duration_seconds,
        }
        .finite();

        tracing::debug!(
            target: LOG_TARGET,
            samples = samples.len(),
            sample_rate,
            average_amplitude = features.average_amplitude,
            energy_variance = features.energy_variance,
            zero_crossing_rate = features.zero_crossing_rate,
            tempo_estimate = features.tempo_estimate,
            pitch_variation = features.pitch_variation,
            silence_ratio = features.silence_ratio,
            voice_stability = features.voice_stability,
            "extracted features"
        );

        features
    }

    fn finite(self) -> Self {
        let f = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            average_amplitude: f(self.average_amplitude),
            energy_variance: f(self.energy_variance),
            zero_crossing_rate: f(self.zero_crossing_rate),
            spectral_centroid_proxy: f(self.spectral_centroid_proxy),
            tempo_estimate: f(self.tempo_estimate),
            pitch_variation: f(self.pitch_variation),
            silence_ratio: f(self.silence_ratio),
            low_energy_proxy: f(self.low_energy_proxy),
            high_energy_proxy: f(self.high_energy_proxy),
            voice_stability: f(self.voice_stability),
            breathing_irregularity: f(self.breathing_irregularity),
            duration_seconds: f(self.duration_seconds),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn mean_square(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum::<f64>() / samples.len() as f64
}

fn window_len(sample_rate: u32, seconds: f32) -> Option<usize> {
    let len = (sample_rate as f32 * seconds) as usize;
    (len > 0).then_some(len)
}

pub fn average_amplitude(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s.abs())).sum();
    (sum / samples.len() as f64) as f32
}

pub fn energy_variance(samples: &[f32]) -> f32 {
    let energies: Vec<f64> = samples.chunks_exact(ENERGY_WINDOW).map(mean_square).collect();
    if energies.len() < 2 {
        return 0.0;
    }
    std_dev(&energies) as f32
}

pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

/// Magnitude-weighted mean of `index -> frequency` over the leading window.
/// Index `i` of an `m`-sample window maps to `i * sample_rate / (2m)`.
pub fn spectral_centroid_proxy(samples: &[f32], sample_rate: u32) -> f32 {
    let m = samples.len().min(CENTROID_WINDOW);
    if m == 0 {
        return 0.0;
    }
    let bin_hz = f64::from(sample_rate) / (2.0 * m as f64);
    let (weighted, total) = samples[..m]
        .iter()
        .enumerate()
        .fold((0.0f64, 0.0f64), |(w, t), (i, &s)| {
            let mag = f64::from(s.abs());
            (w + i as f64 * bin_hz * mag, t + mag)
        });
    if total <= 0.0 {
        return 0.0;
    }
    (weighted / total) as f32
}

/// Local 100ms-energy maxima above `1.5 x mean`, scaled to a per-minute rate.
pub fn tempo_estimate(samples: &[f32], sample_rate: u32, duration_seconds: f32) -> f32 {
    let Some(window) = window_len(sample_rate, TEMPO_WINDOW_SECS) else {
        return 0.0;
    };
    if duration_seconds <= 0.0 {
        return 0.0;
    }
    let energies: Vec<f64> = samples.chunks_exact(window).map(mean_square).collect();
    let avg = mean(&energies);
    if avg <= 0.0 {
        return 0.0;
    }
    let threshold = avg * f64::from(TEMPO_PEAK_FACTOR);
    let peaks = (0..energies.len())
        .filter(|&i| {
            let e = energies[i];
            let prev = if i == 0 { 0.0 } else { energies[i - 1] };
            let next = energies.get(i + 1).copied().unwrap_or(0.0);
            e > threshold && e > prev && e >= next
        })
        .count();
    peaks as f32 / duration_seconds * 60.0
}

/// Lag with the strongest positive autocorrelation in `PITCH_MIN_LAG..window/2`.
fn dominant_period(window: &[f32]) -> Option<usize> {
    let max_lag = window.len() / 2;
    let mut best: Option<(usize, f64)> = None;
    for lag in PITCH_MIN_LAG..max_lag {
        let corr: f64 = window[..window.len() - lag]
            .iter()
            .zip(&window[lag..])
            .map(|(&a, &b)| f64::from(a) * f64::from(b))
            .sum();
        if corr > 0.0 && best.is_none_or(|(_, c)| corr > c) {
            best = Some((lag, corr));
        }
    }
    best.map(|(lag, _)| lag)
}

/// Coefficient of variation of per-window dominant periods.
pub fn pitch_variation(samples: &[f32]) -> f32 {
    let periods: Vec<f64> = samples
        .chunks_exact(PITCH_WINDOW)
        .filter_map(dominant_period)
        .map(|p| p as f64)
        .collect();
    if periods.len() < 2 {
        return 0.0;
    }
    let m = mean(&periods);
    if m <= 0.0 {
        return 0.0;
    }
    (std_dev(&periods) / m) as f32
}

/// An empty buffer counts as fully silent.
pub fn silence_ratio(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 1.0;
    }
    let silent = samples.iter().filter(|s| s.abs() < SILENCE_THRESHOLD).count();
    silent as f32 / samples.len() as f32
}

pub fn low_energy_proxy(samples: &[f32]) -> f32 {
    let end = samples.len().min(BAND_PROXY_WINDOW);
    mean_square(&samples[..end]) as f32
}

pub fn high_energy_proxy(samples: &[f32]) -> f32 {
    let start = (samples.len() as f32 * HIGH_BAND_OFFSET) as usize;
    let start = start.min(samples.len());
    let end = (start + BAND_PROXY_WINDOW).min(samples.len());
    mean_square(&samples[start..end]) as f32
}

/// Mean of `1 / (1 + 10 * stddev(|s|))` over 2048-sample windows. A buffer
/// shorter than one window is scored as a single window.
pub fn voice_stability(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let score = |window: &[f32]| {
        let mags: Vec<f64> = window.iter().map(|&s| f64::from(s.abs())).collect();
        1.0 / (1.0 + 10.0 * std_dev(&mags))
    };
    let scores: Vec<f64> = if samples.len() < STABILITY_WINDOW {
        vec![score(samples)]
    } else {
        samples.chunks_exact(STABILITY_WINDOW).map(score).collect()
    };
    mean(&scores) as f32
}

/// Spread of the near-silent fraction across 500ms windows.
pub fn breathing_irregularity(samples: &[f32], sample_rate: u32) -> f32 {
    let Some(window) = window_len(sample_rate, BREATH_WINDOW_SECS) else {
        return 0.0;
    };
    let fractions: Vec<f64> = samples
        .chunks_exact(window)
        .map(|w| w.iter().filter(|s| s.abs() < BREATH_THRESHOLD).count() as f64 / w.len() as f64)
        .collect();
    if fractions.len() < 2 {
        return 0.0;
    }
    std_dev(&fractions) as f32
}
