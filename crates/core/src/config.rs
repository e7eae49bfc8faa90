use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_JITTER_MIN: f32 = 0.8;
pub const DEFAULT_JITTER_MAX: f32 = 1.2;
pub const ENV_JITTER_SEED: &str = "TONE_JITTER_SEED";
pub const ENV_JITTER_MIN: &str = "TONE_JITTER_MIN";
pub const ENV_JITTER_MAX: &str = "TONE_JITTER_MAX";
pub const ENV_DECODE_SAMPLE_RATE: &str = "TONE_DECODE_SAMPLE_RATE";

/// Bounds of the per-candidate score multiplier.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct JitterRange {
    min: f32,
    max: f32,
}

impl JitterRange {
    pub fn new(min: f32, max: f32) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() || min <= 0.0 {
            return Err(ConfigError::InvalidJitter { min, max });
        }
        if min > max {
            return Err(ConfigError::InvalidJitter { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }
}

impl Default for JitterRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_JITTER_MIN,
            max: DEFAULT_JITTER_MAX,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub jitter: JitterRange,
    /// Fixed jitter seed. `None` seeds every analysis from the clock.
    pub seed: Option<u64>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("jitter range must satisfy 0 < min <= max (got {min}..={max})")]
    InvalidJitter { min: f32, max: f32 },
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// CLI value, else parsed env value, else `None`.
pub fn resolve_parsed<T: FromStr>(
    cli_value: Option<T>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<T>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(v)),
        None => match env.var(env_key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    key: env_key.to_owned(),
                    value: raw,
                }),
            None => Ok(None),
        },
    }
}

pub fn resolve_parsed_with_default<T: FromStr>(
    cli_value: Option<T>,
    env_key: &str,
    env: &impl Env,
    default: T,
) -> Result<T, ConfigError> {
    Ok(resolve_parsed(cli_value, env_key, env)?.unwrap_or(default))
}

pub fn resolve_engine_config(
    seed: Option<u64>,
    jitter_min: Option<f32>,
    jitter_max: Option<f32>,
    env: &impl Env,
) -> Result<EngineConfig, ConfigError> {
    let seed = resolve_parsed(seed, ENV_JITTER_SEED, env)?;
    let min = resolve_parsed_with_default(jitter_min, ENV_JITTER_MIN, env, DEFAULT_JITTER_MIN)?;
    let max = resolve_parsed_with_default(jitter_max, ENV_JITTER_MAX, env, DEFAULT_JITTER_MAX)?;
    Ok(EngineConfig {
        jitter: JitterRange::new(min, max)?,
        seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_cli_takes_precedence_over_env() {
        let env = MapEnv::default().with_var(ENV_JITTER_SEED, "99");
        let cfg = resolve_engine_config(Some(7), None, None, &env).expect("valid config");
        assert_eq!(cfg.seed, Some(7));
    }

    #[test]
    fn seed_env_used_when_cli_missing() {
        let env = MapEnv::default().with_var(ENV_JITTER_SEED, " 99 ");
        let cfg = resolve_engine_config(None, None, None, &env).expect("valid config");
        assert_eq!(cfg.seed, Some(99));
    }

    #[test]
    fn defaults_used_when_both_missing() {
        let cfg = resolve_engine_config(None, None, None, &MapEnv::default()).expect("valid");
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.jitter.min(), DEFAULT_JITTER_MIN);
        assert_eq!(cfg.jitter.max(), DEFAULT_JITTER_MAX);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn jitter_bounds_mix_cli_and_env() {
        let env = MapEnv::default()
            .with_var(ENV_JITTER_MIN, "0.95")
            .with_var(ENV_JITTER_MAX, "1.5");
        let cfg = resolve_engine_config(None, None, Some(1.05), &env).expect("valid");
        assert_eq!(cfg.jitter.min(), 0.95);
        assert_eq!(cfg.jitter.max(), 1.05);
    }

    #[test]
    fn unparsable_env_value_is_reported() {
        let env = MapEnv::default().with_var(ENV_JITTER_SEED, "soon");
        let err = resolve_engine_config(None, None, None, &env).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_JITTER_SEED.to_owned(),
                value: "soon".to_owned(),
            }
        );
    }

    #[test]
    fn jitter_range_rejects_bad_bounds() {
        assert!(JitterRange::new(1.2, 0.8).is_err());
        assert!(JitterRange::new(0.0, 1.0).is_err());
        assert!(JitterRange::new(f32::NAN, 1.0).is_err());
        assert!(JitterRange::new(1.0, f32::INFINITY).is_err());
        assert!(JitterRange::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn sample_rate_resolution_falls_back_to_default() {
        let env = MapEnv::default().with_var(ENV_DECODE_SAMPLE_RATE, "16000");
        let rate = resolve_parsed_with_default(None, ENV_DECODE_SAMPLE_RATE, &env, 44_100u32)
            .expect("valid");
        assert_eq!(rate, 16_000);
        let rate = resolve_parsed_with_default(None, ENV_DECODE_SAMPLE_RATE, &MapEnv::default(), 44_100u32)
            .expect("valid");
        assert_eq!(rate, 44_100);
    }
}
