use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::TrackerError;
use super::types::validate_probability;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BktParams {
    /// Prior probability the skill is already known.
    pub p_init: f64,
    /// Chance of learning the skill on one practice opportunity.
    pub p_transit: f64,
    /// Chance of answering wrong despite mastery.
    pub p_slip: f64,
    /// Chance of answering right without mastery.
    pub p_guess: f64,
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            p_init: 0.3,
            p_transit: 0.1,
            p_slip: 0.1,
            p_guess: 0.2,
        }
    }
}

impl BktParams {
    pub fn new(p_init: f64, p_transit: f64, p_slip: f64, p_guess: f64) -> Result<Self, TrackerError> {
        let params = Self {
            p_init,
            p_transit,
            p_slip,
            p_guess,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        validate_probability("p_init", self.p_init)?;
        validate_probability("p_transit", self.p_transit)?;
        validate_probability("p_slip", self.p_slip)?;
        validate_probability("p_guess", self.p_guess)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    pub defaults: BktParams,
    #[serde(default)]
    pub skill_overrides: HashMap<String, BktParams>,
    pub mastery_threshold: f64,
    /// Consecutive same-outcome answers needed to move one band.
    pub streak_length: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            defaults: BktParams::default(),
            skill_overrides: HashMap::new(),
            mastery_threshold: 0.95,
            streak_length: 2,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self, TrackerError> {
        let mut config = Self::default();

        if let Some(v) = env_f64("BKT_P_INIT")? {
            config.defaults.p_init = v;
        }
        if let Some(v) = env_f64("BKT_P_TRANSIT")? {
            config.defaults.p_transit = v;
        }
        if let Some(v) = env_f64("BKT_P_SLIP")? {
            config.defaults.p_slip = v;
        }
        if let Some(v) = env_f64("BKT_P_GUESS")? {
            config.defaults.p_guess = v;
        }
        if let Some(v) = env_f64("MASTERY_THRESHOLD")? {
            config.mastery_threshold = v;
        }
        if let Ok(val) = std::env::var("DIFFICULTY_STREAK") {
            config.streak_length = val.trim().parse().map_err(|_| TrackerError::InvalidEnv {
                key: "DIFFICULTY_STREAK",
                value: val.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        self.defaults.validate()?;
        for params in self.skill_overrides.values() {
            params.validate()?;
        }
        validate_probability("mastery_threshold", self.mastery_threshold)?;
        if self.streak_length == 0 {
            return Err(TrackerError::ZeroStreak);
        }
        Ok(())
    }

    pub fn params_for(&self, skill_id: &str) -> &BktParams {
        self.skill_overrides.get(skill_id).unwrap_or(&self.defaults)
    }

    pub fn with_override(mut self, skill_id: impl Into<String>, params: BktParams) -> Self {
        self.skill_overrides.insert(skill_id.into(), params);
        self
    }
}

fn env_f64(key: &'static str) -> Result<Option<f64>, TrackerError> {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| TrackerError::InvalidEnv { key, value: val }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mastery_threshold, 0.95);
        assert_eq!(config.streak_length, 2);
        assert_eq!(config.defaults.p_init, 0.3);
    }

    #[test]
    fn rejects_out_of_range_params() {
        assert_eq!(
            BktParams::new(0.3, 1.2, 0.1, 0.2),
            Err(TrackerError::OutOfRange {
                name: "p_transit",
                value: 1.2
            })
        );
        assert!(BktParams::new(0.3, 0.1, -0.1, 0.2).is_err());
        assert!(BktParams::new(0.3, 0.1, 0.1, f64::NAN).is_err());
    }

    #[test]
    fn rejects_zero_streak_and_bad_threshold() {
        let config = TrackerConfig {
            streak_length: 0,
            ..TrackerConfig::default()
        };
        assert_eq!(config.validate(), Err(TrackerError::ZeroStreak));

        let config = TrackerConfig {
            mastery_threshold: 1.01,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn override_applies_to_single_skill() {
        let strict = BktParams::new(0.1, 0.05, 0.05, 0.05).unwrap();
        let config = TrackerConfig::default().with_override("loops", strict);
        assert_eq!(config.params_for("loops"), &strict);
        assert_eq!(config.params_for("variables"), &BktParams::default());
    }

    #[test]
    fn invalid_override_fails_validation() {
        let bad = BktParams {
            p_slip: 2.0,
            ..BktParams::default()
        };
        let config = TrackerConfig::default().with_override("loops", bad);
        assert!(config.validate().is_err());
    }
}
