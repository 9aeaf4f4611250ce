//! Tunable thresholds for progression gating and validation.
//!
//! Defaults carry the documented heuristics. Each value can be overridden
//! through a `STORYLOOM_*` environment variable.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading configuration overrides.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// The variable name.
        key: &'static str,
        /// The raw value.
        value: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A variable parsed but is outside its allowed range.
    #[error("{key} must be {expected}, got {value}")]
    OutOfRange {
        /// The variable name.
        key: &'static str,
        /// The allowed range.
        expected: &'static str,
        /// The parsed value.
        value: String,
    },
}

/// Thresholds for chapter and act advancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Completed beats needed in the current chapter.
    pub min_beats_per_chapter: usize,
    /// Whether completed beats need linked character milestones.
    pub require_milestones: bool,
    /// Whether completed beats need linked world-state changes.
    pub require_world_changes: bool,
    /// Share of completed beats that must have a milestone.
    pub milestone_coverage: f64,
    /// Share of completed beats that must have a world change.
    pub world_change_coverage: f64,
    /// Average beats per chapter used for the remaining-beats estimate.
    pub beats_per_chapter_estimate: u32,
    /// Deadline for one generation call, in milliseconds.
    pub generation_timeout_ms: Option<u64>,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            min_beats_per_chapter: 2,
            require_milestones: true,
            require_world_changes: true,
            milestone_coverage: 0.8,
            world_change_coverage: 0.6,
            beats_per_chapter_estimate: 3,
            generation_timeout_ms: None,
        }
    }
}

impl ProgressionConfig {
    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a set variable is unparsable or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a set variable is unparsable or out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        override_from(
            &lookup,
            "STORYLOOM_MIN_BEATS_PER_CHAPTER",
            &mut config.min_beats_per_chapter,
        )?;
        override_from(&lookup, "STORYLOOM_REQUIRE_MILESTONES", &mut config.require_milestones)?;
        override_from(
            &lookup,
            "STORYLOOM_REQUIRE_WORLD_CHANGES",
            &mut config.require_world_changes,
        )?;
        override_from(&lookup, "STORYLOOM_MILESTONE_COVERAGE", &mut config.milestone_coverage)?;
        override_from(
            &lookup,
            "STORYLOOM_WORLD_CHANGE_COVERAGE",
            &mut config.world_change_coverage,
        )?;
        override_from(
            &lookup,
            "STORYLOOM_BEATS_PER_CHAPTER_ESTIMATE",
            &mut config.beats_per_chapter_estimate,
        )?;
        optional_override_from(
            &lookup,
            "STORYLOOM_GENERATION_TIMEOUT_MS",
            &mut config.generation_timeout_ms,
        )?;

        check_ratio("STORYLOOM_MILESTONE_COVERAGE", config.milestone_coverage)?;
        check_ratio("STORYLOOM_WORLD_CHANGE_COVERAGE", config.world_change_coverage)?;
        Ok(config)
    }

    /// The per-call generation deadline, if one is configured.
    #[must_use]
    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_ms.map(Duration::from_millis)
    }
}

/// Settings for the consistency validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Minimum overall score for a report to count as valid.
    pub valid_threshold: u32,
    /// Deadline for the coherence analysis call, in milliseconds.
    pub generation_timeout_ms: Option<u64>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            valid_threshold: 70,
            generation_timeout_ms: None,
        }
    }
}

impl ValidatorConfig {
    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a set variable is unparsable or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a set variable is unparsable or out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        override_from(&lookup, "STORYLOOM_VALID_THRESHOLD", &mut config.valid_threshold)?;
        optional_override_from(
            &lookup,
            "STORYLOOM_GENERATION_TIMEOUT_MS",
            &mut config.generation_timeout_ms,
        )?;

        if config.valid_threshold > 100 {
            return Err(ConfigError::OutOfRange {
                key: "STORYLOOM_VALID_THRESHOLD",
                expected: "between 0 and 100",
                value: config.valid_threshold.to_string(),
            });
        }
        Ok(config)
    }

    /// The coherence analysis deadline, if one is configured.
    #[must_use]
    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_owned(),
        reason: e.to_string(),
    })
}

fn override_from<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    target: &mut T,
) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = lookup(key) {
        *target = parse_value(key, &raw)?;
    }
    Ok(())
}

fn optional_override_from<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    target: &mut Option<T>,
) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = lookup(key) {
        *target = Some(parse_value(key, &raw)?);
    }
    Ok(())
}

fn check_ratio(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            expected: "between 0.0 and 1.0",
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_progression_defaults_match_documented_heuristics() {
        let config = ProgressionConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config, ProgressionConfig::default());
        assert_eq!(config.min_beats_per_chapter, 2);
        assert!((config.milestone_coverage - 0.8).abs() < f64::EPSILON);
        assert!((config.world_change_coverage - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.beats_per_chapter_estimate, 3);
        assert!(config.generation_timeout().is_none());
    }

    #[test]
    fn test_progression_overrides_are_applied() {
        let lookup = lookup_from(&[
            ("STORYLOOM_MIN_BEATS_PER_CHAPTER", "4"),
            ("STORYLOOM_REQUIRE_MILESTONES", "false"),
            ("STORYLOOM_GENERATION_TIMEOUT_MS", "2500"),
        ]);

        let config = ProgressionConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.min_beats_per_chapter, 4);
        assert!(!config.require_milestones);
        assert!(config.require_world_changes);
        assert_eq!(config.generation_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_unparsable_override_is_rejected() {
        let lookup = lookup_from(&[("STORYLOOM_REQUIRE_WORLD_CHANGES", "sometimes")]);

        let err = ProgressionConfig::from_lookup(lookup).unwrap_err();

        match err {
            ConfigError::Invalid { key, value, .. } => {
                assert_eq!(key, "STORYLOOM_REQUIRE_WORLD_CHANGES");
                assert_eq!(value, "sometimes");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_coverage_outside_unit_interval_is_rejected() {
        let lookup = lookup_from(&[("STORYLOOM_MILESTONE_COVERAGE", "1.5")]);

        let err = ProgressionConfig::from_lookup(lookup).unwrap_err();

        assert!(matches!(err, ConfigError::OutOfRange { key: "STORYLOOM_MILESTONE_COVERAGE", .. }));
    }

    #[test]
    fn test_validator_threshold_override() {
        let config =
            ValidatorConfig::from_lookup(lookup_from(&[("STORYLOOM_VALID_THRESHOLD", "80")]))
                .unwrap();
        assert_eq!(config.valid_threshold, 80);

        let err =
            ValidatorConfig::from_lookup(lookup_from(&[("STORYLOOM_VALID_THRESHOLD", "120")]));
        assert!(err.is_err());
    }
}
