use std::env;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use crate::exec::{FinishPolicy, DEFAULT_IDLE_TICKS};
use crate::resolve::IdKind;

pub const TEST_PLAN_ENV_VAR: &str = "VRAGENT_TEST_PLAN";
pub const ID_KIND_ENV_VAR: &str = "VRAGENT_ID_KIND";
pub const EXIT_AFTER_TESTING_ENV_VAR: &str = "VRAGENT_EXIT_AFTER_TESTING";
pub const IDLE_TICKS_ENV_VAR: &str = "VRAGENT_IDLE_TICKS";

pub const DEFAULT_TEST_PLAN_PATH: &str = "test_plan.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub test_plan_path: PathBuf,
    pub id_kind: IdKind,
    pub finish_policy: FinishPolicy,
    pub idle_ticks: u32,
    pub ticks_per_second: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            test_plan_path: PathBuf::from(DEFAULT_TEST_PLAN_PATH),
            id_kind: IdKind::FileId,
            finish_policy: FinishPolicy::Loop,
            idle_ticks: DEFAULT_IDLE_TICKS,
            ticks_per_second: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {env_var}: {reason}")]
    InvalidValue {
        env_var: &'static str,
        value: String,
        reason: String,
    },
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match env::var(key) {
            Ok(value) => Some(value),
            Err(env::VarError::NotPresent) => None,
            Err(error) => {
                warn!(env_var = key, error = %error, "unable to read env var; using default");
                None
            }
        })
    }

    /// Applies overrides from `lookup` on top of the defaults. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = read(TEST_PLAN_ENV_VAR) {
            config.test_plan_path = PathBuf::from(path.trim());
        }
        if let Some(raw) = read(ID_KIND_ENV_VAR) {
            config.id_kind = raw
                .parse::<IdKind>()
                .map_err(|reason| ConfigError::InvalidValue {
                    env_var: ID_KIND_ENV_VAR,
                    value: raw.clone(),
                    reason,
                })?;
        }
        if let Some(raw) = read(EXIT_AFTER_TESTING_ENV_VAR) {
            config.finish_policy = if parse_flag(EXIT_AFTER_TESTING_ENV_VAR, &raw)? {
                FinishPolicy::ExitAfterTesting
            } else {
                FinishPolicy::Loop
            };
        }
        if let Some(raw) = read(IDLE_TICKS_ENV_VAR) {
            config.idle_ticks = raw
                .trim()
                .parse::<u32>()
                .map_err(|error| ConfigError::InvalidValue {
                    env_var: IDLE_TICKS_ENV_VAR,
                    value: raw.clone(),
                    reason: error.to_string(),
                })?;
        }
        Ok(config)
    }
}

pub fn parse_flag(env_var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            env_var,
            value: raw.to_string(),
            reason: "expected 1, true, 0 or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = AgentConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.idle_ticks, 30);
        assert_eq!(config.test_plan_path, PathBuf::from("test_plan.json"));
    }

    #[test]
    fn applies_overrides() {
        let config = AgentConfig::from_lookup(lookup(&[
            (TEST_PLAN_ENV_VAR, "plans/kitchen.json"),
            (ID_KIND_ENV_VAR, "guid"),
            (EXIT_AFTER_TESTING_ENV_VAR, "true"),
            (IDLE_TICKS_ENV_VAR, "5"),
        ]))
        .expect("config");
        assert_eq!(config.test_plan_path, PathBuf::from("plans/kitchen.json"));
        assert_eq!(config.id_kind, IdKind::Guid);
        assert_eq!(config.finish_policy, FinishPolicy::ExitAfterTesting);
        assert_eq!(config.idle_ticks, 5);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config =
            AgentConfig::from_lookup(lookup(&[(TEST_PLAN_ENV_VAR, "  ")])).expect("config");
        assert_eq!(config.test_plan_path, PathBuf::from(DEFAULT_TEST_PLAN_PATH));
    }

    #[test]
    fn rejects_malformed_values() {
        let error = AgentConfig::from_lookup(lookup(&[(IDLE_TICKS_ENV_VAR, "soon")]))
            .expect_err("bad ticks");
        assert!(error.to_string().contains(IDLE_TICKS_ENV_VAR));

        let error = AgentConfig::from_lookup(lookup(&[(EXIT_AFTER_TESTING_ENV_VAR, "maybe")]))
            .expect_err("bad flag");
        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                env_var: EXIT_AFTER_TESTING_ENV_VAR,
                ..
            }
        ));
    }
}
