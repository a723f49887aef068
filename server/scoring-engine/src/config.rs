//! Engine configuration with sane defaults.

use std::time::Duration;

use crate::error::ScoringError;

/// Scoring rules and storage limits.
#[derive(Debug, Clone)]
pub struct Config {
  /// Overs per innings when a fixture does not specify a format.
  pub default_max_overs: u32,
  /// Penalty runs for a wide, added to the score and charged to the bowler.
  pub wide_penalty: u32,
  /// Penalty runs for a no-ball, added to the score and charged to the bowler.
  pub no_ball_penalty: u32,
  /// Wickets that close an innings (all out).
  pub all_out_wickets: u32,
  /// Max time to wait for a match book lock before failing as retryable.
  pub storage_timeout: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      default_max_overs: 20,
      wide_penalty: 1,
      no_ball_penalty: 1,
      all_out_wickets: 10,
      storage_timeout: Duration::from_millis(250),
    }
  }
}

impl Config {
  /// Defaults overridden by `SCORING_*` environment variables.
  pub fn from_env() -> Result<Self, ScoringError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScoringError> {
    let mut config = Self::default();
    if let Some(v) = parse_var(&lookup, "SCORING_DEFAULT_MAX_OVERS")? {
      if v == 0 {
        return Err(ScoringError::Config(
          "SCORING_DEFAULT_MAX_OVERS must be at least 1".into(),
        ));
      }
      config.default_max_overs = v;
    }
    if let Some(v) = parse_var(&lookup, "SCORING_WIDE_PENALTY")? {
      config.wide_penalty = v;
    }
    if let Some(v) = parse_var(&lookup, "SCORING_NO_BALL_PENALTY")? {
      config.no_ball_penalty = v;
    }
    if let Some(v) = parse_var(&lookup, "SCORING_ALL_OUT_WICKETS")? {
      config.all_out_wickets = v;
    }
    if let Some(ms) = parse_var::<u64>(&lookup, "SCORING_STORAGE_TIMEOUT_MS")? {
      config.storage_timeout = Duration::from_millis(ms);
    }
    Ok(config)
  }
}

fn parse_var<T: std::str::FromStr>(
  lookup: &impl Fn(&str) -> Option<String>,
  key: &str,
) -> Result<Option<T>, ScoringError> {
  match lookup(key) {
    Some(raw) => raw
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| ScoringError::Config(format!("{} must be a non-negative integer, got {:?}", key, raw))),
    None => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn defaults_without_env() {
    let config = Config::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config.default_max_overs, 20);
    assert_eq!(config.all_out_wickets, 10);
    assert_eq!(config.storage_timeout, Duration::from_millis(250));
  }

  #[test]
  fn env_overrides_apply() {
    let config = Config::from_lookup(lookup(&[
      ("SCORING_DEFAULT_MAX_OVERS", "50"),
      ("SCORING_WIDE_PENALTY", "0"),
      ("SCORING_STORAGE_TIMEOUT_MS", " 1000 "),
    ]))
    .unwrap();
    assert_eq!(config.default_max_overs, 50);
    assert_eq!(config.wide_penalty, 0);
    assert_eq!(config.no_ball_penalty, 1);
    assert_eq!(config.storage_timeout, Duration::from_secs(1));
  }

  #[test]
  fn invalid_env_value_is_a_config_error() {
    let err = Config::from_lookup(lookup(&[("SCORING_ALL_OUT_WICKETS", "ten")])).unwrap_err();
    assert_eq!(err.kind(), "config");
    assert!(err.to_string().contains("SCORING_ALL_OUT_WICKETS"));

    let err = Config::from_lookup(lookup(&[("SCORING_DEFAULT_MAX_OVERS", "0")])).unwrap_err();
    assert!(err.to_string().contains("at least 1"));
  }
}
