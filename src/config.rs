use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::data::filter::BoundsPolicy;

// ---------------------------------------------------------------------------
// Startup configuration
// ---------------------------------------------------------------------------

pub const DATA_VAR: &str = "INFLACAO_DATA";
pub const BOUNDS_VAR: &str = "INFLACAO_RANGE_BOUNDS";
pub const WATCH_VAR: &str = "INFLACAO_WATCH";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Dataset opened at startup.
    pub data_path: PathBuf,
    /// Table the range sliders take their bounds from.
    pub bounds_policy: BoundsPolicy,
    /// Reload automatically when the dataset changes on disk.
    pub watch_source: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("inflacao.csv"),
            bounds_policy: BoundsPolicy::YearFiltered,
            watch_source: false,
        }
    }
}

impl Config {
    /// Read the process environment; the first CLI argument overrides the path.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        if let Some(path) = std::env::args_os().nth(1) {
            config.data_path = PathBuf::from(path);
        }
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup(DATA_VAR).filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }
        if let Some(policy) = lookup(BOUNDS_VAR) {
            config.bounds_policy =
                parse_policy(&policy).with_context(|| format!("invalid {BOUNDS_VAR}"))?;
        }
        if let Some(flag) = lookup(WATCH_VAR) {
            config.watch_source = parse_flag(&flag).with_context(|| format!("invalid {WATCH_VAR}"))?;
        }
        Ok(config)
    }
}

fn parse_policy(s: &str) -> Result<BoundsPolicy> {
    match s.trim().to_ascii_lowercase().as_str() {
        "year" | "year-filtered" => Ok(BoundsPolicy::YearFiltered),
        "progressive" => Ok(BoundsPolicy::Progressive),
        other => bail!("expected 'year' or 'progressive', got '{other}'"),
    }
}

fn parse_flag(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(config_from(&[]).unwrap(), Config::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = config_from(&[
            (DATA_VAR, "/data/ipca.parquet"),
            (BOUNDS_VAR, "Progressive"),
            (WATCH_VAR, "yes"),
        ])
        .unwrap();
        assert_eq!(config.data_path, PathBuf::from("/data/ipca.parquet"));
        assert_eq!(config.bounds_policy, BoundsPolicy::Progressive);
        assert!(config.watch_source);
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = config_from(&[(BOUNDS_VAR, "all")]).unwrap_err();
        assert!(format!("{err:#}").contains(BOUNDS_VAR));
        assert!(config_from(&[(WATCH_VAR, "sometimes")]).is_err());
    }
}
