//! Batch run configuration from environment.
//!
//! Rules start from defaults, are replaced by the JSON file named in
//! `AIRPROX_RULES` when set, then individual thresholds are overridden by
//! their own variables. Command line flags are applied on top by the binary.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use airprox_core::DetectionRules;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub log_dir: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub rules: DetectionRules,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut rules = match lookup("AIRPROX_RULES") {
            Some(path) => load_rules_file(&path)?,
            None => DetectionRules::default(),
        };
        if let Some(ft) = parse_var(&lookup, "AIRPROX_HORIZONTAL_FT")? {
            rules.horizontal_threshold_ft = ft;
        }
        if let Some(ft) = parse_var(&lookup, "AIRPROX_VERTICAL_FT")? {
            rules.vertical_threshold_ft = ft;
        }
        if let Some(secs) = parse_var(&lookup, "AIRPROX_WINDOW_SECS")? {
            rules.time_window_seconds = secs;
        }

        Ok(Self {
            input_path: lookup("AIRPROX_INPUT")
                .unwrap_or_else(|| "ARIA_flight_data.csv".to_string())
                .into(),
            output_path: lookup("AIRPROX_OUTPUT")
                .unwrap_or_else(|| "traffic_conflicts.csv".to_string())
                .into(),
            log_dir: lookup("AIRPROX_LOG_DIR")
                .unwrap_or_else(|| "conflict_logs".to_string())
                .into(),
            summary_path: lookup("AIRPROX_SUMMARY").map(PathBuf::from),
            rules,
        })
    }
}

/// Load detection rules from JSON. Missing keys keep their defaults.
pub fn load_rules_file(path: impl AsRef<Path>) -> Result<DetectionRules> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading rules file {}", path.display()))?;
    let rules: DetectionRules = serde_json::from_str(&text)
        .with_context(|| format!("parsing rules file {}", path.display()))?;
    Ok(rules)
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has invalid value {:?}", key, raw))
        })
        .transpose()
}
