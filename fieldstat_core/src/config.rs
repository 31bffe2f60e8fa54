//! Engine configuration management via TOML files.
//!
//! This module provides configuration parsing from TOML format with
//! sensible defaults: significance level, dependent-variable transform,
//! report decimals, and the calendar format used by supply status strings.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::anova::Transform;

/// Analysis configuration loaded from a TOML `[analysis]` section.
///
/// # Examples
///
/// ```
/// use fieldstat_core::AnalysisConfig;
///
/// let config = AnalysisConfig::from_toml_str("[analysis]\nalpha = 0.01")
///     .unwrap_or_default();
/// assert!((config.alpha - 0.01).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisConfig {
    /// Significance level for critical values and power
    pub alpha: f64,
    /// Dependent-variable transform applied before any statistic
    pub transform: Transform,
    /// Decimal places in rendered reports
    pub decimals: usize,
    /// Calendar format for supply status strings
    pub date_format: String,
}

impl AnalysisConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let raw = raw.analysis;

        if !raw.alpha.is_finite() || raw.alpha <= 0.0 || raw.alpha >= 1.0 {
            return Err(ConfigError::Parse(
                "analysis.alpha must be inside (0, 1)".into(),
            ));
        }
        let transform = Transform::from_str(&raw.transform)
            .map_err(|_| ConfigError::Parse(format!("unknown transform '{}'", raw.transform)))?;
        if raw.decimals > 6 {
            return Err(ConfigError::Parse("analysis.decimals must be <= 6".into()));
        }
        if raw.date_format.is_empty() {
            return Err(ConfigError::Parse(
                "analysis.date_format must be non-empty".into(),
            ));
        }

        Ok(Self {
            alpha: raw.alpha,
            transform,
            decimals: raw.decimals,
            date_format: raw.date_format,
        })
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            transform: Transform::None,
            decimals: default_decimals(),
            date_format: default_date_format(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    analysis: RawAnalysis,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default = "default_alpha")]
    alpha: f64,
    #[serde(default = "default_transform")]
    transform: String,
    #[serde(default = "default_decimals")]
    decimals: usize,
    #[serde(default = "default_date_format")]
    date_format: String,
}

impl Default for RawAnalysis {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            transform: default_transform(),
            decimals: default_decimals(),
            date_format: default_date_format(),
        }
    }
}

fn default_alpha() -> f64 {
    0.05
}

fn default_transform() -> String {
    "none".to_string()
}

fn default_decimals() -> usize {
    3
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}
