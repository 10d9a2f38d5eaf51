use thiserror::Error;

use crate::config::Metric;

/// Rejected configuration. Raised before any mining work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("min_support must be in (0, 1], got {0}")]
    MinSupportOutOfRange(f64),

    #[error("min_length must be at least 1")]
    MinLengthZero,

    #[error("max_length ({max}) is smaller than min_length ({min})")]
    LengthBoundsInverted { min: usize, max: usize },

    #[error("threshold {value} is out of range for metric {metric}")]
    ThresholdOutOfRange { metric: Metric, value: f64 },

    #[error("unknown rule metric `{0}`, expected support, confidence, lift, leverage or conviction")]
    UnknownMetric(String),

    #[error("unknown counting strategy `{0}`, expected inverted or scan")]
    UnknownCounting(String),

    #[error("environment variable {var} has invalid value `{value}`")]
    InvalidEnv { var: &'static str, value: String },
}

/// Raised while mining. Configuration is validated earlier, when the miner is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MineError {
    #[error("mining cancelled after {completed_levels} completed level(s)")]
    Cancelled { completed_levels: usize },
}
