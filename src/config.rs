use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule strength measure used for gating rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Support,
    Confidence,
    Lift,
    Leverage,
    Conviction,
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "support" => Ok(Metric::Support),
            "confidence" => Ok(Metric::Confidence),
            "lift" => Ok(Metric::Lift),
            "leverage" => Ok(Metric::Leverage),
            "conviction" => Ok(Metric::Conviction),
            _ => Err(ConfigError::UnknownMetric(s.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Support => "support",
            Metric::Confidence => "confidence",
            Metric::Lift => "lift",
            Metric::Leverage => "leverage",
            Metric::Conviction => "conviction",
        };
        f.write_str(name)
    }
}

/// How candidate support is counted within one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountingStrategy {
    /// Intersect the per-item transaction id lists of the candidate's members.
    #[default]
    Inverted,
    /// Scan transaction shards and test every candidate for membership.
    Scan,
}

impl FromStr for CountingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inverted" => Ok(CountingStrategy::Inverted),
            "scan" => Ok(CountingStrategy::Scan),
            _ => Err(ConfigError::UnknownCounting(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub min_support: f64,
    /// Presentation bound; mining itself never drops short itemsets.
    pub min_length: usize,
    /// Stops the level-wise search once itemsets reach this size.
    pub max_length: Option<usize>,
    pub counting: CountingStrategy,
    pub show_progress: bool,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_support: 0.02,
            min_length: 1,
            max_length: None,
            counting: CountingStrategy::default(),
            show_progress: false,
        }
    }
}

impl MiningConfig {
    pub fn new(min_support: f64) -> Self {
        Self {
            min_support,
            ..Self::default()
        }
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_counting(mut self, counting: CountingStrategy) -> Self {
        self.counting = counting;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // also rejects NaN
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(ConfigError::MinSupportOutOfRange(self.min_support));
        }
        if self.min_length == 0 {
            return Err(ConfigError::MinLengthZero);
        }
        if let Some(max) = self.max_length {
            if max < self.min_length {
                return Err(ConfigError::LengthBoundsInverted {
                    min: self.min_length,
                    max,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub metric: Metric,
    pub min_threshold: f64,
    pub top_k: usize,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Confidence,
            min_threshold: 0.8,
            top_k: 10,
        }
    }
}

impl RuleConfig {
    pub fn new(metric: Metric, min_threshold: f64) -> Self {
        Self {
            metric,
            min_threshold,
            ..Self::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let value = self.min_threshold;
        let in_range = match self.metric {
            Metric::Support | Metric::Confidence => (0.0..=1.0).contains(&value),
            Metric::Lift | Metric::Conviction => value.is_finite() && value >= 0.0,
            Metric::Leverage => value.is_finite(),
        };
        if in_range {
            Ok(())
        } else {
            Err(ConfigError::ThresholdOutOfRange {
                metric: self.metric,
                value,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mining: MiningConfig,
    pub rules: RuleConfig,
}

/// Rules are gated on support at the mining threshold unless told otherwise.
impl Default for Config {
    fn default() -> Self {
        let mining = MiningConfig::default();
        let rules = RuleConfig::new(Metric::Support, mining.min_support);
        Self { mining, rules }
    }
}

impl Config {
    /// Reads `MIN_SUPPORT`, `MIN_LENGTH`, `MAX_LENGTH`, `COUNTING`, `SHOW_PROGRESS`,
    /// `RULE_METRIC`, `RULE_MIN_THRESHOLD` and `TOP_K`. Unset variables keep their
    /// defaults; malformed ones are rejected.
    ///
    /// Without `RULE_METRIC` rules are gated on support. Without
    /// `RULE_MIN_THRESHOLD` a support gate uses `MIN_SUPPORT` and any other
    /// metric uses the [`RuleConfig`] default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(v) = parse_var(&lookup, "MIN_SUPPORT")? {
            config.mining.min_support = v;
        }
        if let Some(v) = parse_var(&lookup, "MIN_LENGTH")? {
            config.mining.min_length = v;
        }
        if let Some(v) = parse_var(&lookup, "MAX_LENGTH")? {
            config.mining.max_length = Some(v);
        }
        if let Some(v) = lookup("COUNTING") {
            config.mining.counting = v.parse()?;
        }
        if let Some(v) = parse_var(&lookup, "SHOW_PROGRESS")? {
            config.mining.show_progress = v;
        }
        if let Some(v) = lookup("RULE_METRIC") {
            config.rules.metric = v.parse()?;
        }
        config.rules.min_threshold = match parse_var(&lookup, "RULE_MIN_THRESHOLD")? {
            Some(v) => v,
            None if config.rules.metric == Metric::Support => config.mining.min_support,
            None => RuleConfig::default().min_threshold,
        };
        if let Some(v) = parse_var(&lookup, "TOP_K")? {
            config.rules.top_k = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mining.validate()?;
        self.rules.validate()
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}
