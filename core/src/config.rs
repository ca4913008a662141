//! Classification thresholds.
//!
//! Every business cutoff the classifiers use lives in `ClassificationConfig`
//! under a stable dotted name. The map is owned by whoever operates the
//! engine and may be replaced between passes. A pass reads it exactly once,
//! at pass start, into a `Thresholds` value and never looks names up per
//! record.
//!
//! RULE: no silent defaulting. A missing key fails the pass with
//! `ConfigMissing`; the previously published snapshot keeps serving.

use crate::error::{MetricsError, MetricsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Threshold names ──────────────────────────────────────────────────

pub const CLV_PLATINUM_MIN: &str = "clv.platinum_min";
pub const CLV_GOLD_MIN: &str = "clv.gold_min";
pub const CLV_SILVER_MIN: &str = "clv.silver_min";
pub const CLV_BRONZE_MIN: &str = "clv.bronze_min";

pub const STATUS_ACTIVE_DAYS: &str = "status.active_days";
pub const STATUS_AT_RISK_DAYS: &str = "status.at_risk_days";
pub const STATUS_CHURNING_DAYS: &str = "status.churning_days";

pub const PARETO_A_CUT: &str = "pareto.a_cut";
pub const PARETO_B_CUT: &str = "pareto.b_cut";

pub const CHURN_AT_RISK_FLOOR_DAYS: &str = "churn.at_risk_floor_days";

/// A single configured value. Money and share cutoffs are numbers,
/// recency windows are whole days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigValue {
    Number(f64),
    Days(u32),
}

/// Read interface over named thresholds.
pub trait ConfigSource {
    /// Look up `name`. Fails with `ConfigMissing` when undefined.
    fn get(&self, name: &str) -> MetricsResult<ConfigValue>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub thresholds: BTreeMap<String, ConfigValue>,
}

impl ClassificationConfig {
    /// Load from a JSON file of the form
    /// `{"thresholds": {"clv.gold_min": {"number": 20000.0}, ...}}`.
    /// In tests, use ClassificationConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: ClassificationConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let mut config = Self::default();
        config
            .set(CLV_PLATINUM_MIN, ConfigValue::Number(40_000.0))
            .set(CLV_GOLD_MIN, ConfigValue::Number(20_000.0))
            .set(CLV_SILVER_MIN, ConfigValue::Number(10_000.0))
            .set(CLV_BRONZE_MIN, ConfigValue::Number(5_000.0))
            .set(STATUS_ACTIVE_DAYS, ConfigValue::Days(30))
            .set(STATUS_AT_RISK_DAYS, ConfigValue::Days(60))
            .set(STATUS_CHURNING_DAYS, ConfigValue::Days(90))
            .set(PARETO_A_CUT, ConfigValue::Number(0.80))
            .set(PARETO_B_CUT, ConfigValue::Number(0.95))
            .set(CHURN_AT_RISK_FLOOR_DAYS, ConfigValue::Days(30));
        config
    }

    pub fn set(&mut self, name: &str, value: ConfigValue) -> &mut Self {
        self.thresholds.insert(name.to_string(), value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<ConfigValue> {
        self.thresholds.remove(name)
    }
}

impl ConfigSource for ClassificationConfig {
    fn get(&self, name: &str) -> MetricsResult<ConfigValue> {
        self.thresholds
            .get(name)
            .copied()
            .ok_or_else(|| MetricsError::ConfigMissing { key: name.to_string() })
    }
}

// ── Per-pass threshold bundle ────────────────────────────────────────

/// Minimum lifetime revenue for each tier. Anything below `bronze` is Basic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierLadder {
    pub platinum: f64,
    pub gold:     f64,
    pub silver:   f64,
    pub bronze:   f64,
}

/// Upper bounds (inclusive) of the recency windows, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusWindows {
    pub active_days:   i64,
    pub at_risk_days:  i64,
    pub churning_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParetoCuts {
    pub a_cut: f64,
    pub b_cut: f64,
}

/// Everything a pass needs, read once and validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub tiers:            TierLadder,
    pub status:           StatusWindows,
    pub pareto:           ParetoCuts,
    pub churn_floor_days: i64,
}

impl Thresholds {
    pub fn load(source: &dyn ConfigSource) -> MetricsResult<Self> {
        let tiers = TierLadder {
            platinum: number(source, CLV_PLATINUM_MIN)?,
            gold:     number(source, CLV_GOLD_MIN)?,
            silver:   number(source, CLV_SILVER_MIN)?,
            bronze:   number(source, CLV_BRONZE_MIN)?,
        };
        let status = StatusWindows {
            active_days:   days(source, STATUS_ACTIVE_DAYS)?,
            at_risk_days:  days(source, STATUS_AT_RISK_DAYS)?,
            churning_days: days(source, STATUS_CHURNING_DAYS)?,
        };
        let pareto = ParetoCuts {
            a_cut: number(source, PARETO_A_CUT)?,
            b_cut: number(source, PARETO_B_CUT)?,
        };
        let churn_floor_days = days(source, CHURN_AT_RISK_FLOOR_DAYS)?;

        let thresholds = Self { tiers, status, pareto, churn_floor_days };
        thresholds.validate()?;
        Ok(thresholds)
    }

    fn validate(&self) -> MetricsResult<()> {
        let t = &self.tiers;
        let ladder = [
            (CLV_PLATINUM_MIN, t.platinum),
            (CLV_GOLD_MIN, t.gold),
            (CLV_SILVER_MIN, t.silver),
            (CLV_BRONZE_MIN, t.bronze),
        ];
        for pair in ladder.windows(2) {
            let ((upper_key, upper), (lower_key, lower)) = (pair[0], pair[1]);
            if lower > upper {
                return Err(invalid(
                    lower_key,
                    format!("{lower} exceeds {upper_key}={upper}; tier ladder must not increase"),
                ));
            }
        }
        if t.bronze < 0.0 {
            return Err(invalid(CLV_BRONZE_MIN, "must be non-negative".into()));
        }

        let s = &self.status;
        if s.at_risk_days < s.active_days {
            return Err(invalid(STATUS_AT_RISK_DAYS, "must be >= status.active_days".into()));
        }
        if s.churning_days < s.at_risk_days {
            return Err(invalid(STATUS_CHURNING_DAYS, "must be >= status.at_risk_days".into()));
        }

        let p = &self.pareto;
        if !(p.a_cut > 0.0 && p.a_cut <= 1.0) {
            return Err(invalid(PARETO_A_CUT, format!("{} is outside (0, 1]", p.a_cut)));
        }
        if !(p.b_cut >= p.a_cut && p.b_cut <= 1.0) {
            return Err(invalid(PARETO_B_CUT, format!("{} is outside [a_cut, 1]", p.b_cut)));
        }
        Ok(())
    }
}

fn number(source: &dyn ConfigSource, key: &str) -> MetricsResult<f64> {
    match source.get(key)? {
        ConfigValue::Number(v) if v.is_finite() => Ok(v),
        ConfigValue::Number(v) => Err(invalid(key, format!("{v} is not finite"))),
        ConfigValue::Days(_) => Err(invalid(key, "expected a number, found days".into())),
    }
}

fn days(source: &dyn ConfigSource, key: &str) -> MetricsResult<i64> {
    match source.get(key)? {
        ConfigValue::Days(d) => Ok(i64::from(d)),
        ConfigValue::Number(_) => Err(invalid(key, "expected days, found a number".into())),
    }
}

fn invalid(key: &str, reason: String) -> MetricsError {
    MetricsError::InvalidConfig { key: key.to_string(), reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test_config_loads() {
        let t = Thresholds::load(&ClassificationConfig::default_test()).unwrap();
        assert_eq!(t.tiers.platinum, 40_000.0);
        assert_eq!(t.status.churning_days, 90);
        assert_eq!(t.pareto.b_cut, 0.95);
        assert_eq!(t.churn_floor_days, 30);
    }

    #[test]
    fn missing_key_is_config_missing() {
        let mut config = ClassificationConfig::default_test();
        config.remove(CLV_GOLD_MIN);
        match Thresholds::load(&config) {
            Err(MetricsError::ConfigMissing { key }) => assert_eq!(key, CLV_GOLD_MIN),
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn increasing_ladder_is_rejected() {
        let mut config = ClassificationConfig::default_test();
        config.set(CLV_SILVER_MIN, ConfigValue::Number(25_000.0));
        assert!(matches!(
            Thresholds::load(&config),
            Err(MetricsError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn wrong_value_kind_is_rejected() {
        let mut config = ClassificationConfig::default_test();
        config.set(STATUS_ACTIVE_DAYS, ConfigValue::Number(30.0));
        assert!(matches!(
            Thresholds::load(&config),
            Err(MetricsError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn parses_json_file_format() {
        let json = r#"{"thresholds": {
            "clv.platinum_min": {"number": 1000.0},
            "status.active_days": {"days": 14}
        }}"#;
        let config = ClassificationConfig::from_json(json).unwrap();
        assert_eq!(config.get(CLV_PLATINUM_MIN).unwrap(), ConfigValue::Number(1000.0));
        assert_eq!(config.get(STATUS_ACTIVE_DAYS).unwrap(), ConfigValue::Days(14));
    }

    #[test]
    fn unreadable_file_is_an_error_not_a_default() {
        let err = ClassificationConfig::load("./no/such/classification.json").unwrap_err();
        assert!(err.to_string().contains("no/such/classification.json"));
    }

    #[test]
    fn shipped_file_matches_test_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/classification.json");
        let config = ClassificationConfig::load(path).unwrap();
        assert_eq!(
            Thresholds::load(&config).unwrap(),
            Thresholds::load(&ClassificationConfig::default_test()).unwrap()
        );
    }
}
