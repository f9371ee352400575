//! Strategy profiles and their tunable parameters.

use crate::domain::error::PulseError;
use crate::ports::config_port::ConfigPort;
use std::fmt;
use std::str::FromStr;

/// Named rule set governing how signals are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleProfile {
    Strict,
    Relaxed,
    #[default]
    Momentum,
}

impl RuleProfile {
    /// RSI level below which buys are considered.
    pub fn buy_rsi(&self) -> f64 {
        match self {
            RuleProfile::Strict => 35.0,
            RuleProfile::Relaxed => 40.0,
            RuleProfile::Momentum => 45.0,
        }
    }

    /// RSI level above which sells are considered.
    pub fn sell_rsi(&self) -> f64 {
        match self {
            RuleProfile::Strict => 65.0,
            RuleProfile::Relaxed => 60.0,
            RuleProfile::Momentum => 65.0,
        }
    }
}

impl FromStr for RuleProfile {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(RuleProfile::Strict),
            "relaxed" => Ok(RuleProfile::Relaxed),
            "momentum" => Ok(RuleProfile::Momentum),
            other => Err(PulseError::ConfigInvalid {
                section: "strategy".into(),
                key: "profile".into(),
                reason: format!("unknown profile '{}'", other),
            }),
        }
    }
}

impl fmt::Display for RuleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleProfile::Strict => "strict",
            RuleProfile::Relaxed => "relaxed",
            RuleProfile::Momentum => "momentum",
        };
        write!(f, "{}", name)
    }
}

/// Full parameter set for signal classification, sizing and position
/// management. Defaults match the shipped configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyProfile {
    pub rules: RuleProfile,
    pub target_vol: f64,
    pub kelly_fraction: f64,
    pub win_rate: f64,
    pub payoff_ratio: f64,
    pub trailing_pct: f64,
    pub profit_lock_trigger: f64,
    pub profit_lock_floor: f64,
    pub scale_out_rsi: f64,
}

impl Default for StrategyProfile {
    fn default() -> Self {
        StrategyProfile {
            rules: RuleProfile::Momentum,
            target_vol: 0.30,
            kelly_fraction: 0.75,
            win_rate: 0.55,
            payoff_ratio: 2.0,
            trailing_pct: 0.10,
            profit_lock_trigger: 0.05,
            profit_lock_floor: 0.01,
            scale_out_rsi: 60.0,
        }
    }
}

impl StrategyProfile {
    /// Load from the `[strategy]` section, falling back to defaults for any
    /// key that is absent.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PulseError> {
        let defaults = StrategyProfile::default();
        let rules = match config.get_string("strategy", "profile") {
            Some(name) => name.parse()?,
            None => defaults.rules,
        };
        let profile = StrategyProfile {
            rules,
            target_vol: config.get_double("strategy", "target_vol", defaults.target_vol),
            kelly_fraction: config.get_double(
                "strategy",
                "kelly_fraction",
                defaults.kelly_fraction,
            ),
            win_rate: config.get_double("strategy", "win_rate", defaults.win_rate),
            payoff_ratio: config.get_double("strategy", "payoff_ratio", defaults.payoff_ratio),
            trailing_pct: config.get_double("strategy", "trailing_pct", defaults.trailing_pct),
            profit_lock_trigger: config.get_double(
                "strategy",
                "profit_lock_trigger",
                defaults.profit_lock_trigger,
            ),
            profit_lock_floor: config.get_double(
                "strategy",
                "profit_lock_floor",
                defaults.profit_lock_floor,
            ),
            scale_out_rsi: config.get_double("strategy", "scale_out_rsi", defaults.scale_out_rsi),
        };
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), PulseError> {
        let checks: [(&str, f64, bool); 8] = [
            ("target_vol", self.target_vol, self.target_vol > 0.0),
            (
                "kelly_fraction",
                self.kelly_fraction,
                self.kelly_fraction > 0.0 && self.kelly_fraction <= 1.0,
            ),
            (
                "win_rate",
                self.win_rate,
                self.win_rate > 0.0 && self.win_rate < 1.0,
            ),
            ("payoff_ratio", self.payoff_ratio, self.payoff_ratio > 0.0),
            (
                "trailing_pct",
                self.trailing_pct,
                self.trailing_pct > 0.0 && self.trailing_pct < 1.0,
            ),
            (
                "profit_lock_trigger",
                self.profit_lock_trigger,
                self.profit_lock_trigger > 0.0,
            ),
            (
                "profit_lock_floor",
                self.profit_lock_floor,
                self.profit_lock_floor >= 0.0,
            ),
            (
                "scale_out_rsi",
                self.scale_out_rsi,
                self.scale_out_rsi > 0.0 && self.scale_out_rsi < 100.0,
            ),
        ];
        for (key, value, ok) in checks {
            if !ok || !value.is_finite() {
                return Err(PulseError::ConfigInvalid {
                    section: "strategy".into(),
                    key: key.into(),
                    reason: format!("value {} out of range", value),
                });
            }
        }
        Ok(())
    }
}
