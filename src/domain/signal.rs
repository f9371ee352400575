//! Signal classification from consecutive indicator snapshots.

use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::profile::{RuleProfile, StrategyProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub kind: SignalKind,
    pub strength: Strength,
}

impl Signal {
    pub fn hold() -> Self {
        Signal {
            kind: SignalKind::Hold,
            strength: Strength::Normal,
        }
    }

    pub fn is_strong_buy(&self) -> bool {
        self.kind == SignalKind::Buy && self.strength == Strength::Strong
    }

    pub fn is_strong_sell(&self) -> bool {
        self.kind == SignalKind::Sell && self.strength == Strength::Strong
    }
}

/// Classify the bar described by `curr`, given the previous bar's snapshot.
///
/// A missing RSI or histogram yields Hold; the previous histogram is only
/// required where the rule compares against it. Buy and sell RSI windows
/// never overlap for the shipped profiles, so at most one side can match.
pub fn classify(
    prev: &IndicatorSnapshot,
    curr: &IndicatorSnapshot,
    profile: &StrategyProfile,
) -> Signal {
    let (Some(rsi), Some(hist)) = (curr.rsi, curr.macd_hist) else {
        return Signal::hold();
    };

    let rules = profile.rules;
    let needs_prev = !matches!(rules, RuleProfile::Relaxed);
    let prev_hist = match (prev.macd_hist, needs_prev) {
        (Some(p), _) => p,
        (None, false) => 0.0,
        (None, true) => return Signal::hold(),
    };

    let buy_momentum = match rules {
        RuleProfile::Strict => prev_hist <= 0.0 && hist > 0.0,
        RuleProfile::Relaxed => hist > 0.0,
        RuleProfile::Momentum => hist > prev_hist,
    };
    let sell_momentum = match rules {
        RuleProfile::Strict => prev_hist >= 0.0 && hist < 0.0,
        RuleProfile::Relaxed => hist < 0.0,
        RuleProfile::Momentum => hist < prev_hist,
    };

    if rsi < rules.buy_rsi() && buy_momentum {
        return Signal {
            kind: SignalKind::Buy,
            strength: Strength::Strong,
        };
    }
    if rsi > rules.sell_rsi() && sell_momentum {
        return Signal {
            kind: SignalKind::Sell,
            strength: Strength::Strong,
        };
    }
    Signal::hold()
}
