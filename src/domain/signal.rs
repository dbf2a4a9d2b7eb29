//! Directional trade signals emitted by patterns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::regime::Regime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn from_vote(vote: i8) -> Option<Self> {
        match vote.signum() {
            1 => Some(Direction::Long),
            -1 => Some(Direction::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("LONG"),
            Direction::Short => f.write_str("SHORT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub pattern_id: String,
    pub direction: Direction,
    /// Reference price before slippage.
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    /// 0.0 to 1.0.
    pub confidence: f64,
    pub regime: Regime,
    pub reason: String,
}

impl Signal {
    /// Build a signal with stop and target at ATR multiples from `entry_price`.
    #[allow(clippy::too_many_arguments)]
    pub fn with_atr_bracket(
        pattern_id: &str,
        direction: Direction,
        entry_price: f64,
        atr: f64,
        stop_atr: f64,
        target_atr: f64,
        confidence: f64,
        regime: Regime,
        reason: String,
    ) -> Self {
        let sign = direction.sign();
        Signal {
            pattern_id: pattern_id.to_string(),
            direction,
            entry_price,
            stop_price: entry_price - sign * stop_atr * atr,
            target_price: entry_price + sign * target_atr * atr,
            confidence,
            regime,
            reason,
        }
    }

    /// Stop and target sit on the losing and winning sides of the entry.
    pub fn is_well_formed(&self) -> bool {
        let sign = self.direction.sign();
        self.entry_price.is_finite()
            && (self.entry_price - self.stop_price) * sign > 0.0
            && (self.target_price - self.entry_price) * sign > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atr_bracket_long() {
        let sig = Signal::with_atr_bracket(
            "test",
            Direction::Long,
            100.0,
            2.0,
            1.5,
            3.0,
            0.8,
            Regime::Up,
            "reason".into(),
        );
        assert!((sig.stop_price - 97.0).abs() < f64::EPSILON);
        assert!((sig.target_price - 106.0).abs() < f64::EPSILON);
        assert!(sig.is_well_formed());
    }

    #[test]
    fn atr_bracket_short() {
        let sig = Signal::with_atr_bracket(
            "test",
            Direction::Short,
            100.0,
            2.0,
            1.0,
            2.0,
            0.8,
            Regime::Down,
            "reason".into(),
        );
        assert!((sig.stop_price - 102.0).abs() < f64::EPSILON);
        assert!((sig.target_price - 96.0).abs() < f64::EPSILON);
        assert!(sig.is_well_formed());
    }

    #[test]
    fn zero_atr_bracket_is_not_well_formed() {
        let sig = Signal::with_atr_bracket(
            "test",
            Direction::Long,
            100.0,
            0.0,
            1.0,
            2.0,
            0.5,
            Regime::Up,
            String::new(),
        );
        assert!(!sig.is_well_formed());
    }

    #[test]
    fn direction_from_vote() {
        assert_eq!(Direction::from_vote(3), Some(Direction::Long));
        assert_eq!(Direction::from_vote(-1), Some(Direction::Short));
        assert_eq!(Direction::from_vote(0), None);
        assert_eq!(Direction::Long.opposite(), Direction::Short);
    }
}
