//! Pattern composition: ordered first-match registry and ensemble voting.

use std::collections::BTreeMap;

use crate::domain::pattern::{Pattern, PatternContext};
use crate::domain::signal::{Direction, Signal};

/// Patterns in declared priority order; the first in-scope pattern that
/// produces a well-formed signal wins the bar.
#[derive(Default)]
pub struct PatternRegistry {
    patterns: Vec<Box<dyn Pattern>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pattern: Box<dyn Pattern>) {
        self.patterns.push(pattern);
    }

    pub fn ids(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn first_match(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        self.patterns
            .iter()
            .filter(|p| p.scope().admits(ctx.regime))
            .filter_map(|p| p.evaluate(ctx))
            .find(Signal::is_well_formed)
    }
}

/// Majority vote over a keyed set of patterns.
///
/// A side wins only with at least `min_agreement` votes and strictly more
/// votes than the other side. Out-of-scope patterns abstain.
pub struct EnsembleVoter {
    voters: BTreeMap<String, Box<dyn Pattern>>,
    pub min_agreement: usize,
    pub stop_atr: f64,
    pub target_atr: f64,
}

impl EnsembleVoter {
    pub fn new(min_agreement: usize, stop_atr: f64, target_atr: f64) -> Self {
        EnsembleVoter {
            voters: BTreeMap::new(),
            min_agreement,
            stop_atr,
            target_atr,
        }
    }

    /// Adds a voter; a voter with the same id is replaced.
    pub fn insert(&mut self, pattern: Box<dyn Pattern>) {
        self.voters.insert(pattern.id().to_string(), pattern);
    }

    pub fn ids(&self) -> Vec<&str> {
        self.voters.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }

    /// Individual votes keyed by voter id.
    pub fn votes(&self, ctx: &PatternContext<'_>) -> BTreeMap<&str, i8> {
        self.voters
            .iter()
            .map(|(id, p)| {
                let vote = if p.scope().admits(ctx.regime) {
                    p.vote(ctx).signum()
                } else {
                    0
                };
                (id.as_str(), vote)
            })
            .collect()
    }

    pub fn decide(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
        let votes = self.votes(ctx);
        let longs = votes.values().filter(|&&v| v > 0).count();
        let shorts = votes.values().filter(|&&v| v < 0).count();

        let (direction, winning, sign) = if longs >= self.min_agreement && longs > shorts {
            (Direction::Long, longs, 1)
        } else if shorts >= self.min_agreement && shorts > longs {
            (Direction::Short, shorts, -1)
        } else {
            return None;
        };

        let atr = ctx.snapshot.atr?;
        let agreeing: Vec<&str> = votes
            .iter()
            .filter(|&(_, &v)| v == sign)
            .map(|(&id, _)| id)
            .collect();

        let signal = Signal::with_atr_bracket(
            "ensemble",
            direction,
            ctx.bar().close,
            atr,
            self.stop_atr,
            self.target_atr,
            winning as f64 / self.voters.len() as f64,
            ctx.regime,
            format!(
                "{}/{} voters {}: {}",
                winning,
                self.voters.len(),
                direction,
                agreeing.join(", ")
            ),
        );
        signal.is_well_formed().then_some(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::flat_bars;
    use crate::domain::indicator_set::IndicatorSnapshot;
    use crate::domain::pattern::test_support::{ctx, with_atr};
    use crate::domain::pattern::PatternScope;
    use crate::domain::regime::Regime;

    struct Fixed {
        id: &'static str,
        vote: i8,
        scope: PatternScope,
    }

    impl Pattern for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn scope(&self) -> PatternScope {
            self.scope.clone()
        }

        fn evaluate(&self, ctx: &PatternContext<'_>) -> Option<Signal> {
            let direction = Direction::from_vote(self.vote)?;
            Some(Signal::with_atr_bracket(
                self.id,
                direction,
                ctx.bar().close,
                1.0,
                1.0,
                2.0,
                0.5,
                ctx.regime,
                String::new(),
            ))
        }
    }

    fn fixed(id: &'static str, vote: i8) -> Box<dyn Pattern> {
        Box::new(Fixed {
            id,
            vote,
            scope: PatternScope::Universal,
        })
    }

    fn ensemble(votes: &[i8], min_agreement: usize) -> EnsembleVoter {
        const IDS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];
        let mut voter = EnsembleVoter::new(min_agreement, 1.0, 2.0);
        for (&id, &v) in IDS.iter().zip(votes) {
            voter.insert(fixed(id, v));
        }
        voter
    }

    fn decide(voter: &EnsembleVoter) -> Option<Signal> {
        let bars = flat_bars(&[100.0]);
        voter.decide(&ctx(&bars, with_atr(1.0), IndicatorSnapshot::default(), Regime::Sideways))
    }

    #[test]
    fn first_match_respects_priority() {
        let mut registry = PatternRegistry::new();
        registry.register(fixed("quiet", 0));
        registry.register(fixed("first", 1));
        registry.register(fixed("second", -1));

        let bars = flat_bars(&[100.0]);
        let c = ctx(&bars, with_atr(1.0), IndicatorSnapshot::default(), Regime::Sideways);
        let sig = registry.first_match(&c).unwrap();
        assert_eq!(sig.pattern_id, "first");
        assert_eq!(registry.ids(), vec!["quiet", "first", "second"]);
    }

    #[test]
    fn first_match_skips_out_of_scope_patterns() {
        let mut registry = PatternRegistry::new();
        registry.register(Box::new(Fixed {
            id: "trend_only",
            vote: 1,
            scope: PatternScope::trending(),
        }));
        registry.register(fixed("fallback", -1));

        let bars = flat_bars(&[100.0]);
        let c = ctx(&bars, with_atr(1.0), IndicatorSnapshot::default(), Regime::Sideways);
        assert_eq!(registry.first_match(&c).unwrap().pattern_id, "fallback");
    }

    #[test]
    fn ensemble_majority_long() {
        let sig = decide(&ensemble(&[1, 1, 1, -1, 0], 3)).unwrap();
        assert_eq!(sig.direction, Direction::Long);
        assert!((sig.confidence - 0.6).abs() < f64::EPSILON);
        assert!(sig.reason.contains("a, b, c"));
    }

    #[test]
    fn ensemble_below_min_agreement_is_none() {
        assert!(decide(&ensemble(&[1, 1, 0, 0, 0], 3)).is_none());
    }

    #[test]
    fn ensemble_tie_is_none() {
        assert!(decide(&ensemble(&[1, 1, 1, -1, -1, -1], 3)).is_none());
    }

    #[test]
    fn ensemble_short() {
        let sig = decide(&ensemble(&[-1, -1, 1, 0], 2)).unwrap();
        assert_eq!(sig.direction, Direction::Short);
    }

    #[test]
    fn ensemble_without_atr_is_none() {
        let voter = ensemble(&[1, 1, 1], 2);
        let bars = flat_bars(&[100.0]);
        let c = ctx(
            &bars,
            IndicatorSnapshot::default(),
            IndicatorSnapshot::default(),
            Regime::Sideways,
        );
        assert!(voter.decide(&c).is_none());
    }
}
