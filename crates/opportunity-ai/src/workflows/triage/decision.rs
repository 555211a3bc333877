use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::criteria::{CriteriaRegistry, Criterion};
use super::domain::{Recommendation, ScoreEntry};

/// Threshold configuration for mapping a weighted average to a
/// recommendation. With `review_threshold` set the scheme is ternary
/// (GO/REVIEW/NO_GO); without it, binary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    pub go_threshold: f64,
    pub review_threshold: Option<f64>,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            go_threshold: 3.0,
            review_threshold: Some(2.5),
        }
    }
}

/// Weighted average plus the threshold-derived recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub overall_score: f64,
    pub recommendation: Recommendation,
}

/// Stateless scorer. Deterministic and side-effect-free; callers persist
/// the result.
pub struct DecisionEngine {
    registry: Arc<CriteriaRegistry>,
    policy: DecisionPolicy,
}

impl DecisionEngine {
    pub fn new(registry: Arc<CriteriaRegistry>, policy: DecisionPolicy) -> Self {
        Self { registry, policy }
    }

    /// Weighted average over the criteria present. Criteria without a
    /// configured weight count at weight 1; an empty map scores exactly 0.
    pub fn overall_score(&self, scores: &BTreeMap<Criterion, u8>) -> f64 {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for (criterion, score) in scores {
            let weight = self.registry.weight(*criterion);
            weighted_sum += f64::from(*score) * weight;
            total_weight += weight;
        }

        if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        }
    }

    pub fn recommend(&self, overall_score: f64) -> Recommendation {
        if overall_score >= self.policy.go_threshold {
            Recommendation::Go
        } else if self
            .policy
            .review_threshold
            .is_some_and(|threshold| overall_score >= threshold)
        {
            Recommendation::Review
        } else {
            Recommendation::NoGo
        }
    }

    pub fn compute(&self, scores: &BTreeMap<Criterion, u8>) -> ScoreSummary {
        let overall_score = self.overall_score(scores);
        ScoreSummary {
            overall_score,
            recommendation: self.recommend(overall_score),
        }
    }

    /// Merges manager-supplied scores over the AI's (unspecified criteria
    /// keep the AI value) and recomputes through the same path, so the
    /// recommendation is re-evaluated rather than frozen.
    pub fn apply_override(
        &self,
        ai_scores: &[ScoreEntry],
        overrides: &BTreeMap<Criterion, u8>,
    ) -> ScoreSummary {
        let mut merged = score_map(ai_scores);
        for (criterion, score) in overrides {
            merged.insert(*criterion, *score);
        }
        self.compute(&merged)
    }
}

/// Collapses score entries into a per-criterion map; a later duplicate for
/// the same criterion wins, matching re-analysis append order.
pub fn score_map(entries: &[ScoreEntry]) -> BTreeMap<Criterion, u8> {
    let mut map = BTreeMap::new();
    for entry in entries {
        map.insert(entry.criterion, entry.score);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(policy: DecisionPolicy) -> DecisionEngine {
        DecisionEngine::new(Arc::new(CriteriaRegistry::uniform()), policy)
    }

    fn scores(pairs: &[(Criterion, u8)]) -> BTreeMap<Criterion, u8> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_map_scores_exactly_zero() {
        let engine = engine(DecisionPolicy::default());
        assert_eq!(engine.overall_score(&BTreeMap::new()), 0.0);
        assert_eq!(
            engine.compute(&BTreeMap::new()).recommendation,
            Recommendation::NoGo
        );
    }

    #[test]
    fn overall_score_stays_within_input_bounds() {
        let engine = DecisionEngine::new(
            Arc::new(CriteriaRegistry::standard()),
            DecisionPolicy::default(),
        );
        let input = scores(&[
            (Criterion::LeadTimeCheck, 2),
            (Criterion::CommercialViability, 5),
            (Criterion::Resources, 3),
        ]);
        let overall = engine.overall_score(&input);
        assert!(overall >= 2.0, "weighted average {overall} below minimum");
        assert!(overall <= 5.0, "weighted average {overall} above maximum");
    }

    #[test]
    fn compute_is_deterministic_across_calls() {
        let engine = DecisionEngine::new(
            Arc::new(CriteriaRegistry::standard()),
            DecisionPolicy::default(),
        );
        let input = scores(&[
            (Criterion::ProjectInsight, 4),
            (Criterion::StrategicValue, 2),
        ]);
        let first = engine.compute(&input);
        let second = engine.compute(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn thresholds_partition_into_three_bands() {
        let engine = engine(DecisionPolicy {
            go_threshold: 3.0,
            review_threshold: Some(2.5),
        });
        assert_eq!(engine.recommend(3.4), Recommendation::Go);
        assert_eq!(engine.recommend(3.0), Recommendation::Go);
        assert_eq!(engine.recommend(2.7), Recommendation::Review);
        assert_eq!(engine.recommend(2.4), Recommendation::NoGo);
    }

    #[test]
    fn binary_policy_skips_the_review_band() {
        let engine = engine(DecisionPolicy {
            go_threshold: 3.0,
            review_threshold: None,
        });
        assert_eq!(engine.recommend(2.9), Recommendation::NoGo);
        assert_eq!(engine.recommend(3.0), Recommendation::Go);
    }

    #[test]
    fn override_recomputes_instead_of_freezing() {
        let engine = engine(DecisionPolicy {
            go_threshold: 3.5,
            review_threshold: None,
        });
        let ai_scores = vec![
            ScoreEntry {
                criterion: Criterion::LeadTimeCheck,
                score: 3,
                explanation: String::new(),
            },
            ScoreEntry {
                criterion: Criterion::ProjectInsight,
                score: 3,
                explanation: String::new(),
            },
        ];
        let before = engine.compute(&score_map(&ai_scores));
        assert_eq!(before.recommendation, Recommendation::NoGo);

        let overrides = scores(&[(Criterion::LeadTimeCheck, 5)]);
        let after = engine.apply_override(&ai_scores, &overrides);
        assert_eq!(after.overall_score, 4.0);
        assert_eq!(after.recommendation, Recommendation::Go);
    }

    #[test]
    fn later_duplicate_entries_replace_earlier_scores() {
        let entries = vec![
            ScoreEntry {
                criterion: Criterion::Resources,
                score: 2,
                explanation: String::new(),
            },
            ScoreEntry {
                criterion: Criterion::Resources,
                score: 4,
                explanation: String::new(),
            },
        ];
        assert_eq!(score_map(&entries)[&Criterion::Resources], 4);
    }
}
