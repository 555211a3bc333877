use regex::Regex;

use super::{
    clamp_confidence, synthesize_default_scores, MalformedResponseError, NormalizedResponse,
    ResponseExtractionStrategy,
};
use crate::workflows::triage::criteria::{CriteriaRegistry, Criterion};
use crate::workflows::triage::domain::{ScoreEntry, ScoreScale, Verdict};

const DEFAULT_REASONING: &str =
    "Based on the analysis of the provided information, this is the recommendation.";

/// Recovers scores from a numbered rundown of the form
/// `<index>. <criterion name> (<score>)` followed by the explanation text,
/// with the verdict and confidence pulled from their own keyword patterns.
pub(crate) struct FreeTextStrategy {
    score_line: Regex,
    verdict: Regex,
    confidence: Regex,
    recommendation_marker: Regex,
}

impl FreeTextStrategy {
    pub(crate) fn new() -> Self {
        Self {
            score_line: Regex::new(r"(?i)(\d+)\.\s*([A-Za-z][A-Za-z ]*?)\s*\((\d+)\)")
                .expect("score line pattern compiles"),
            verdict: Regex::new(r"(?i)\b(no[ _-]?go|go)\b").expect("verdict pattern compiles"),
            confidence: Regex::new(r"(?i)confidence[^\n%]*?(\d+)\s*%")
                .expect("confidence pattern compiles"),
            recommendation_marker: Regex::new(r"(?i)recommendation")
                .expect("marker pattern compiles"),
        }
    }

    fn extract_verdict(&self, raw: &str) -> Verdict {
        match self.verdict.find(raw) {
            Some(found) if found.as_str().to_ascii_lowercase().starts_with("no") => Verdict::NoGo,
            Some(_) => Verdict::Go,
            None => Verdict::NoGo,
        }
    }

    fn extract_confidence(&self, raw: &str) -> u8 {
        let value = self
            .confidence
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .and_then(|digits| digits.as_str().parse::<f64>().ok());
        clamp_confidence(value)
    }

    fn extract_reasoning(&self, raw: &str) -> (Option<usize>, String) {
        match self.recommendation_marker.find(raw) {
            Some(found) => (Some(found.start()), raw[found.start()..].trim().to_string()),
            None => (None, DEFAULT_REASONING.to_string()),
        }
    }
}

impl ResponseExtractionStrategy for FreeTextStrategy {
    fn extract(
        &self,
        raw: &str,
        registry: &CriteriaRegistry,
        scale: ScoreScale,
    ) -> Result<NormalizedResponse, MalformedResponseError> {
        if raw.trim().is_empty() {
            return Err(MalformedResponseError::EmptyResponse);
        }

        let verdict = self.extract_verdict(raw);
        let confidence = self.extract_confidence(raw);
        let (reasoning_start, reasoning) = self.extract_reasoning(raw);

        let matches: Vec<regex::Captures<'_>> = self.score_line.captures_iter(raw).collect();
        let mut scores = Vec::new();
        let mut skipped = 0u32;

        for (index, caps) in matches.iter().enumerate() {
            let whole = caps.get(0).expect("capture group zero always present");
            let name = caps
                .get(2)
                .map(|group| group.as_str().trim())
                .unwrap_or_default();
            let value = caps
                .get(3)
                .and_then(|digits| digits.as_str().parse::<i64>().ok());

            let criterion = registry
                .resolve(name)
                .filter(|criterion| *criterion != Criterion::Other);
            let (criterion, value) = match (criterion, value) {
                (Some(criterion), Some(value)) => (criterion, value),
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            // Explanation runs to the next criterion header, or to the
            // recommendation section for the final entry.
            let segment_start = whole.end();
            let segment_end = matches
                .get(index + 1)
                .map(|next| next.get(0).expect("capture group zero").start())
                .or(reasoning_start.filter(|start| *start > segment_start))
                .unwrap_or(raw.len());

            scores.push(ScoreEntry {
                criterion,
                score: scale.clamp(value),
                explanation: raw[segment_start..segment_end].trim().to_string(),
            });
        }

        if scores.is_empty() {
            scores = synthesize_default_scores(verdict, scale);
        }

        Ok(NormalizedResponse {
            scores,
            verdict,
            confidence,
            reasoning,
            unrecognized_segments: skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::triage::extraction::PARSING_FALLBACK_EXPLANATION;

    fn extract(raw: &str) -> NormalizedResponse {
        FreeTextStrategy::new()
            .extract(raw, &CriteriaRegistry::standard(), ScoreScale::default())
            .expect("free text extraction succeeds")
    }

    #[test]
    fn extracts_numbered_scores_with_explanations() {
        let raw = "1. Lead Time Check (5)\nGreat fit.\n2. Project Insight (2)\nUnclear scope.\nRecommendation: Go, confidence 80%";
        let normalized = extract(raw);

        assert_eq!(normalized.scores.len(), 2);
        assert_eq!(normalized.scores[0].criterion, Criterion::LeadTimeCheck);
        assert_eq!(normalized.scores[0].score, 5);
        assert_eq!(normalized.scores[0].explanation, "Great fit.");
        assert_eq!(normalized.scores[1].criterion, Criterion::ProjectInsight);
        assert_eq!(normalized.scores[1].score, 2);
        assert_eq!(normalized.scores[1].explanation, "Unclear scope.");
        assert_eq!(normalized.verdict, Verdict::Go);
        assert_eq!(normalized.confidence, 80);
        assert!(normalized.reasoning.starts_with("Recommendation"));
    }

    #[test]
    fn no_go_wins_over_the_go_it_contains() {
        let raw = "1. Resources (2)\nThin bench.\nRecommendation: No Go, confidence 65%";
        let normalized = extract(raw);
        assert_eq!(normalized.verdict, Verdict::NoGo);
        assert_eq!(normalized.confidence, 65);
    }

    #[test]
    fn unknown_criterion_names_are_counted_not_dropped_silently() {
        let raw = "1. Market Timing (4)\nHot market.\n2. Resources (3)\nStaffed.\nRecommendation: Go, confidence 70%";
        let normalized = extract(raw);
        assert_eq!(normalized.scores.len(), 1);
        assert_eq!(normalized.scores[0].criterion, Criterion::Resources);
        assert_eq!(normalized.unrecognized_segments, 1);
    }

    #[test]
    fn zero_scores_synthesize_one_entry_per_known_criterion() {
        let raw = "The team should decline this one. Recommendation: No Go, confidence 55%";
        let normalized = extract(raw);

        assert_eq!(normalized.scores.len(), Criterion::KNOWN.len());
        for entry in &normalized.scores {
            assert_eq!(entry.score, ScoreScale::default().no_go_default());
            assert_eq!(entry.explanation, PARSING_FALLBACK_EXPLANATION);
        }
        assert_eq!(normalized.verdict, Verdict::NoGo);
    }

    #[test]
    fn go_verdict_raises_the_synthesized_default() {
        let raw = "Recommendation: Go. Confidence: 90%";
        let normalized = extract(raw);
        assert!(normalized
            .scores
            .iter()
            .all(|entry| entry.score == ScoreScale::default().go_default()));
    }

    #[test]
    fn confidence_clamps_to_one_hundred() {
        let raw = "1. Resources (3)\nFine.\nRecommendation: Go, confidence 150%";
        let normalized = extract(raw);
        assert_eq!(normalized.confidence, 100);
    }

    #[test]
    fn missing_confidence_defaults_to_seventy() {
        let raw = "1. Resources (3)\nFine.\nRecommendation: Go";
        let normalized = extract(raw);
        assert_eq!(normalized.confidence, 70);
    }

    #[test]
    fn missing_verdict_defaults_to_no_go() {
        let raw = "1. Resources (3)\nAdequate staffing either way.";
        let normalized = extract(raw);
        assert_eq!(normalized.verdict, Verdict::NoGo);
    }

    #[test]
    fn blank_response_is_malformed() {
        let err = FreeTextStrategy::new()
            .extract("   \n", &CriteriaRegistry::standard(), ScoreScale::default())
            .expect_err("blank response rejected");
        assert!(matches!(err, MalformedResponseError::EmptyResponse));
    }

    #[test]
    fn scores_above_the_scale_clamp_down() {
        let raw = "1. Resources (9)\nOverflowing.\nRecommendation: Go, confidence 70%";
        let normalized = extract(raw);
        assert_eq!(normalized.scores[0].score, 5);
    }
}
