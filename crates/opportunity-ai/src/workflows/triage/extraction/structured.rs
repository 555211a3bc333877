use std::collections::BTreeMap;

use serde::Deserialize;

use super::{
    clamp_confidence, synthesize_default_scores, verdict_from_text, MalformedResponseError,
    NormalizedResponse, ResponseExtractionStrategy,
};
use crate::workflows::triage::criteria::{CriteriaRegistry, Criterion};
use crate::workflows::triage::domain::{ScoreEntry, ScoreScale, Verdict};

/// Parses the first balanced `{...}` block in the response. The payload's own
/// `overallScore` and `recommendation` are advisory only — the decision
/// engine recomputes both from the per-criterion scores.
pub(crate) struct StructuredJsonStrategy;

/// JSON shape the model is asked to produce. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct StructuredPayload {
    scores: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    recommendation: Option<String>,
    #[serde(default)]
    comments: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl ResponseExtractionStrategy for StructuredJsonStrategy {
    fn extract(
        &self,
        raw: &str,
        registry: &CriteriaRegistry,
        scale: ScoreScale,
    ) -> Result<NormalizedResponse, MalformedResponseError> {
        let block = balanced_json_block(raw).ok_or(MalformedResponseError::NoJsonBlock)?;
        let payload: StructuredPayload = serde_json::from_str(block)?;
        let raw_scores = payload.scores.ok_or(MalformedResponseError::MissingScores)?;

        let mut scores = Vec::new();
        let mut skipped = 0u32;
        for (key, value) in &raw_scores {
            let criterion = registry.resolve(key).filter(|c| *c != Criterion::Other);
            match (criterion, value.as_f64()) {
                (Some(criterion), Some(number)) => scores.push(ScoreEntry {
                    criterion,
                    score: scale.clamp(number.round() as i64),
                    explanation: String::new(),
                }),
                _ => skipped += 1,
            }
        }

        let verdict = payload
            .recommendation
            .as_deref()
            .and_then(verdict_from_text)
            .unwrap_or(Verdict::NoGo);

        if scores.is_empty() {
            scores = synthesize_default_scores(verdict, scale);
        }

        let reasoning = payload
            .comments
            .filter(|comments| !comments.trim().is_empty())
            .unwrap_or_else(|| {
                "Based on the analysis of the provided information, this is the recommendation."
                    .to_string()
            });

        Ok(NormalizedResponse {
            scores,
            verdict,
            confidence: clamp_confidence(payload.confidence),
            reasoning,
            unrecognized_segments: skipped,
        })
    }
}

/// Returns the first `{...}` block whose braces balance, skipping braces
/// inside JSON string literals.
fn balanced_json_block(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
