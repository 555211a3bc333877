//! Normalization of raw model text into structured scores.
//!
//! Two extraction strategies cover the response shapes seen in production:
//! a JSON block embedded in the reply, and a numbered free-text rundown of
//! the criteria. Structured parsing is attempted first; free text is the
//! fallback. Normalization never surfaces an error to the pipeline — when
//! both strategies fail the neutral fallback stands in.

mod freetext;
mod structured;

pub(crate) use freetext::FreeTextStrategy;
pub(crate) use structured::StructuredJsonStrategy;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::criteria::{CriteriaRegistry, Criterion};
use super::domain::{ScoreEntry, ScoreScale, Verdict};

/// Explanation attached to scores synthesized from the overall verdict.
pub const PARSING_FALLBACK_EXPLANATION: &str =
    "Score derived from overall decision due to parsing limitations.";

const NEUTRAL_FALLBACK_EXPLANATION: &str = "Default score due to parsing error.";
const NEUTRAL_FALLBACK_REASONING: &str =
    "Unable to parse AI response. Defaulting to a cautious recommendation.";
const DEFAULT_CONFIDENCE: u8 = 70;

/// Structured result recovered from one model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResponse {
    pub scores: Vec<ScoreEntry>,
    pub verdict: Verdict,
    pub confidence: u8,
    pub reasoning: String,
    pub unrecognized_segments: u32,
}

/// Raised by an individual extraction strategy; recovered inside
/// [`ResponseNormalizer::normalize`], never propagated.
#[derive(Debug, thiserror::Error)]
pub enum MalformedResponseError {
    #[error("response contained no JSON block")]
    NoJsonBlock,
    #[error("JSON block failed to parse: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON block carried no scores field")]
    MissingScores,
    #[error("response was empty")]
    EmptyResponse,
}

pub(crate) trait ResponseExtractionStrategy {
    fn extract(
        &self,
        raw: &str,
        registry: &CriteriaRegistry,
        scale: ScoreScale,
    ) -> Result<NormalizedResponse, MalformedResponseError>;
}

/// Facade applying structured-first strategy order and the neutral fallback.
pub struct ResponseNormalizer {
    registry: Arc<CriteriaRegistry>,
    scale: ScoreScale,
    structured: StructuredJsonStrategy,
    free_text: FreeTextStrategy,
}

impl ResponseNormalizer {
    pub fn new(registry: Arc<CriteriaRegistry>, scale: ScoreScale) -> Self {
        Self {
            registry,
            scale,
            structured: StructuredJsonStrategy,
            free_text: FreeTextStrategy::new(),
        }
    }

    pub fn normalize(&self, raw: &str) -> NormalizedResponse {
        let normalized = match self.structured.extract(raw, &self.registry, self.scale) {
            Ok(normalized) => normalized,
            Err(structured_err) => {
                debug!(error = %structured_err, "structured extraction failed, trying free text");
                match self.free_text.extract(raw, &self.registry, self.scale) {
                    Ok(normalized) => normalized,
                    Err(free_text_err) => {
                        warn!(
                            error = %free_text_err,
                            "response normalization failed, substituting neutral fallback"
                        );
                        neutral_fallback(self.scale)
                    }
                }
            }
        };

        if normalized.unrecognized_segments > 0 {
            warn!(
                skipped = normalized.unrecognized_segments,
                "response referenced criteria outside the registry"
            );
        }

        normalized
    }
}

/// Full score set synthesized when a strategy recovers no per-criterion
/// values; the defaults lean with the extracted verdict.
pub(crate) fn synthesize_default_scores(verdict: Verdict, scale: ScoreScale) -> Vec<ScoreEntry> {
    let score = match verdict {
        Verdict::Go => scale.go_default(),
        Verdict::NoGo => scale.no_go_default(),
    };

    Criterion::KNOWN
        .iter()
        .map(|criterion| ScoreEntry {
            criterion: *criterion,
            score,
            explanation: PARSING_FALLBACK_EXPLANATION.to_string(),
        })
        .collect()
}

fn neutral_fallback(scale: ScoreScale) -> NormalizedResponse {
    NormalizedResponse {
        scores: Criterion::KNOWN
            .iter()
            .map(|criterion| ScoreEntry {
                criterion: *criterion,
                score: scale.midpoint(),
                explanation: NEUTRAL_FALLBACK_EXPLANATION.to_string(),
            })
            .collect(),
        verdict: Verdict::NoGo,
        confidence: 50,
        reasoning: NEUTRAL_FALLBACK_REASONING.to_string(),
        unrecognized_segments: 0,
    }
}

/// Reads a binary verdict out of arbitrary text. "no go" spellings win over
/// the bare "go" they contain.
pub(crate) fn verdict_from_text(raw: &str) -> Option<Verdict> {
    let lowered = raw.to_ascii_lowercase();
    if lowered.contains("no_go") || lowered.contains("no go") || lowered.contains("no-go") {
        Some(Verdict::NoGo)
    } else if lowered.contains("go") {
        Some(Verdict::Go)
    } else {
        None
    }
}

pub(crate) fn clamp_confidence(raw: Option<f64>) -> u8 {
    match raw {
        Some(value) if value.is_finite() => value.clamp(0.0, 100.0).round() as u8,
        _ => DEFAULT_CONFIDENCE,
    }
}
