use serde::{Deserialize, Serialize};

use super::criteria::Criterion;

/// Identifier wrapper for submitted opportunities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpportunityId(pub String);

impl std::fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Worker-provided payload describing a potential project or deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunitySubmission {
    pub title: String,
    pub description: String,
    pub timeline: String,
    pub submitted_by: String,
}

impl OpportunitySubmission {
    /// Fast-fail validation run before any store write.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("timeline", &self.timeline),
            ("submitted_by", &self.submitted_by),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError { field });
            }
        }
        Ok(())
    }
}

/// Raised when a submission is missing a required field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} must not be blank")]
pub struct ValidationError {
    pub field: &'static str,
}

/// Lifecycle of an opportunity. Analysis never moves the status; only a
/// manager decision does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Open,
    InReview,
    Go,
    NoGo,
}

impl OpportunityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OpportunityStatus::Open => "open",
            OpportunityStatus::InReview => "in_review",
            OpportunityStatus::Go => "go",
            OpportunityStatus::NoGo => "no_go",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "in_review" => Some(Self::InReview),
            "go" => Some(Self::Go),
            "no_go" => Some(Self::NoGo),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, OpportunityStatus::Go | OpportunityStatus::NoGo)
    }
}

/// Binary go/no-go verdict extracted from the model text or recorded by the
/// reviewing manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Go,
    NoGo,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Verdict::Go => "go",
            Verdict::NoGo => "no_go",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "go" => Some(Self::Go),
            "no_go" | "no go" => Some(Self::NoGo),
            _ => None,
        }
    }
}

impl From<Verdict> for OpportunityStatus {
    fn from(value: Verdict) -> Self {
        match value {
            Verdict::Go => OpportunityStatus::Go,
            Verdict::NoGo => OpportunityStatus::NoGo,
        }
    }
}

/// Threshold-derived classification of a weighted average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Go,
    Review,
    NoGo,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::Go => "GO",
            Recommendation::Review => "REVIEW",
            Recommendation::NoGo => "NO_GO",
        }
    }
}

/// One scored criterion with the model's (or fallback) explanation.
/// Immutable once written; owned by exactly one opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub criterion: Criterion,
    pub score: u8,
    pub explanation: String,
}

/// Inclusive integer bounds the model is asked to score within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreScale {
    pub min: u8,
    pub max: u8,
}

impl Default for ScoreScale {
    fn default() -> Self {
        Self { min: 1, max: 5 }
    }
}

impl ScoreScale {
    pub fn clamp(&self, value: i64) -> u8 {
        value.clamp(self.min as i64, self.max as i64) as u8
    }

    /// Midpoint used by the neutral fallback, rounding half up.
    pub fn midpoint(&self) -> u8 {
        ((u16::from(self.min) + u16::from(self.max) + 1) / 2) as u8
    }

    /// Default score synthesized for a "go" verdict when parsing recovers
    /// no per-criterion values.
    pub fn go_default(&self) -> u8 {
        self.max.saturating_sub(1).max(self.min)
    }

    /// Counterpart default for a "no go" verdict.
    pub fn no_go_default(&self) -> u8 {
        (self.min + 1).min(self.max)
    }
}

/// Result of normalizing and scoring one model response. Stored on the
/// opportunity; independent of any later manager decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAssessment {
    pub verdict: Verdict,
    pub recommendation: Recommendation,
    pub overall_score: f64,
    pub confidence: u8,
    pub reasoning: String,
    /// Count of criterion sections the extractor could not map to the
    /// registry. Zero for structured responses.
    pub unrecognized_segments: u32,
}

/// The manager's final call for an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerDecisionRecord {
    pub decision: Verdict,
    pub comment: Option<String>,
    pub reviewed_by: String,
}
