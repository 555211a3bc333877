use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AiAssessment, ManagerDecisionRecord, OpportunityId, OpportunityStatus, ScoreEntry, Verdict,
};

/// Repository record for one opportunity, including scores and both the AI
/// and manager decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    pub id: OpportunityId,
    pub title: String,
    pub description: String,
    pub timeline: String,
    pub submitted_by: String,
    pub status: OpportunityStatus,
    pub scores: Vec<ScoreEntry>,
    pub ai_assessment: Option<AiAssessment>,
    pub manager_decision: Option<ManagerDecisionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OpportunityRecord {
    pub fn status_view(&self) -> OpportunityStatusView {
        OpportunityStatusView {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status.label(),
            ai_decision: self
                .ai_assessment
                .as_ref()
                .map(|assessment| assessment.verdict.label()),
            recommendation: self
                .ai_assessment
                .as_ref()
                .map(|assessment| assessment.recommendation.label()),
            overall_score: self
                .ai_assessment
                .as_ref()
                .map(|assessment| assessment.overall_score),
            manager_decision: self
                .manager_decision
                .as_ref()
                .map(|record| record.decision.label()),
            created_at: self.created_at,
        }
    }
}

/// Sanitized listing/detail projection for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct OpportunityStatusView {
    pub id: OpportunityId,
    pub title: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_decision: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_decision: Option<&'static str>,
    pub created_at: DateTime<Utc>,
}

/// Listing filter. Empty vectors mean "any"; `search` matches title or
/// description, case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpportunityFilter {
    #[serde(default)]
    pub statuses: Vec<OpportunityStatus>,
    #[serde(default)]
    pub ai_decisions: Vec<Verdict>,
    #[serde(default)]
    pub search: Option<String>,
}

impl OpportunityFilter {
    pub fn matches(&self, record: &OpportunityRecord) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&record.status) {
            return false;
        }
        if !self.ai_decisions.is_empty() {
            let verdict = record
                .ai_assessment
                .as_ref()
                .map(|assessment| assessment.verdict);
            if !verdict.is_some_and(|verdict| self.ai_decisions.contains(&verdict)) {
                return false;
            }
        }
        if let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
        {
            let needle = needle.to_ascii_lowercase();
            let haystack = format!(
                "{} {}",
                record.title.to_ascii_lowercase(),
                record.description.to_ascii_lowercase()
            );
            if !haystack.contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Storage abstraction for opportunities. Each call is atomic and durable
/// from the pipeline's point of view; the pipeline never assumes
/// cross-call transactions. `list` returns newest submissions first.
pub trait OpportunityRepository: Send + Sync {
    fn insert(&self, record: OpportunityRecord) -> Result<OpportunityRecord, RepositoryError>;
    fn append_scores(
        &self,
        id: &OpportunityId,
        scores: Vec<ScoreEntry>,
    ) -> Result<(), RepositoryError>;
    fn set_ai_assessment(
        &self,
        id: &OpportunityId,
        assessment: AiAssessment,
    ) -> Result<(), RepositoryError>;
    /// Records the manager's call and moves the status to the matching
    /// terminal value. Last write wins on concurrent reviews.
    fn set_manager_decision(
        &self,
        id: &OpportunityId,
        decision: ManagerDecisionRecord,
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &OpportunityId) -> Result<Option<OpportunityRecord>, RepositoryError>;
    fn list(&self, filter: &OpportunityFilter) -> Result<Vec<OpportunityRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
