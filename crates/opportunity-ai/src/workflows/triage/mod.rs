//! Opportunity triage workflow: intake, AI scoring, and manager review.
//!
//! Submissions are persisted immediately; scoring runs as a detached,
//! deadline-bounded task so the external model call never blocks intake.
//! The normalizer guarantees a complete score set for every response, and
//! the decision engine turns those scores into the Go/No-Go recommendation
//! a manager later confirms or overrides.

pub mod criteria;
pub mod decision;
pub mod domain;
pub mod extraction;
pub mod prompt;
pub mod provider;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use criteria::{CriteriaRegistry, Criterion, CriterionProfile, InvalidWeight};
pub use decision::{score_map, DecisionEngine, DecisionPolicy, ScoreSummary};
pub use domain::{
    AiAssessment, ManagerDecisionRecord, OpportunityId, OpportunityStatus, OpportunitySubmission,
    Recommendation, ScoreEntry, ScoreScale, ValidationError, Verdict,
};
pub use extraction::{NormalizedResponse, ResponseNormalizer, PARSING_FALLBACK_EXPLANATION};
pub use prompt::build_analysis_prompt;
pub use provider::{CompletionClient, CompletionFuture, HttpCompletionClient, ProviderError};
pub use repository::{
    OpportunityFilter, OpportunityRecord, OpportunityRepository, OpportunityStatusView,
    RepositoryError,
};
pub use router::triage_router;
pub use service::{
    DashboardSummary, ManagerReviewRequest, OpportunityTriageService, ReviewOutcome,
    TriageConfig, TriageServiceError,
};
