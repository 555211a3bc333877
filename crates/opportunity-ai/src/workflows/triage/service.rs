use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::criteria::{CriteriaRegistry, Criterion};
use super::decision::{score_map, DecisionEngine, DecisionPolicy, ScoreSummary};
use super::domain::{
    AiAssessment, ManagerDecisionRecord, OpportunityId, OpportunityStatus, OpportunitySubmission,
    ScoreScale, ValidationError, Verdict,
};
use super::extraction::ResponseNormalizer;
use super::prompt::build_analysis_prompt;
use super::provider::{CompletionClient, ProviderError};
use super::repository::{
    OpportunityFilter, OpportunityRecord, OpportunityRepository, RepositoryError,
};

/// Startup configuration for the triage pipeline.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub registry: CriteriaRegistry,
    pub policy: DecisionPolicy,
    pub scale: ScoreScale,
    pub analysis_deadline: Duration,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            registry: CriteriaRegistry::standard(),
            policy: DecisionPolicy::default(),
            scale: ScoreScale::default(),
            analysis_deadline: Duration::from_secs(60),
        }
    }
}

static OPPORTUNITY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_opportunity_id() -> OpportunityId {
    let id = OPPORTUNITY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OpportunityId(format!("opp-{id:06}"))
}

/// Manager decision payload, optionally overriding individual AI scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerReviewRequest {
    pub decision: Verdict,
    #[serde(default)]
    pub comment: Option<String>,
    pub reviewed_by: String,
    #[serde(default)]
    pub score_overrides: BTreeMap<Criterion, u8>,
}

/// Result of a manager review: the updated record plus, when scores were
/// overridden, the recomputed summary.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub record: OpportunityRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_summary: Option<ScoreSummary>,
}

/// Aggregates served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub go: usize,
    pub no_go: usize,
    pub pending: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_manager_agreement: Option<f64>,
    pub average_scores: BTreeMap<Criterion, f64>,
}

/// Service composing the criteria registry, completion client, response
/// normalizer, decision engine, and repository.
pub struct OpportunityTriageService<R, C> {
    repository: Arc<R>,
    client: Arc<C>,
    registry: Arc<CriteriaRegistry>,
    engine: Arc<DecisionEngine>,
    normalizer: Arc<ResponseNormalizer>,
    scale: ScoreScale,
    analysis_deadline: Duration,
    in_flight: Arc<Mutex<HashSet<OpportunityId>>>,
}

impl<R, C> Clone for OpportunityTriageService<R, C> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            client: Arc::clone(&self.client),
            registry: Arc::clone(&self.registry),
            engine: Arc::clone(&self.engine),
            normalizer: Arc::clone(&self.normalizer),
            scale: self.scale,
            analysis_deadline: self.analysis_deadline,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<R, C> OpportunityTriageService<R, C>
where
    R: OpportunityRepository + 'static,
    C: CompletionClient + 'static,
{
    pub fn new(repository: Arc<R>, client: Arc<C>, config: TriageConfig) -> Self {
        let registry = Arc::new(config.registry);
        let engine = Arc::new(DecisionEngine::new(Arc::clone(&registry), config.policy));
        let normalizer = Arc::new(ResponseNormalizer::new(Arc::clone(&registry), config.scale));

        Self {
            repository,
            client,
            registry,
            engine,
            normalizer,
            scale: config.scale,
            analysis_deadline: config.analysis_deadline,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Submit a new opportunity. The insert is synchronous; scoring runs as
    /// a detached task so a slow model call never blocks the submitter.
    pub fn submit(
        &self,
        submission: OpportunitySubmission,
    ) -> Result<OpportunityRecord, TriageServiceError> {
        submission.validate()?;

        let now = Utc::now();
        let record = OpportunityRecord {
            id: next_opportunity_id(),
            title: submission.title,
            description: submission.description,
            timeline: submission.timeline,
            submitted_by: submission.submitted_by,
            status: OpportunityStatus::Open,
            scores: Vec::new(),
            ai_assessment: None,
            manager_decision: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(record)?;
        info!(opportunity = %stored.id, "opportunity submitted, scheduling analysis");
        self.spawn_analysis(stored.id.clone());
        Ok(stored)
    }

    fn spawn_analysis(&self, id: OpportunityId) {
        let service = self.clone();
        tokio::spawn(async move {
            match service.analyze(&id).await {
                Ok(_) => {}
                Err(TriageServiceError::AnalysisInFlight(_)) => {
                    debug!(opportunity = %id, "analysis already in flight, skipping");
                }
                Err(err) => {
                    error!(opportunity = %id, error = %err, "background analysis failed");
                }
            }
        });
    }

    /// Run the scoring pipeline for one opportunity. At most one analysis
    /// per id is in flight at a time; the whole run is bounded by the
    /// configured deadline. Awaitable so callers can retry explicitly.
    pub async fn analyze(&self, id: &OpportunityId) -> Result<AiAssessment, TriageServiceError> {
        if !self.claim(id) {
            return Err(TriageServiceError::AnalysisInFlight(id.0.clone()));
        }

        let outcome = tokio::time::timeout(self.analysis_deadline, self.analyze_inner(id)).await;
        self.release(id);

        match outcome {
            Ok(result) => result,
            Err(_) => Err(TriageServiceError::AnalysisTimeout(self.analysis_deadline)),
        }
    }

    async fn analyze_inner(&self, id: &OpportunityId) -> Result<AiAssessment, TriageServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        let submission = OpportunitySubmission {
            title: record.title.clone(),
            description: record.description.clone(),
            timeline: record.timeline.clone(),
            submitted_by: record.submitted_by.clone(),
        };
        let prompt = build_analysis_prompt(&submission, &self.registry, self.scale);

        let raw = self.client.complete(&prompt).await?;
        let normalized = self.normalizer.normalize(&raw);
        let summary = self.engine.compute(&score_map(&normalized.scores));

        let assessment = AiAssessment {
            verdict: normalized.verdict,
            recommendation: summary.recommendation,
            overall_score: summary.overall_score,
            confidence: normalized.confidence,
            reasoning: normalized.reasoning,
            unrecognized_segments: normalized.unrecognized_segments,
        };

        // Scores land before the assessment: a failure between the two
        // leaves the record queryable with a null decision.
        self.repository.append_scores(id, normalized.scores)?;
        self.repository.set_ai_assessment(id, assessment.clone())?;

        info!(
            opportunity = %id,
            recommendation = assessment.recommendation.label(),
            overall_score = assessment.overall_score,
            confidence = assessment.confidence,
            "opportunity analysis complete"
        );
        Ok(assessment)
    }

    /// Record the manager's final decision. The status always lands on the
    /// terminal value matching the decision; score overrides are recomputed
    /// through the decision engine but never overwrite the AI assessment.
    pub fn review(
        &self,
        id: &OpportunityId,
        request: ManagerReviewRequest,
    ) -> Result<ReviewOutcome, TriageServiceError> {
        if request.reviewed_by.trim().is_empty() {
            return Err(ValidationError {
                field: "reviewed_by",
            }
            .into());
        }
        for score in request.score_overrides.values() {
            if *score < self.scale.min || *score > self.scale.max {
                return Err(ValidationError {
                    field: "score_overrides",
                }
                .into());
            }
        }

        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        let override_summary = (!request.score_overrides.is_empty())
            .then(|| self.engine.apply_override(&record.scores, &request.score_overrides));

        self.repository.set_manager_decision(
            id,
            ManagerDecisionRecord {
                decision: request.decision,
                comment: request.comment,
                reviewed_by: request.reviewed_by,
            },
        )?;

        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        info!(
            opportunity = %id,
            decision = record
                .manager_decision
                .as_ref()
                .map(|decision| decision.decision.label())
                .unwrap_or("unknown"),
            "manager review recorded"
        );

        Ok(ReviewOutcome {
            record,
            override_summary,
        })
    }

    pub fn get(&self, id: &OpportunityId) -> Result<OpportunityRecord, TriageServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn list(
        &self,
        filter: &OpportunityFilter,
    ) -> Result<Vec<OpportunityRecord>, TriageServiceError> {
        Ok(self.repository.list(filter)?)
    }

    /// Aggregates for the dashboard: status counts, AI/manager agreement
    /// across fully reviewed opportunities, and per-criterion averages.
    pub fn dashboard(&self) -> Result<DashboardSummary, TriageServiceError> {
        let records = self.repository.list(&OpportunityFilter::default())?;

        let total = records.len();
        let go = records
            .iter()
            .filter(|record| record.status == OpportunityStatus::Go)
            .count();
        let no_go = records
            .iter()
            .filter(|record| record.status == OpportunityStatus::NoGo)
            .count();
        let pending = records
            .iter()
            .filter(|record| !record.status.is_terminal())
            .count();

        let reviewed: Vec<_> = records
            .iter()
            .filter_map(|record| {
                match (&record.ai_assessment, &record.manager_decision) {
                    (Some(assessment), Some(decision)) => {
                        Some((assessment.verdict, decision.decision))
                    }
                    _ => None,
                }
            })
            .collect();
        let ai_manager_agreement = (!reviewed.is_empty()).then(|| {
            let agreeing = reviewed
                .iter()
                .filter(|(ai, manager)| ai == manager)
                .count();
            agreeing as f64 / reviewed.len() as f64
        });

        let mut sums: BTreeMap<Criterion, (f64, usize)> = BTreeMap::new();
        for record in &records {
            for (criterion, score) in score_map(&record.scores) {
                let slot = sums.entry(criterion).or_insert((0.0, 0));
                slot.0 += f64::from(score);
                slot.1 += 1;
            }
        }
        let average_scores = sums
            .into_iter()
            .map(|(criterion, (sum, count))| (criterion, sum / count as f64))
            .collect();

        Ok(DashboardSummary {
            total,
            go,
            no_go,
            pending,
            ai_manager_agreement,
            average_scores,
        })
    }

    fn claim(&self, id: &OpportunityId) -> bool {
        self.in_flight
            .lock()
            .expect("analysis claim mutex poisoned")
            .insert(id.clone())
    }

    fn release(&self, id: &OpportunityId) {
        self.in_flight
            .lock()
            .expect("analysis claim mutex poisoned")
            .remove(id);
    }
}

/// Error raised by the triage service.
#[derive(Debug, thiserror::Error)]
pub enum TriageServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("analysis already in flight for {0}")]
    AnalysisInFlight(String),
    #[error("analysis exceeded the {0:?} deadline")]
    AnalysisTimeout(Duration),
}
