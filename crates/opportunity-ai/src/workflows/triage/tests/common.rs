use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::workflows::triage::criteria::CriteriaRegistry;
use crate::workflows::triage::decision::DecisionPolicy;
use crate::workflows::triage::domain::{
    OpportunityId, OpportunityStatus, OpportunitySubmission, ScoreScale,
};
use crate::workflows::triage::provider::{CompletionClient, CompletionFuture, ProviderError};
use crate::workflows::triage::repository::{
    OpportunityFilter, OpportunityRecord, OpportunityRepository, RepositoryError,
};
use crate::workflows::triage::service::{OpportunityTriageService, TriageConfig};

pub(super) fn submission() -> OpportunitySubmission {
    OpportunitySubmission {
        title: "Fleet telematics rollout".to_string(),
        description: "Install trackers across the regional fleet and build the reporting portal."
            .to_string(),
        timeline: "Pilot in eight weeks, full rollout by Q2".to_string(),
        submitted_by: "rowan".to_string(),
    }
}

pub(super) fn unscored_record(suffix: &str) -> OpportunityRecord {
    let now = Utc::now();
    let submission = submission();
    OpportunityRecord {
        id: OpportunityId(format!("opp-test-{suffix}")),
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
    }
}

pub(super) fn triage_config() -> TriageConfig {
    TriageConfig {
        registry: CriteriaRegistry::uniform(),
        policy: DecisionPolicy {
            go_threshold: 3.0,
            review_threshold: Some(2.5),
        },
        scale: ScoreScale::default(),
        analysis_deadline: Duration::from_secs(5),
    }
}

/// A complete free-text rundown covering all seven criteria, scoring 4s
/// and 5s so the uniform-weight average lands comfortably above 3.0.
pub(super) fn free_text_response() -> String {
    [
        "1. Lead Time Check (4)",
        "Timeline leaves slack for hardware delays.",
        "2. Project Insight (5)",
        "Requirements are fully documented.",
        "3. Client Relationship (4)",
        "Second engagement with this client.",
        "4. Expertise Alignment (5)",
        "Core telematics work.",
        "5. Commercial Viability (4)",
        "Healthy margin at the quoted rate.",
        "6. Strategic Value (4)",
        "Opens the logistics vertical.",
        "7. Resources (4)",
        "Install crews are available.",
        "Recommendation: Go, confidence 85%",
        "The fundamentals support taking this on.",
    ]
    .join("\n")
}

pub(super) fn json_response() -> String {
    r#"{
  "scores": {
    "lead_time_check": 4,
    "project_insight": 4,
    "client_relationship": 4,
    "expertise_alignment": 4,
    "commercial_viability": 4,
    "strategic_value": 4,
    "resources": 4
  },
  "overallScore": 0,
  "recommendation": "",
  "comments": "x"
}"#
    .to_string()
}

/// In-memory repository mirroring the store contract: atomic per-call
/// updates, newest-first listing.
#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<Vec<OpportunityRecord>>,
}

impl MemoryRepository {
    fn with_record<T>(
        &self,
        id: &OpportunityId,
        apply: impl FnOnce(&mut OpportunityRecord) -> T,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|record| record.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        let result = apply(record);
        record.updated_at = Utc::now();
        Ok(result)
    }
}

impl OpportunityRepository for MemoryRepository {
    fn insert(&self, record: OpportunityRecord) -> Result<OpportunityRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn append_scores(
        &self,
        id: &OpportunityId,
        scores: Vec<crate::workflows::triage::domain::ScoreEntry>,
    ) -> Result<(), RepositoryError> {
        self.with_record(id, |record| record.scores.extend(scores))
    }

    fn set_ai_assessment(
        &self,
        id: &OpportunityId,
        assessment: crate::workflows::triage::domain::AiAssessment,
    ) -> Result<(), RepositoryError> {
        self.with_record(id, |record| record.ai_assessment = Some(assessment))
    }

    fn set_manager_decision(
        &self,
        id: &OpportunityId,
        decision: crate::workflows::triage::domain::ManagerDecisionRecord,
    ) -> Result<(), RepositoryError> {
        self.with_record(id, |record| {
            record.status = decision.decision.into();
            record.manager_decision = Some(decision);
        })
    }

    fn fetch(&self, id: &OpportunityId) -> Result<Option<OpportunityRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| record.id == *id).cloned())
    }

    fn list(&self, filter: &OpportunityFilter) -> Result<Vec<OpportunityRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut matching: Vec<OpportunityRecord> = guard
            .iter()
            .rev()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}

/// Repository that always reports a conflict on insert.
pub(super) struct ConflictRepository;

impl OpportunityRepository for ConflictRepository {
    fn insert(&self, _record: OpportunityRecord) -> Result<OpportunityRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn append_scores(
        &self,
        _id: &OpportunityId,
        _scores: Vec<crate::workflows::triage::domain::ScoreEntry>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("conflict repository".to_string()))
    }

    fn set_ai_assessment(
        &self,
        _id: &OpportunityId,
        _assessment: crate::workflows::triage::domain::AiAssessment,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("conflict repository".to_string()))
    }

    fn set_manager_decision(
        &self,
        _id: &OpportunityId,
        _decision: crate::workflows::triage::domain::ManagerDecisionRecord,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("conflict repository".to_string()))
    }

    fn fetch(&self, _id: &OpportunityId) -> Result<Option<OpportunityRecord>, RepositoryError> {
        Ok(None)
    }

    fn list(&self, _filter: &OpportunityFilter) -> Result<Vec<OpportunityRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// Completion client returning queued canned responses, failing once the
/// queue runs dry.
pub(super) struct ScriptedClient {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub(super) fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionClient for ScriptedClient {
    fn complete<'a>(&'a self, _prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .expect("scripted client mutex poisoned")
                .pop_front()
                .ok_or(ProviderError::EmptyCompletion)
        })
    }
}

/// Completion client that always fails the way an unreachable endpoint does.
pub(super) struct FailingClient;

impl CompletionClient for FailingClient {
    fn complete<'a>(&'a self, _prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async move {
            Err(ProviderError::Status {
                status: 503,
                message: "upstream unavailable".to_string(),
            })
        })
    }
}

/// Completion client that stalls before answering, for deadline and
/// in-flight guard tests.
pub(super) struct SlowClient {
    pub(super) delay: Duration,
    pub(super) response: String,
}

impl CompletionClient for SlowClient {
    fn complete<'a>(&'a self, _prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(self.response.clone())
        })
    }
}

pub(super) fn build_service(
    responses: Vec<String>,
) -> (
    OpportunityTriageService<MemoryRepository, ScriptedClient>,
    Arc<MemoryRepository>,
    Arc<ScriptedClient>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let client = Arc::new(ScriptedClient::new(responses));
    let service = OpportunityTriageService::new(
        Arc::clone(&repository),
        Arc::clone(&client),
        triage_config(),
    );
    (service, repository, client)
}

/// Polls until the record carries an AI assessment or the budget runs out.
pub(super) async fn wait_for_assessment(
    repository: &MemoryRepository,
    id: &OpportunityId,
) -> OpportunityRecord {
    for _ in 0..100 {
        if let Some(record) = repository.fetch(id).expect("fetch succeeds") {
            if record.ai_assessment.is_some() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("analysis did not complete within the polling budget");
}
