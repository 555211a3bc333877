use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use opportunity_ai::config::AppConfig;
use opportunity_ai::workflows::triage::{
    CompletionClient, CompletionFuture, CriteriaRegistry, DecisionPolicy, OpportunityFilter,
    OpportunityId, OpportunityRecord, OpportunityRepository, RepositoryError, ScoreScale,
    TriageConfig, Verdict,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory opportunity store used by the service and demo. Listing is
/// newest-first, matching the store contract.
#[derive(Default)]
pub(crate) struct InMemoryOpportunityRepository {
    records: Mutex<Vec<OpportunityRecord>>,
}

impl InMemoryOpportunityRepository {
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
        record.updated_at = chrono::Utc::now();
        Ok(result)
    }
}

impl OpportunityRepository for InMemoryOpportunityRepository {
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
        scores: Vec<opportunity_ai::workflows::triage::ScoreEntry>,
    ) -> Result<(), RepositoryError> {
        self.with_record(id, |record| record.scores.extend(scores))
    }

    fn set_ai_assessment(
        &self,
        id: &OpportunityId,
        assessment: opportunity_ai::workflows::triage::AiAssessment,
    ) -> Result<(), RepositoryError> {
        self.with_record(id, |record| record.ai_assessment = Some(assessment))
    }

    fn set_manager_decision(
        &self,
        id: &OpportunityId,
        decision: opportunity_ai::workflows::triage::ManagerDecisionRecord,
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

/// Completion client that replays one canned response, so the demo runs
/// without network access or an API key.
pub(crate) struct StaticCompletionClient {
    response: String,
}

impl StaticCompletionClient {
    pub(crate) fn new(response: String) -> Self {
        Self { response }
    }
}

impl CompletionClient for StaticCompletionClient {
    fn complete<'a>(&'a self, _prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async move { Ok(self.response.clone()) })
    }
}

/// Maps the env-driven settings onto the triage pipeline configuration.
pub(crate) fn triage_config_from(config: &AppConfig) -> TriageConfig {
    let registry = if config.scoring.uniform_weights {
        CriteriaRegistry::uniform()
    } else {
        CriteriaRegistry::standard()
    };

    TriageConfig {
        registry,
        policy: DecisionPolicy {
            go_threshold: config.scoring.go_threshold,
            review_threshold: config.scoring.review_threshold,
        },
        scale: ScoreScale {
            min: config.scoring.scale_min,
            max: config.scoring.scale_max,
        },
        analysis_deadline: Duration::from_secs(config.provider.analysis_deadline_secs),
    }
}

pub(crate) fn parse_verdict(raw: &str) -> Result<Verdict, String> {
    Verdict::parse(raw).ok_or_else(|| format!("'{raw}' is not one of: go, no_go"))
}
