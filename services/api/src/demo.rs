use crate::infra::{InMemoryOpportunityRepository, StaticCompletionClient};
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use opportunity_ai::error::AppError;
use opportunity_ai::workflows::triage::{
    ManagerReviewRequest, OpportunityRepository, OpportunitySubmission, OpportunityTriageService,
    TriageConfig, Verdict,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Title of the demo opportunity
    #[arg(long, default_value = "Regional fleet telematics rollout")]
    pub(crate) title: String,
    /// Description of the demo opportunity
    #[arg(
        long,
        default_value = "Install trackers across 240 vehicles and stand up the reporting portal."
    )]
    pub(crate) description: String,
    /// Timeline text for the demo opportunity
    #[arg(long, default_value = "Pilot in eight weeks, full rollout by Q2")]
    pub(crate) timeline: String,
    /// Name recorded as the submitter
    #[arg(long, default_value = "demo-worker")]
    pub(crate) submitter: String,
    /// Optional file containing a canned model response to score against
    #[arg(long)]
    pub(crate) response_file: Option<PathBuf>,
    /// Record a manager decision (go or no_go) once scoring completes
    #[arg(long, value_parser = crate::infra::parse_verdict)]
    pub(crate) decision: Option<Verdict>,
}

const SAMPLE_RESPONSE: &str = "\
1. Lead Time Check (4)
Eight weeks leaves room for hardware lead times.
2. Project Insight (4)
Scope and deliverables are clearly described.
3. Client Relationship (3)
New client with strong references.
4. Expertise Alignment (5)
Telematics installs are core work for us.
5. Commercial Viability (4)
Margin holds at the quoted day rate.
6. Strategic Value (4)
Opens the regional logistics vertical.
7. Resources (3)
Install crews free after the current sprint.
Recommendation: Go, confidence 84%
The schedule and margin both hold with buffer to spare.";

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let response = match &args.response_file {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE_RESPONSE.to_string(),
    };

    let repository = Arc::new(InMemoryOpportunityRepository::default());
    let client = Arc::new(StaticCompletionClient::new(response));
    let service = OpportunityTriageService::new(
        Arc::clone(&repository),
        client,
        TriageConfig::default(),
    );

    let record = service
        .submit(OpportunitySubmission {
            title: args.title,
            description: args.description,
            timeline: args.timeline,
            submitted_by: args.submitter,
        })
        .map_err(AppError::from)?;
    println!("Submitted {} — {}", record.id, record.title);
    println!("Status: {} (scoring runs in the background)", record.status.label());

    let mut scored = None;
    for _ in 0..100 {
        if let Ok(Some(current)) = repository.fetch(&record.id) {
            if current.ai_assessment.is_some() {
                scored = Some(current);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let Some(scored) = scored else {
        println!("Analysis did not finish; the opportunity stays open and unscored.");
        return Ok(());
    };

    let assessment = scored
        .ai_assessment
        .as_ref()
        .expect("assessment present after polling");
    println!();
    println!("AI assessment");
    println!(
        "  verdict: {}  recommendation: {}  overall: {:.2}  confidence: {}%",
        assessment.verdict.label(),
        assessment.recommendation.label(),
        assessment.overall_score,
        assessment.confidence
    );
    for entry in &scored.scores {
        println!(
            "  {:<22} {}  {}",
            entry.criterion.key(),
            entry.score,
            entry.explanation
        );
    }

    if let Some(decision) = args.decision {
        let outcome = service
            .review(
                &record.id,
                ManagerReviewRequest {
                    decision,
                    comment: Some("Recorded via the CLI demo.".to_string()),
                    reviewed_by: "demo-manager".to_string(),
                    score_overrides: BTreeMap::new(),
                },
            )
            .map_err(AppError::from)?;
        println!();
        println!(
            "Manager decision: {} — status is now {}",
            decision.label(),
            outcome.record.status.label()
        );
    }

    let summary = service.dashboard().map_err(AppError::from)?;
    println!();
    println!(
        "Dashboard: {} total, {} go, {} no_go, {} pending",
        summary.total, summary.go, summary.no_go, summary.pending
    );

    Ok(())
}
