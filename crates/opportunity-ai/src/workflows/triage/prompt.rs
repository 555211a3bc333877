use std::fmt::Write;

use super::criteria::CriteriaRegistry;
use super::domain::{OpportunitySubmission, ScoreScale};

/// Builds the analysis prompt sent to the completion endpoint. The numbered
/// criterion lines double as the anchor pattern the free-text extractor
/// scans for, so the two must stay in the same shape.
pub fn build_analysis_prompt(
    submission: &OpportunitySubmission,
    registry: &CriteriaRegistry,
    scale: ScoreScale,
) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are an expert business analyst tasked with evaluating business opportunities."
    );
    let _ = writeln!(
        prompt,
        "Analyze the following opportunity and provide a detailed Go/No Go recommendation.\n"
    );
    let _ = writeln!(prompt, "Title: {}", submission.title);
    let _ = writeln!(prompt, "Description: {}", submission.description);
    let _ = writeln!(prompt, "Timeline: {}\n", submission.timeline);
    let _ = writeln!(
        prompt,
        "Score each of the following criteria on a scale of {min}-{max} (where {min} is poor and {max} is excellent):\n",
        min = scale.min,
        max = scale.max,
    );

    for (index, profile) in registry.profiles().iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. {} ({}-{})",
            index + 1,
            profile.name,
            scale.min,
            scale.max
        );
        let _ = writeln!(prompt, "   - {}\n", profile.description);
    }

    let _ = writeln!(prompt, "For each criterion, provide:");
    let _ = writeln!(
        prompt,
        "- A numerical score ({}-{})",
        scale.min, scale.max
    );
    let _ = writeln!(
        prompt,
        "- A detailed explanation justifying the score based on the information provided\n"
    );
    let _ = writeln!(
        prompt,
        "Then, provide an overall Go/No Go recommendation with:"
    );
    let _ = writeln!(prompt, "- A clear decision (Go or No Go)");
    let _ = writeln!(prompt, "- Your confidence level (percentage)");
    let _ = writeln!(
        prompt,
        "- Comprehensive reasoning that weighs the various criteria"
    );

    prompt
}
