use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The seven fixed evaluation dimensions, plus a catch-all for scores the
/// model assigns outside the rubric.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    LeadTimeCheck,
    ProjectInsight,
    ClientRelationship,
    ExpertiseAlignment,
    CommercialViability,
    StrategicValue,
    Resources,
    Other,
}

impl Criterion {
    /// The scored dimensions, in prompt order. `Other` is excluded.
    pub const KNOWN: [Criterion; 7] = [
        Criterion::LeadTimeCheck,
        Criterion::ProjectInsight,
        Criterion::ClientRelationship,
        Criterion::ExpertiseAlignment,
        Criterion::CommercialViability,
        Criterion::StrategicValue,
        Criterion::Resources,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Criterion::LeadTimeCheck => "lead_time_check",
            Criterion::ProjectInsight => "project_insight",
            Criterion::ClientRelationship => "client_relationship",
            Criterion::ExpertiseAlignment => "expertise_alignment",
            Criterion::CommercialViability => "commercial_viability",
            Criterion::StrategicValue => "strategic_value",
            Criterion::Resources => "resources",
            Criterion::Other => "other",
        }
    }

    /// Resolves a criterion from any of the spellings the model emits:
    /// `lead_time_check`, `leadTimeCheck`, or `Lead Time Check`.
    pub fn parse_loose(raw: &str) -> Option<Criterion> {
        let compact: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match compact.as_str() {
            "leadtimecheck" => Some(Criterion::LeadTimeCheck),
            "projectinsight" => Some(Criterion::ProjectInsight),
            "clientrelationship" => Some(Criterion::ClientRelationship),
            "expertisealignment" => Some(Criterion::ExpertiseAlignment),
            "commercialviability" => Some(Criterion::CommercialViability),
            "strategicvalue" => Some(Criterion::StrategicValue),
            "resources" => Some(Criterion::Resources),
            "other" => Some(Criterion::Other),
            _ => None,
        }
    }
}

/// Prompt-facing description of a single criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionProfile {
    pub criterion: Criterion,
    pub name: &'static str,
    pub description: &'static str,
    pub weight: f64,
}

/// Read-only registry of the scored criteria. Built once at startup; a
/// missing criterion or non-positive weight is a construction error, never a
/// request-time condition.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaRegistry {
    profiles: Vec<CriterionProfile>,
}

impl CriteriaRegistry {
    /// Domain-weighted rubric used by the scoring module (1-10 weight scale).
    pub fn standard() -> Self {
        Self {
            profiles: vec![
                CriterionProfile {
                    criterion: Criterion::LeadTimeCheck,
                    name: "Lead Time Check",
                    description: "Evaluates if the project timeline is realistic and achievable",
                    weight: 8.0,
                },
                CriterionProfile {
                    criterion: Criterion::ProjectInsight,
                    name: "Project Insight",
                    description:
                        "Evaluates the clarity and completeness of the project description",
                    weight: 7.0,
                },
                CriterionProfile {
                    criterion: Criterion::ClientRelationship,
                    name: "Client Relationship",
                    description: "Evaluates the existing relationship with the client",
                    weight: 6.0,
                },
                CriterionProfile {
                    criterion: Criterion::ExpertiseAlignment,
                    name: "Expertise Alignment",
                    description: "Evaluates how well the project aligns with our expertise",
                    weight: 9.0,
                },
                CriterionProfile {
                    criterion: Criterion::CommercialViability,
                    name: "Commercial Viability",
                    description: "Evaluates the commercial potential of the project",
                    weight: 10.0,
                },
                CriterionProfile {
                    criterion: Criterion::StrategicValue,
                    name: "Strategic Value",
                    description: "Evaluates the strategic importance of the project",
                    weight: 8.0,
                },
                CriterionProfile {
                    criterion: Criterion::Resources,
                    name: "Resources",
                    description: "Evaluates the availability of resources for the project",
                    weight: 7.0,
                },
            ],
        }
    }

    /// Every criterion weighted equally, matching the settings-table default.
    pub fn uniform() -> Self {
        let mut registry = Self::standard();
        for profile in &mut registry.profiles {
            profile.weight = 1.0;
        }
        registry
    }

    /// Replaces weights per criterion. Rejects non-positive weights so a bad
    /// settings row cannot zero out the denominator at request time.
    pub fn with_weights(
        mut self,
        overrides: &BTreeMap<Criterion, f64>,
    ) -> Result<Self, InvalidWeight> {
        for (criterion, weight) in overrides {
            if *weight <= 0.0 || !weight.is_finite() {
                return Err(InvalidWeight {
                    criterion: *criterion,
                    weight: *weight,
                });
            }
            if let Some(profile) = self
                .profiles
                .iter_mut()
                .find(|profile| profile.criterion == *criterion)
            {
                profile.weight = *weight;
            }
        }
        Ok(self)
    }

    pub fn profiles(&self) -> &[CriterionProfile] {
        &self.profiles
    }

    pub fn weight(&self, criterion: Criterion) -> f64 {
        self.profiles
            .iter()
            .find(|profile| profile.criterion == criterion)
            .map(|profile| profile.weight)
            .unwrap_or(1.0)
    }

    /// Lookup used by free-text extraction, keyed on the lowercased display
    /// name the model echoes back (e.g. "lead time check").
    pub fn resolve(&self, raw_name: &str) -> Option<Criterion> {
        Criterion::parse_loose(raw_name).filter(|criterion| {
            *criterion == Criterion::Other
                || self
                    .profiles
                    .iter()
                    .any(|profile| profile.criterion == *criterion)
        })
    }
}

/// Raised when a configured weight cannot be used.
#[derive(Debug, thiserror::Error)]
#[error("weight {weight} for criterion '{}' must be positive and finite", .criterion.key())]
pub struct InvalidWeight {
    pub criterion: Criterion,
    pub weight: f64,
}
