//! Opportunity triage: AI-assisted Go/No-Go scoring for submitted business
//! opportunities, plus the manager review path that records the final call.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
