//! Screening questionnaire engine for solar installation leads.
//!
//! The engine decides which questions are visible for the current answers, tracks
//! completion and submit eligibility, scores the answers and classifies the score
//! into a feasibility decision. Everything under [`workflows::screening`] is pure;
//! the service, router and importer wrap it for the API binary.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
