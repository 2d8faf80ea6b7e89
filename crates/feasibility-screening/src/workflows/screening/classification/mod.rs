mod config;
mod estimates;
mod policy;
mod rules;

pub use config::{
    AnswerRule, BandGuidance, ClassificationRules, FeasibilityBands, GuidanceKind, GuidanceRule,
    MatchMode, RulesError,
};
pub use estimates::{EstimateRange, EstimateRules, Projection, ProjectionMethod, TableStep};

use serde::{Deserialize, Serialize};

use super::domain::ResponseMap;
use super::scoring::ScoreSummary;
use policy::decide_band;
use rules::{evaluate_rules, push_unique};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeasibilityRating {
    High,
    Medium,
    Low,
    NotFeasible,
}

impl FeasibilityRating {
    pub const fn label(self) -> &'static str {
        match self {
            FeasibilityRating::High => "high",
            FeasibilityRating::Medium => "medium",
            FeasibilityRating::Low => "low",
            FeasibilityRating::NotFeasible => "not_feasible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationLevel {
    Qualified,
    PartiallyQualified,
    NotQualified,
}

impl QualificationLevel {
    pub const fn label(self) -> &'static str {
        match self {
            QualificationLevel::Qualified => "qualified",
            QualificationLevel::PartiallyQualified => "partially_qualified",
            QualificationLevel::NotQualified => "not_qualified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpPriority {
    Low,
    Medium,
    High,
}

impl FollowUpPriority {
    pub const fn label(self) -> &'static str {
        match self {
            FollowUpPriority::Low => "low",
            FollowUpPriority::Medium => "medium",
            FollowUpPriority::High => "high",
        }
    }
}

/// Decision produced once per submitted screening. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub score: f64,
    pub max_score: f64,
    pub percentage: u8,
    pub feasibility_rating: FeasibilityRating,
    pub qualification_level: QualificationLevel,
    pub follow_up_priority: FollowUpPriority,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub next_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_system_size: Option<EstimateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_investment: Option<EstimateRange>,
}

impl ScreeningResult {
    pub fn summary(&self) -> String {
        format!(
            "{} feasibility ({}%), {}, {} priority follow-up",
            self.feasibility_rating.label(),
            self.percentage,
            self.qualification_level.label().replace('_', " "),
            self.follow_up_priority.label()
        )
    }
}

/// Map a score and the raw answers onto the rubric. Total: every input yields a result.
pub fn classify(
    score: &ScoreSummary,
    responses: &ResponseMap,
    rules: &ClassificationRules,
) -> ScreeningResult {
    let signals = evaluate_rules(rules, responses);
    let decision = decide_band(score.percentage, &rules.bands, &signals);

    let mut risk_factors = Vec::new();
    for message in signals
        .disqualifications
        .iter()
        .chain(signals.risk_factors.iter())
    {
        push_unique(&mut risk_factors, message);
    }

    let mut recommendations = signals.recommendations;
    let mut next_steps = signals.next_steps;
    if let Some(guidance) = rules.band_guidance.get(&decision.rating) {
        for message in &guidance.recommendations {
            push_unique(&mut recommendations, message);
        }
        for message in &guidance.next_steps {
            push_unique(&mut next_steps, message);
        }
    }

    let project = |projection: &Option<Projection>| {
        projection
            .as_ref()
            .and_then(|projection| projection.project(responses))
    };

    ScreeningResult {
        score: score.raw,
        max_score: score.max,
        percentage: score.percentage,
        feasibility_rating: decision.rating,
        qualification_level: decision.qualification,
        follow_up_priority: decision.priority,
        recommendations,
        risk_factors,
        next_steps,
        estimated_system_size: project(&rules.estimates.system_size),
        estimated_investment: project(&rules.estimates.investment),
    }
}
