use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::conditions::condition_holds;
use super::super::domain::{Condition, QuestionId, ResponseMap};
use super::estimates::EstimateRules;
use super::FeasibilityRating;

/// Data-driven classification rubric. Changing a screening flow's decisions means
/// editing this document, not the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRules {
    pub bands: FeasibilityBands,
    /// Any match forces `not_feasible` whatever the score.
    #[serde(default)]
    pub disqualifiers: Vec<AnswerRule>,
    /// Any match downgrades a medium-band result to partially qualified.
    #[serde(default)]
    pub partial_qualifiers: Vec<AnswerRule>,
    #[serde(default)]
    pub answer_rules: Vec<GuidanceRule>,
    #[serde(default)]
    pub band_guidance: BTreeMap<FeasibilityRating, BandGuidance>,
    #[serde(default)]
    pub estimates: EstimateRules,
}

/// Minimum percentage for each band; anything below `low` is not feasible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityBands {
    pub high: u8,
    pub medium: u8,
    pub low: u8,
}

impl FeasibilityBands {
    pub fn band_for(&self, percentage: u8) -> FeasibilityRating {
        if percentage >= self.high {
            FeasibilityRating::High
        } else if percentage >= self.medium {
            FeasibilityRating::Medium
        } else if percentage >= self.low {
            FeasibilityRating::Low
        } else {
            FeasibilityRating::NotFeasible
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// Conditions over individual answers plus the message reported when they match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRule {
    pub when: Vec<Condition>,
    #[serde(default)]
    pub mode: MatchMode,
    pub message: String,
}

impl AnswerRule {
    pub fn matches(&self, responses: &ResponseMap) -> bool {
        if self.when.is_empty() {
            return false;
        }

        match self.mode {
            MatchMode::All => self
                .when
                .iter()
                .all(|condition| condition_holds(condition, responses)),
            MatchMode::Any => self
                .when
                .iter()
                .any(|condition| condition_holds(condition, responses)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceKind {
    Recommendation,
    RiskFactor,
    NextStep,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceRule {
    pub kind: GuidanceKind,
    #[serde(flatten)]
    pub rule: AnswerRule,
}

/// Default advice appended for a band after rule-driven output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandGuidance {
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RulesError {
    #[error("bands must satisfy 100 >= high > medium > low (got high {high}, medium {medium}, low {low})")]
    InvalidBands { high: u8, medium: u8, low: u8 },
    #[error("{section} rule '{message}' has no conditions")]
    EmptyRule {
        section: &'static str,
        message: String,
    },
    #[error("rule condition refers to unknown question '{0}'")]
    UnknownQuestion(QuestionId),
    #[error("{estimate} projection is invalid: {reason}")]
    InvalidProjection {
        estimate: &'static str,
        reason: String,
    },
}

impl ClassificationRules {
    /// Check internal consistency and that every referenced question exists.
    pub fn validate(&self, known_question: impl Fn(&str) -> bool) -> Result<(), RulesError> {
        let FeasibilityBands { high, medium, low } = self.bands;
        if high > 100 || high <= medium || medium <= low {
            return Err(RulesError::InvalidBands { high, medium, low });
        }

        let sections = [
            ("disqualifier", self.disqualifiers.iter().collect::<Vec<_>>()),
            ("partial qualifier", self.partial_qualifiers.iter().collect()),
            (
                "answer",
                self.answer_rules.iter().map(|guidance| &guidance.rule).collect(),
            ),
        ];

        for (section, rules) in sections {
            for rule in rules {
                if rule.when.is_empty() {
                    return Err(RulesError::EmptyRule {
                        section,
                        message: rule.message.clone(),
                    });
                }
                if let Some(unknown) = rule
                    .when
                    .iter()
                    .find(|condition| !known_question(condition.question_id.as_str()))
                {
                    return Err(RulesError::UnknownQuestion(unknown.question_id.clone()));
                }
            }
        }

        self.estimates.validate(&known_question)
    }
}
