use serde::{Deserialize, Serialize};

use super::super::conditions::coerce_to_number;
use super::super::domain::{QuestionId, ResponseMap};
use super::config::RulesError;

/// Optional projections of system size and investment from numeric answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_size: Option<Projection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment: Option<Projection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub source: QuestionId,
    pub unit: String,
    #[serde(flatten)]
    pub method: ProjectionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ProjectionMethod {
    /// `coefficient * answer + intercept`, widened by `spread` (a fraction) each side.
    Linear {
        coefficient: f64,
        #[serde(default)]
        intercept: f64,
        #[serde(default)]
        spread: f64,
    },
    /// First step from the top whose `at_least` the answer reaches. Steps ascend.
    Table { steps: Vec<TableStep> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableStep {
    pub at_least: f64,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRange {
    pub low: f64,
    pub high: f64,
    pub unit: String,
}

impl EstimateRules {
    pub(crate) fn validate<F: Fn(&str) -> bool>(&self, known_question: &F) -> Result<(), RulesError> {
        for (estimate, projection) in [
            ("system size", &self.system_size),
            ("investment", &self.investment),
        ] {
            if let Some(projection) = projection {
                projection
                    .validate(known_question)
                    .map_err(|reason| RulesError::InvalidProjection { estimate, reason })?;
            }
        }
        Ok(())
    }
}

impl Projection {
    /// `None` when the source question is unanswered or not numeric.
    pub fn project(&self, responses: &ResponseMap) -> Option<EstimateRange> {
        let input = responses
            .get(self.source.as_str())
            .and_then(coerce_to_number)
            .filter(|value| value.is_finite())?;

        let (low, high) = match &self.method {
            ProjectionMethod::Linear {
                coefficient,
                intercept,
                spread,
            } => {
                let midpoint = (coefficient * input + intercept).max(0.0);
                (midpoint * (1.0 - spread), midpoint * (1.0 + spread))
            }
            ProjectionMethod::Table { steps } => {
                let step = steps.iter().rev().find(|step| input >= step.at_least)?;
                (step.low, step.high)
            }
        };

        Some(EstimateRange {
            low: round_to_cents(low.max(0.0)),
            high: round_to_cents(high.max(0.0)),
            unit: self.unit.clone(),
        })
    }

    fn validate<F: Fn(&str) -> bool>(&self, known_question: &F) -> Result<(), String> {
        if !known_question(self.source.as_str()) {
            return Err(format!("source question '{}' does not exist", self.source));
        }

        match &self.method {
            ProjectionMethod::Linear {
                coefficient,
                intercept,
                spread,
            } => {
                if !coefficient.is_finite() || !intercept.is_finite() {
                    return Err("coefficient and intercept must be finite".to_string());
                }
                if !(0.0..1.0).contains(spread) {
                    return Err(format!("spread {spread} must be within [0, 1)"));
                }
            }
            ProjectionMethod::Table { steps } => {
                if steps.is_empty() {
                    return Err("table has no steps".to_string());
                }
                if steps.windows(2).any(|pair| pair[0].at_least >= pair[1].at_least) {
                    return Err("table steps must ascend by at_least".to_string());
                }
                if let Some(step) = steps.iter().find(|step| step.low > step.high) {
                    return Err(format!(
                        "step at {} has low {} above high {}",
                        step.at_least, step.low, step.high
                    ));
                }
            }
        }

        Ok(())
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
