use serde::{Deserialize, Serialize};

use super::domain::{Question, ResponseMap};
use super::progress::percent;

/// Completeness weighted by importance. Which answers make a site feasible is
/// decided by the classifier, not here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub raw: f64,
    pub max: f64,
    pub percentage: u8,
}

pub fn score(visible: &[&Question], responses: &ResponseMap) -> ScoreSummary {
    let (raw, max) = visible
        .iter()
        .fold((0.0, 0.0), |(raw, max), question| {
            let earned = if responses.is_answered(question.id.as_str()) {
                question.weight
            } else {
                0.0
            };
            (raw + earned, max + question.weight)
        });

    ScoreSummary {
        raw,
        max,
        percentage: percent(raw, max),
    }
}
