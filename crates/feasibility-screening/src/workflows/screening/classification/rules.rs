use super::super::domain::ResponseMap;
use super::config::{ClassificationRules, GuidanceKind};

/// Messages produced by answer-driven rules, before the band decision.
#[derive(Debug, Default)]
pub(crate) struct RuleSignals {
    pub disqualifications: Vec<String>,
    pub partial_reasons: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub next_steps: Vec<String>,
}

impl RuleSignals {
    pub fn is_disqualified(&self) -> bool {
        !self.disqualifications.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.partial_reasons.is_empty()
    }
}

pub(crate) fn evaluate_rules(rules: &ClassificationRules, responses: &ResponseMap) -> RuleSignals {
    let mut signals = RuleSignals::default();

    for rule in &rules.disqualifiers {
        if rule.matches(responses) {
            push_unique(&mut signals.disqualifications, &rule.message);
        }
    }

    for rule in &rules.partial_qualifiers {
        if rule.matches(responses) {
            push_unique(&mut signals.partial_reasons, &rule.message);
        }
    }

    for guidance in &rules.answer_rules {
        if !guidance.rule.matches(responses) {
            continue;
        }
        let target = match guidance.kind {
            GuidanceKind::Recommendation => &mut signals.recommendations,
            GuidanceKind::RiskFactor => &mut signals.risk_factors,
            GuidanceKind::NextStep => &mut signals.next_steps,
        };
        push_unique(target, &guidance.rule.message);
    }

    signals
}

pub(crate) fn push_unique(list: &mut Vec<String>, message: &str) {
    if !list.iter().any(|existing| existing == message) {
        list.push(message.to_string());
    }
}
