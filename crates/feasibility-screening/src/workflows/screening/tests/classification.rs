use super::common::*;
use crate::workflows::screening::classification::{
    classify, AnswerRule, ClassificationRules, FeasibilityBands, FeasibilityRating,
    FollowUpPriority, MatchMode, QualificationLevel, RulesError,
};
use crate::workflows::screening::domain::{
    Condition, ConditionOperator, QuestionAnswer, ResponseMap,
};
use crate::workflows::screening::scoring::ScoreSummary;

fn summary(percentage: u8) -> ScoreSummary {
    ScoreSummary {
        raw: f64::from(percentage),
        max: 100.0,
        percentage,
    }
}

fn bare_rules() -> ClassificationRules {
    serde_json::from_str(r#"{ "bands": { "high": 80, "medium": 60, "low": 40 } }"#)
        .expect("rules parse")
}

#[test]
fn bands_map_to_rating_qualification_and_priority() {
    let rules = bare_rules();
    let empty = ResponseMap::new();

    let cases = [
        (
            100,
            FeasibilityRating::High,
            QualificationLevel::Qualified,
            FollowUpPriority::High,
        ),
        (
            80,
            FeasibilityRating::High,
            QualificationLevel::Qualified,
            FollowUpPriority::High,
        ),
        (
            79,
            FeasibilityRating::Medium,
            QualificationLevel::Qualified,
            FollowUpPriority::High,
        ),
        (
            40,
            FeasibilityRating::Low,
            QualificationLevel::PartiallyQualified,
            FollowUpPriority::Medium,
        ),
        (
            39,
            FeasibilityRating::NotFeasible,
            QualificationLevel::NotQualified,
            FollowUpPriority::Low,
        ),
        (
            0,
            FeasibilityRating::NotFeasible,
            QualificationLevel::NotQualified,
            FollowUpPriority::Low,
        ),
    ];

    for (percentage, rating, qualification, priority) in cases {
        let result = classify(&summary(percentage), &empty, &rules);
        assert_eq!(result.feasibility_rating, rating, "at {percentage}%");
        assert_eq!(result.qualification_level, qualification, "at {percentage}%");
        assert_eq!(result.follow_up_priority, priority, "at {percentage}%");
        assert_eq!(result.percentage, percentage);
    }
}

#[test]
fn disqualifier_overrides_a_perfect_score() {
    let template = standard_template();
    let answered = responses(&[
        ("ownership", "tenant".into()),
        ("landlord_consent", false.into()),
    ]);

    let result = classify(&summary(100), &answered, &template.rules);

    assert_eq!(result.feasibility_rating, FeasibilityRating::NotFeasible);
    assert_eq!(result.qualification_level, QualificationLevel::NotQualified);
    assert_eq!(result.follow_up_priority, FollowUpPriority::Low);
    assert_eq!(
        result.risk_factors.first().map(String::as_str),
        Some("Landlord consent is required before installing on a rented property")
    );
    assert!(result
        .next_steps
        .contains(&"Close the lead with a courtesy message".to_string()));
}

#[test]
fn partial_qualifier_downgrades_medium_band() {
    let template = standard_template();
    let shaded = responses(&[("shading", "partial".into()), ("monthly_bill", 6500.into())]);
    let clear = responses(&[("shading", "none".into()), ("monthly_bill", 6500.into())]);

    let downgraded = classify(&summary(75), &shaded, &template.rules);
    let qualified = classify(&summary(75), &clear, &template.rules);

    assert_eq!(downgraded.feasibility_rating, FeasibilityRating::Medium);
    assert_eq!(
        downgraded.qualification_level,
        QualificationLevel::PartiallyQualified
    );
    assert_eq!(downgraded.follow_up_priority, FollowUpPriority::Medium);
    assert!(downgraded
        .risk_factors
        .contains(&"Partial shading will reduce yield; consider panel optimizers".to_string()));

    assert_eq!(qualified.qualification_level, QualificationLevel::Qualified);
    assert_eq!(qualified.follow_up_priority, FollowUpPriority::High);
}

#[test]
fn partial_qualifier_does_not_affect_high_band() {
    let template = standard_template();
    let shaded = responses(&[("shading", "partial".into())]);

    let result = classify(&summary(95), &shaded, &template.rules);

    assert_eq!(result.qualification_level, QualificationLevel::Qualified);
}

#[test]
fn rule_guidance_precedes_band_guidance_without_duplicates() {
    let template = standard_template();
    let answered = responses(&[
        (
            "interests",
            QuestionAnswer::List(vec!["battery".to_string(), "ev-charger".to_string()]),
        ),
        ("installation_timeline", "within-3-months".into()),
    ]);

    let result = classify(&summary(90), &answered, &template.rules);

    assert_eq!(
        result.recommendations,
        vec![
            "Size a battery for evening load shifting".to_string(),
            "Include a dedicated EV charger circuit in the design".to_string(),
            "Prepare a detailed proposal with financing options".to_string(),
        ]
    );
    assert_eq!(
        result.next_steps,
        vec![
            "Book the site survey this month".to_string(),
            "Schedule a site survey within 7 days".to_string(),
        ]
    );
}

#[test]
fn estimates_follow_the_monthly_bill() {
    let template = standard_template();
    let answered = responses(&[("monthly_bill", 6000.into())]);

    let result = classify(&summary(90), &answered, &template.rules);

    let size = result.estimated_system_size.expect("size estimate");
    assert_eq!(size.unit, "kWp");
    assert_eq!(size.low, 7.65);
    assert_eq!(size.high, 10.35);

    let investment = result.estimated_investment.expect("investment estimate");
    assert_eq!(investment.unit, "THB");
    assert_eq!(investment.low, 250000.0);
    assert_eq!(investment.high, 400000.0);

    let without_bill = classify(&summary(90), &ResponseMap::new(), &template.rules);
    assert!(without_bill.estimated_system_size.is_none());
    assert!(without_bill.estimated_investment.is_none());
}

#[test]
fn any_mode_rules_match_on_a_single_condition() {
    let rule = AnswerRule {
        when: vec![
            Condition::new("roof_age_years", ConditionOperator::GreaterThan, 20),
            Condition::new("shading", ConditionOperator::Equals, "partial"),
        ],
        mode: MatchMode::Any,
        message: "review".to_string(),
    };
    let all = AnswerRule {
        mode: MatchMode::All,
        ..rule.clone()
    };
    let answered = responses(&[("roof_age_years", 25.into())]);

    assert!(rule.matches(&answered));
    assert!(!all.matches(&answered));
}

#[test]
fn rules_validation_rejects_inconsistent_documents() {
    let mut rules = bare_rules();
    rules.bands = FeasibilityBands {
        high: 101,
        medium: 60,
        low: 40,
    };
    assert!(matches!(
        rules.validate(|_| true),
        Err(RulesError::InvalidBands { .. })
    ));

    let mut rules = bare_rules();
    rules.disqualifiers.push(AnswerRule {
        when: Vec::new(),
        mode: MatchMode::All,
        message: "always".to_string(),
    });
    assert!(matches!(
        rules.validate(|_| true),
        Err(RulesError::EmptyRule { .. })
    ));
}

#[test]
fn summary_reads_like_a_crm_note() {
    let result = classify(&summary(90), &ResponseMap::new(), &bare_rules());

    assert_eq!(
        result.summary(),
        "high feasibility (90%), qualified, high priority follow-up"
    );
}
