use super::config::FeasibilityBands;
use super::rules::RuleSignals;
use super::{FeasibilityRating, FollowUpPriority, QualificationLevel};

/// Band decision before guidance text is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BandDecision {
    pub rating: FeasibilityRating,
    pub qualification: QualificationLevel,
    pub priority: FollowUpPriority,
}

pub(crate) fn decide_band(
    percentage: u8,
    bands: &FeasibilityBands,
    signals: &RuleSignals,
) -> BandDecision {
    if signals.is_disqualified() {
        return not_feasible();
    }

    match bands.band_for(percentage) {
        FeasibilityRating::High => BandDecision {
            rating: FeasibilityRating::High,
            qualification: QualificationLevel::Qualified,
            priority: FollowUpPriority::High,
        },
        FeasibilityRating::Medium if signals.is_partial() => BandDecision {
            rating: FeasibilityRating::Medium,
            qualification: QualificationLevel::PartiallyQualified,
            priority: FollowUpPriority::Medium,
        },
        FeasibilityRating::Medium => BandDecision {
            rating: FeasibilityRating::Medium,
            qualification: QualificationLevel::Qualified,
            priority: FollowUpPriority::High,
        },
        FeasibilityRating::Low => BandDecision {
            rating: FeasibilityRating::Low,
            qualification: QualificationLevel::PartiallyQualified,
            priority: FollowUpPriority::Medium,
        },
        FeasibilityRating::NotFeasible => not_feasible(),
    }
}

fn not_feasible() -> BandDecision {
    BandDecision {
        rating: FeasibilityRating::NotFeasible,
        qualification: QualificationLevel::NotQualified,
        priority: FollowUpPriority::Low,
    }
}
