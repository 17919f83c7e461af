use serde::Serialize;

use super::config::{InquiryRule, ScoringBasis};
use super::domain::{InquiryScore, InquiryTrack};
use super::reference::SubjectConversionTable;
use crate::scoring::keywords::infer_track;

/// An elective that counted toward the inquiry representative value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickedElective {
    pub subject: String,
    pub track: InquiryTrack,
    pub value: f64,
    pub converted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InquirySelection {
    pub representative: f64,
    pub picked: Vec<PickedElective>,
    pub submitted: usize,
}

/// Averages the best `rule.count` electives by their basis value.
///
/// Under the converted basis each elective's percentile is mapped through the conversion
/// table for its track; electives without a table entry keep their standard score.
pub fn select_inquiry(
    electives: &[InquiryScore],
    rule: &InquiryRule,
    conversion: Option<&SubjectConversionTable>,
) -> InquirySelection {
    let mut candidates: Vec<PickedElective> = electives
        .iter()
        .map(|elective| representative_value(elective, rule.basis, conversion))
        .collect();

    if candidates.is_empty() {
        return InquirySelection {
            representative: 0.0,
            picked: Vec::new(),
            submitted: 0,
        };
    }

    // Stable: ties keep submission order.
    candidates.sort_by(|a, b| b.value.total_cmp(&a.value));

    let submitted = candidates.len();
    let count = usize::from(rule.count.max(1)).min(submitted);
    candidates.truncate(count);
    let representative = candidates.iter().map(|picked| picked.value).sum::<f64>() / count as f64;

    InquirySelection {
        representative,
        picked: candidates,
        submitted,
    }
}

fn representative_value(
    elective: &InquiryScore,
    basis: ScoringBasis,
    conversion: Option<&SubjectConversionTable>,
) -> PickedElective {
    let subject = elective
        .subject_name
        .clone()
        .unwrap_or_else(|| "탐구".to_string());
    let track = elective.track.unwrap_or_else(|| infer_track(&subject));
    let standard = finite_or_zero(elective.standard_score);
    let percentile = finite_or_zero(elective.percentile);

    let (value, converted) = match basis {
        ScoringBasis::Percentile => (percentile, false),
        ScoringBasis::StandardScore => (standard, false),
        ScoringBasis::ConvertedStandardScore => {
            match conversion.and_then(|table| table.lookup(track, percentile)) {
                Some(converted) => (converted, true),
                None => (standard, false),
            }
        }
    };

    PickedElective {
        subject,
        track,
        value,
        converted,
    }
}

pub(crate) fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|value| value.is_finite()).unwrap_or(0.0)
}
