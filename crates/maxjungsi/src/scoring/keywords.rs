//! Keyword heuristics shared by the calculators.
//!
//! Subject and event names arrive as free text from each university's tables, so the
//! classification rules live here as plain lists that can be audited and tested on their own.

use super::academic::InquiryTrack;
use serde::{Deserialize, Serialize};

/// Inquiry subjects (full and abbreviated names) that belong to the social-studies track.
pub const SOCIAL_TRACK_KEYWORDS: &[&str] = &[
    "생활과윤리",
    "윤리와사상",
    "한국지리",
    "세계지리",
    "동아시아사",
    "세계사",
    "경제",
    "정치와법",
    "사회문화",
    "생윤",
    "윤사",
    "한지",
    "세지",
    "동사",
    "세사",
    "사문",
];

/// Substrings of timed events, matched against the lower-cased event name.
pub const LOWER_IS_BETTER_KEYWORDS: &[&str] = &["m", "run", "왕복", "초", "벽", "지그", "z", "달리기"];

/// Distance events that stay higher-is-better even when a timed keyword also matches.
pub const HIGHER_IS_BETTER_OVERRIDES: &[&str] = &["던지기", "멀리뛰기"];

/// Records that always earn the table's minimum points.
pub const FORCED_MINIMUM_LABELS: &[&str] = &["F", "G", "미응시", "파울", "실격"];

/// Label rows left out when searching a table for its minimum numeric points.
pub const MINIMUM_IGNORED_LABELS: &[&str] = &["F", "G", "미응시", "파울", "실격", "P", "PASS"];

/// Whether a smaller or a larger record earns more points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordDirection {
    LowerIsBetter,
    HigherIsBetter,
}

impl RecordDirection {
    pub const fn label(self) -> &'static str {
        match self {
            RecordDirection::LowerIsBetter => "lower is better",
            RecordDirection::HigherIsBetter => "higher is better",
        }
    }
}

/// Infers the track of an inquiry subject from its name, defaulting to science.
pub fn infer_track(subject_name: &str) -> InquiryTrack {
    if SOCIAL_TRACK_KEYWORDS
        .iter()
        .any(|keyword| subject_name.contains(keyword))
    {
        InquiryTrack::Social
    } else {
        InquiryTrack::Science
    }
}

pub fn event_direction(event_name: &str) -> RecordDirection {
    if HIGHER_IS_BETTER_OVERRIDES
        .iter()
        .any(|keyword| event_name.contains(keyword))
    {
        return RecordDirection::HigherIsBetter;
    }

    let lowered = event_name.to_lowercase();
    if LOWER_IS_BETTER_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
    {
        RecordDirection::LowerIsBetter
    } else {
        RecordDirection::HigherIsBetter
    }
}

/// Expects a trimmed, upper-cased record.
pub fn is_forced_minimum_label(normalized: &str) -> bool {
    FORCED_MINIMUM_LABELS.contains(&normalized)
}

/// Expects a trimmed, upper-cased record.
pub fn is_minimum_ignored_label(normalized: &str) -> bool {
    MINIMUM_IGNORED_LABELS.contains(&normalized)
}
