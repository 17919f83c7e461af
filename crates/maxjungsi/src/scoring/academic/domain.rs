use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Exam results for one sitting. Field aliases accept the intake system's Korean keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentAcademicScore {
    #[serde(default, alias = "국어")]
    pub korean: SectionScore,
    #[serde(default, alias = "수학")]
    pub math: SectionScore,
    #[serde(default, alias = "영어")]
    pub english: GradedScore,
    #[serde(default, alias = "탐구")]
    pub inquiry: Vec<InquiryScore>,
    #[serde(default, alias = "한국사")]
    pub history: GradedScore,
}

/// Korean or Math result. `subject_name` is the elective taken (e.g. "미적분") and keys the
/// highest-of-year lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionScore {
    #[serde(default, alias = "std")]
    pub standard_score: Option<f64>,
    #[serde(default)]
    pub percentile: Option<f64>,
    #[serde(default, alias = "subject")]
    pub subject_name: Option<String>,
}

/// Absolute-graded subject (English, History).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradedScore {
    #[serde(default)]
    pub grade: Option<u8>,
    #[serde(default, alias = "raw")]
    pub raw_score: Option<f64>,
}

/// One elective of the inquiry section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InquiryScore {
    #[serde(default, alias = "subject")]
    pub subject_name: Option<String>,
    #[serde(default, alias = "std")]
    pub standard_score: Option<f64>,
    #[serde(default)]
    pub percentile: Option<f64>,
    /// Blank or unrecognised labels leave the track to keyword inference.
    #[serde(default, alias = "group", deserialize_with = "optional_track")]
    pub track: Option<InquiryTrack>,
}

fn optional_track<'de, D>(deserializer: D) -> Result<Option<InquiryTrack>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|value| {
        if value.trim().is_empty() {
            return None;
        }
        let track = InquiryTrack::from_label(value);
        if track.is_none() {
            warn!(value, "unknown inquiry track label, inferring from subject name");
        }
        track
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryTrack {
    #[serde(alias = "사탐")]
    Social,
    #[serde(alias = "과탐")]
    Science,
}

impl InquiryTrack {
    pub const fn label(self) -> &'static str {
        match self {
            InquiryTrack::Social => "사탐",
            InquiryTrack::Science => "과탐",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "사탐" | "social" | "Social" => Some(Self::Social),
            "과탐" | "science" | "Science" => Some(Self::Science),
            _ => None,
        }
    }
}

/// The five subject groups of the composite, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Korean,
    Math,
    English,
    Inquiry,
    History,
}

impl Subject {
    pub const fn label(self) -> &'static str {
        match self {
            Subject::Korean => "국어",
            Subject::Math => "수학",
            Subject::English => "영어",
            Subject::Inquiry => "탐구",
            Subject::History => "한국사",
        }
    }

    pub const fn ordered() -> [Subject; 5] {
        [
            Subject::Korean,
            Subject::Math,
            Subject::English,
            Subject::Inquiry,
            Subject::History,
        ]
    }
}

pub const WORST_GRADE: u8 = 9;

const ENGLISH_GRADE_CUTS: [f64; 8] = [90.0, 80.0, 70.0, 60.0, 50.0, 40.0, 30.0, 20.0];
const HISTORY_GRADE_CUTS: [f64; 8] = [40.0, 35.0, 30.0, 25.0, 20.0, 15.0, 10.0, 5.0];

fn grade_from_cuts(raw_score: f64, cuts: &[f64; 8]) -> u8 {
    cuts.iter()
        .position(|cut| raw_score >= *cut)
        .map(|index| index as u8 + 1)
        .unwrap_or(WORST_GRADE)
}

/// Absolute grade for an English raw score (100-point paper).
pub fn english_grade_from_raw(raw_score: f64) -> u8 {
    grade_from_cuts(raw_score, &ENGLISH_GRADE_CUTS)
}

/// Absolute grade for a Korean History raw score (50-point paper).
pub fn history_grade_from_raw(raw_score: f64) -> u8 {
    grade_from_cuts(raw_score, &HISTORY_GRADE_CUTS)
}

impl GradedScore {
    /// Reported grade, else a grade derived from the raw score, else the worst grade.
    /// Grades outside 1..=9 count as the worst grade.
    pub(crate) fn resolve(&self, from_raw: fn(f64) -> u8) -> u8 {
        match (self.grade, self.raw_score) {
            (Some(grade), _) if (1..=WORST_GRADE).contains(&grade) => grade,
            (Some(_), _) => WORST_GRADE,
            (None, Some(raw)) if raw.is_finite() => from_raw(raw),
            (None, _) => WORST_GRADE,
        }
    }
}
