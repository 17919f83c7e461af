use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::domain::WORST_GRADE;
use crate::scoring::practical::OutOfRangePolicy;

pub const DEFAULT_TOTAL_SCORE_POINTS: f64 = 1000.0;
pub const DEFAULT_SUNEUNG_PERCENT: f64 = 100.0;
pub const DEFAULT_INQUIRY_COUNT: u8 = 2;

/// Which figure of a subject result feeds the ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringBasis {
    #[default]
    Percentile,
    StandardScore,
    ConvertedStandardScore,
}

impl ScoringBasis {
    pub const fn label(self) -> &'static str {
        match self {
            ScoringBasis::Percentile => "percentile",
            ScoringBasis::StandardScore => "standard score",
            ScoringBasis::ConvertedStandardScore => "converted standard score",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "백분위" | "percentile" => Some(Self::Percentile),
            "표준점수" | "standard_score" | "std" => Some(Self::StandardScore),
            "변환표준점수" | "converted_standard_score" | "converted_std" => {
                Some(Self::ConvertedStandardScore)
            }
            _ => None,
        }
    }
}

/// How the Korean/Math denominator is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxScoreStrategy {
    Fixed100,
    Fixed200,
    HighestOfYear,
}

impl MaxScoreStrategy {
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "fixed_100" => Some(Self::Fixed100),
            "fixed_200" => Some(Self::Fixed200),
            "highest_of_year" => Some(Self::HighestOfYear),
            _ => None,
        }
    }
}

/// Weight percentages. Each is an independent dial; they need not total 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectWeights {
    pub korean: f64,
    pub math: f64,
    pub english: f64,
    pub inquiry: f64,
    pub history: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KoreanMathRule {
    pub basis: ScoringBasis,
    pub max_score: Option<MaxScoreStrategy>,
}

impl KoreanMathRule {
    /// Basis actually read for Korean/Math. Conversion tables only exist for inquiry
    /// electives, so a converted basis reads the percentile here.
    pub const fn effective_basis(&self) -> ScoringBasis {
        match self.basis {
            ScoringBasis::StandardScore => ScoringBasis::StandardScore,
            ScoringBasis::Percentile | ScoringBasis::ConvertedStandardScore => {
                ScoringBasis::Percentile
            }
        }
    }

    /// Denominator when no highest-of-year value applies.
    pub fn default_max(&self) -> f64 {
        match self.max_score {
            Some(MaxScoreStrategy::Fixed100) => 100.0,
            Some(MaxScoreStrategy::Fixed200) => 200.0,
            Some(MaxScoreStrategy::HighestOfYear) | None => {
                if self.effective_basis() == ScoringBasis::StandardScore {
                    200.0
                } else {
                    100.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InquiryRule {
    pub basis: ScoringBasis,
    pub count: u8,
}

impl Default for InquiryRule {
    fn default() -> Self {
        Self {
            basis: ScoringBasis::Percentile,
            count: DEFAULT_INQUIRY_COUNT,
        }
    }
}

/// Letter grade (1..=9) to points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeTable(BTreeMap<u8, f64>);

impl GradeTable {
    pub fn new(points: impl IntoIterator<Item = (u8, f64)>) -> Self {
        Self(
            points
                .into_iter()
                .filter(|(grade, points)| {
                    (1..=WORST_GRADE).contains(grade) && points.is_finite()
                })
                .collect(),
        )
    }

    /// Points for a grade; grades missing from the table earn 0.
    pub fn points(&self, grade: u8) -> f64 {
        self.0.get(&grade).copied().unwrap_or(0.0)
    }

    pub fn max_points(&self) -> Option<f64> {
        self.0.values().copied().reduce(f64::max)
    }

    /// Parses the string-keyed form stored by the admin upload, dropping keys that are not
    /// grades 1..=9.
    fn from_labeled(table: &str, labeled: BTreeMap<String, f64>) -> Self {
        let mut points = BTreeMap::new();
        for (key, value) in labeled {
            match key.trim().parse::<u8>() {
                Ok(grade) if (1..=WORST_GRADE).contains(&grade) && value.is_finite() => {
                    points.insert(grade, value);
                }
                _ => warn!(table, key = %key, "dropping grade table entry outside 1..=9"),
            }
        }
        Self(points)
    }
}

/// A university's weighting rule for one admission year, validated and defaulted once.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ScoreConfigRecord")]
pub struct UniversityScoreConfig {
    pub university_id: u32,
    pub year: u16,
    pub total_score_points: f64,
    /// Share of the total allotted to the exam; scales every subject except History.
    pub suneung_percent: f64,
    pub weights: SubjectWeights,
    pub korean_math: KoreanMathRule,
    pub inquiry: InquiryRule,
    pub english_max_score: Option<f64>,
    pub english_scores: GradeTable,
    pub history_scores: GradeTable,
    pub override_formula: Option<String>,
    pub out_of_range: OutOfRangePolicy,
}

impl UniversityScoreConfig {
    /// A config with default totals and the given weights; useful as a builder seed.
    pub fn new(university_id: u32, year: u16, weights: SubjectWeights) -> Self {
        Self {
            university_id,
            year,
            total_score_points: DEFAULT_TOTAL_SCORE_POINTS,
            suneung_percent: DEFAULT_SUNEUNG_PERCENT,
            weights,
            korean_math: KoreanMathRule::default(),
            inquiry: InquiryRule::default(),
            english_max_score: None,
            english_scores: GradeTable::default(),
            history_scores: GradeTable::default(),
            override_formula: None,
            out_of_range: OutOfRangePolicy::default(),
        }
    }
}

/// Loose record shape as exported by the admin tables (`정시반영비율`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreConfigRecord {
    #[serde(default, alias = "U_ID")]
    pub university_id: u32,
    #[serde(default, alias = "학년도")]
    pub year: u16,
    #[serde(default, alias = "총점")]
    pub total_score_points: Option<f64>,
    #[serde(default, alias = "수능")]
    pub suneung_percent: Option<f64>,
    #[serde(default, alias = "국어")]
    pub korean: Option<f64>,
    #[serde(default, alias = "수학")]
    pub math: Option<f64>,
    #[serde(default, alias = "영어")]
    pub english: Option<f64>,
    #[serde(default, alias = "탐구")]
    pub inquiry: Option<f64>,
    #[serde(default, alias = "한국사")]
    pub history: Option<f64>,
    #[serde(default, deserialize_with = "lenient_json")]
    pub score_config: ScoreConfigSection,
    #[serde(default, deserialize_with = "lenient_json")]
    pub english_scores: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "lenient_json")]
    pub history_scores: BTreeMap<String, f64>,
    #[serde(default, alias = "특수공식")]
    pub override_formula: Option<String>,
    #[serde(default, alias = "미달처리")]
    pub out_of_range: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreConfigSection {
    #[serde(default)]
    pub korean_math: Option<BasisSection>,
    #[serde(default)]
    pub inquiry: Option<BasisSection>,
    #[serde(default)]
    pub english: Option<EnglishSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasisSection {
    #[serde(default, rename = "type")]
    pub basis: Option<String>,
    #[serde(default)]
    pub max_score_method: Option<String>,
    #[serde(default)]
    pub count: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnglishSection {
    #[serde(default, rename = "type")]
    pub method: Option<String>,
    #[serde(default)]
    pub max_score: Option<f64>,
}

/// Accepts either an embedded JSON value or a string holding JSON. Unparseable strings and
/// nulls fall back to the default.
fn lenient_json<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(T::default()),
        serde_json::Value::String(raw) if raw.trim().is_empty() => Ok(T::default()),
        serde_json::Value::String(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(error = %err, "ignoring unparseable embedded config json");
            T::default()
        })),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

fn parse_basis(section: Option<&BasisSection>, field: &'static str) -> ScoringBasis {
    let Some(label) = section.and_then(|section| section.basis.as_deref()) else {
        return ScoringBasis::default();
    };
    ScoringBasis::from_label(label).unwrap_or_else(|| {
        warn!(field, label, "unknown scoring basis, using percentile");
        ScoringBasis::default()
    })
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite() && *value > 0.0)
}

fn weight(value: Option<f64>) -> f64 {
    value
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(0.0)
}

impl From<ScoreConfigRecord> for UniversityScoreConfig {
    fn from(record: ScoreConfigRecord) -> Self {
        let section = &record.score_config;

        let korean_math = KoreanMathRule {
            basis: parse_basis(section.korean_math.as_ref(), "korean_math"),
            max_score: section
                .korean_math
                .as_ref()
                .and_then(|section| section.max_score_method.as_deref())
                .filter(|label| !label.trim().is_empty())
                .and_then(|label| {
                    let strategy = MaxScoreStrategy::from_label(label);
                    if strategy.is_none() {
                        warn!(label, "unknown max score method, using basis default");
                    }
                    strategy
                }),
        };

        let inquiry = InquiryRule {
            basis: parse_basis(section.inquiry.as_ref(), "inquiry"),
            count: section
                .inquiry
                .as_ref()
                .and_then(|section| section.count)
                .filter(|count| *count > 0)
                .unwrap_or(DEFAULT_INQUIRY_COUNT),
        };

        let english_max_score = section.english.as_ref().and_then(|english| {
            match english.method.as_deref().map(str::trim) {
                None | Some("fixed_max_score") => positive(english.max_score),
                Some(_) => None,
            }
        });

        let out_of_range = record
            .out_of_range
            .as_deref()
            .and_then(OutOfRangePolicy::from_label)
            .unwrap_or_default();

        Self {
            university_id: record.university_id,
            year: record.year,
            total_score_points: positive(record.total_score_points)
                .unwrap_or(DEFAULT_TOTAL_SCORE_POINTS),
            suneung_percent: record
                .suneung_percent
                .filter(|value| value.is_finite() && *value >= 0.0)
                .unwrap_or(DEFAULT_SUNEUNG_PERCENT),
            weights: SubjectWeights {
                korean: weight(record.korean),
                math: weight(record.math),
                english: weight(record.english),
                inquiry: weight(record.inquiry),
                history: weight(record.history),
            },
            korean_math,
            inquiry,
            english_max_score,
            english_scores: GradeTable::from_labeled("english_scores", record.english_scores),
            history_scores: GradeTable::from_labeled("history_scores", record.history_scores),
            override_formula: record
                .override_formula
                .filter(|formula| !formula.trim().is_empty()),
            out_of_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_total_and_inquiry_count() {
        let config: UniversityScoreConfig = serde_json::from_value(json!({
            "U_ID": 101,
            "학년도": 2026,
            "총점": 0,
            "국어": 30,
            "수학": 30,
        }))
        .expect("config parses");

        assert_eq!(config.total_score_points, 1000.0);
        assert_eq!(config.suneung_percent, 100.0);
        assert_eq!(config.inquiry.count, 2);
        assert_eq!(config.weights.korean, 30.0);
        assert_eq!(config.weights.english, 0.0);
        assert_eq!(config.korean_math.basis, ScoringBasis::Percentile);
        assert!(config.override_formula.is_none());
    }

    #[test]
    fn parses_embedded_json_strings_with_korean_labels() {
        let config: UniversityScoreConfig = serde_json::from_value(json!({
            "U_ID": 7,
            "학년도": 2026,
            "score_config": "{\"korean_math\":{\"type\":\"표준점수\",\"max_score_method\":\"highest_of_year\"},\"inquiry\":{\"type\":\"변환표준점수\",\"count\":1},\"english\":{\"type\":\"fixed_max_score\",\"max_score\":200}}",
            "english_scores": "{\"1\":200,\"2\":196,\"3\":190}",
            "history_scores": { "1": 10, "2": 10, "3": 9.5 },
            "미달처리": "최하점",
        }))
        .expect("config parses");

        assert_eq!(config.korean_math.basis, ScoringBasis::StandardScore);
        assert_eq!(
            config.korean_math.max_score,
            Some(MaxScoreStrategy::HighestOfYear)
        );
        assert_eq!(config.inquiry.basis, ScoringBasis::ConvertedStandardScore);
        assert_eq!(config.inquiry.count, 1);
        assert_eq!(config.english_max_score, Some(200.0));
        assert_eq!(config.english_scores.points(2), 196.0);
        assert_eq!(config.history_scores.points(3), 9.5);
        assert_eq!(config.out_of_range, OutOfRangePolicy::Minimum);
    }

    #[test]
    fn drops_out_of_range_grades_and_bad_blobs() {
        let config: UniversityScoreConfig = serde_json::from_value(json!({
            "U_ID": 7,
            "학년도": 2026,
            "score_config": "not json",
            "english_scores": { "0": 50, "1": 100, "10": 1, "x": 3 },
        }))
        .expect("config parses");

        assert_eq!(config.english_scores.points(1), 100.0);
        assert_eq!(config.english_scores.points(0), 0.0);
        assert_eq!(config.english_scores.max_points(), Some(100.0));
        assert_eq!(config.korean_math, KoreanMathRule::default());
    }

    #[test]
    fn korean_math_default_max_follows_basis() {
        let percentile = KoreanMathRule::default();
        assert_eq!(percentile.default_max(), 100.0);

        let standard = KoreanMathRule {
            basis: ScoringBasis::StandardScore,
            max_score: None,
        };
        assert_eq!(standard.default_max(), 200.0);

        let fixed = KoreanMathRule {
            basis: ScoringBasis::StandardScore,
            max_score: Some(MaxScoreStrategy::Fixed100),
        };
        assert_eq!(fixed.default_max(), 100.0);
    }
}
