//! Academic (수능) composite score.
//!
//! Each subject contributes `basis / max * total * exam share * weight`, except History,
//! which is added as `points * weight` with no normalization. Inquiry averages the best N
//! electives. An optional override formula may replace the summed total.

mod config;
mod domain;
mod inquiry;
mod reference;
mod rules;

pub use config::{
    GradeTable, InquiryRule, KoreanMathRule, MaxScoreStrategy, ScoreConfigRecord, ScoringBasis,
    SubjectWeights, UniversityScoreConfig, DEFAULT_INQUIRY_COUNT, DEFAULT_SUNEUNG_PERCENT,
    DEFAULT_TOTAL_SCORE_POINTS,
};
pub use domain::{
    english_grade_from_raw, history_grade_from_raw, GradedScore, InquiryScore, InquiryTrack,
    SectionScore, StudentAcademicScore, Subject,
};
pub use inquiry::{select_inquiry, InquirySelection, PickedElective};
pub use reference::{HighestStandardScoreMap, SubjectConversionTable};

use serde::Serialize;
use tracing::debug;

use super::{formula, round2, ScoringError};

/// Optional reference data resolved by the caller for one calculation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcademicLookups<'a> {
    pub highest: Option<&'a HighestStandardScoreMap>,
    pub conversion: Option<&'a SubjectConversionTable>,
}

/// Stateless calculator bound to one university's configuration.
pub struct AcademicScoreEngine {
    config: UniversityScoreConfig,
}

impl AcademicScoreEngine {
    pub fn new(config: UniversityScoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UniversityScoreConfig {
        &self.config
    }

    pub fn score(
        &self,
        student: &StudentAcademicScore,
        lookups: AcademicLookups<'_>,
    ) -> Result<CalculationResult, ScoringError> {
        compute_academic_score(&self.config, student, lookups.highest, lookups.conversion)
    }
}

/// One subject's share of the composite, kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectContribution {
    pub subject: Subject,
    pub basis_value: f64,
    /// `None` for History, which is never normalized.
    pub max_value: Option<f64>,
    pub weight_percent: f64,
    pub score: f64,
}

/// Academic calculation output. Serialized keys match the counseling front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    #[serde(rename = "총점")]
    pub total: f64,
    #[serde(rename = "수능점수")]
    pub suneung_score: f64,
    #[serde(rename = "국어점수")]
    pub korean: f64,
    #[serde(rename = "수학점수")]
    pub math: f64,
    #[serde(rename = "영어점수")]
    pub english: f64,
    #[serde(rename = "탐구점수")]
    pub inquiry: f64,
    #[serde(rename = "한국사점수")]
    pub history: f64,
    #[serde(rename = "과목별")]
    pub components: Vec<SubjectContribution>,
    #[serde(rename = "탐구반영")]
    pub inquiry_selection: InquirySelection,
    #[serde(rename = "특수공식적용")]
    pub override_applied: bool,
    #[serde(rename = "계산로그")]
    pub log: Vec<String>,
}

impl CalculationResult {
    pub fn contribution(&self, subject: Subject) -> Option<&SubjectContribution> {
        self.components
            .iter()
            .find(|component| component.subject == subject)
    }
}

/// Computes the academic composite for one student against one university.
///
/// Missing numeric fields count as 0 and missing grades as 9. The only failure is a
/// structurally invalid override formula, which aborts the calculation.
pub fn compute_academic_score(
    config: &UniversityScoreConfig,
    student: &StudentAcademicScore,
    highest: Option<&HighestStandardScoreMap>,
    conversion: Option<&SubjectConversionTable>,
) -> Result<CalculationResult, ScoringError> {
    let mut log = Vec::new();
    log.push(format!(
        "[기본정보] university {} ({}), total {}, exam share {}%",
        config.university_id, config.year, config.total_score_points, config.suneung_percent
    ));

    let breakdown = rules::score_subjects(config, student, highest, conversion, &mut log);
    let mut suneung_score = breakdown.sum();
    let mut override_applied = false;

    if let Some(expression) = config.override_formula.as_deref() {
        let context = breakdown.formula_context(config);
        let evaluation = formula::evaluate(expression, &context)?;
        log.extend(
            evaluation
                .notes
                .iter()
                .map(|note| format!("[특수공식] {note}")),
        );
        log.push(format!(
            "[특수공식] {} => {:.2} (standard sum {:.2})",
            evaluation.substituted, evaluation.value, suneung_score
        ));
        suneung_score = evaluation.value;
        override_applied = true;
    }

    let total = suneung_score;
    log.push(format!(
        "[최종] exam score {:.2}, total {:.2}",
        suneung_score, total
    ));

    debug!(
        university_id = config.university_id,
        year = config.year,
        total,
        override_applied,
        "academic score computed"
    );

    let components: Vec<SubjectContribution> = breakdown
        .components
        .into_iter()
        .map(|component| SubjectContribution {
            basis_value: round2(component.basis_value),
            max_value: component.max_value.map(round2),
            weight_percent: component.weight_percent,
            score: round2(component.score),
            subject: component.subject,
        })
        .collect();
    let score_of = |subject: Subject| {
        components
            .iter()
            .find(|component| component.subject == subject)
            .map(|component| component.score)
            .unwrap_or(0.0)
    };

    Ok(CalculationResult {
        total: round2(total),
        suneung_score: round2(suneung_score),
        korean: score_of(Subject::Korean),
        math: score_of(Subject::Math),
        english: score_of(Subject::English),
        inquiry: score_of(Subject::Inquiry),
        history: score_of(Subject::History),
        inquiry_selection: breakdown.inquiry,
        override_applied,
        log,
        components,
    })
}
