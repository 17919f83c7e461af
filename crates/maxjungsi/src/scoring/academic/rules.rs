use super::config::{MaxScoreStrategy, ScoringBasis, UniversityScoreConfig};
use super::domain::{
    english_grade_from_raw, history_grade_from_raw, SectionScore, StudentAcademicScore, Subject,
};
use super::inquiry::{finite_or_zero, select_inquiry, InquirySelection};
use super::reference::{HighestStandardScoreMap, SubjectConversionTable};
use super::SubjectContribution;
use crate::scoring::formula::FormulaContext;

/// Denominators resolved for the ratio subjects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SubjectMaxima {
    pub korean: f64,
    pub math: f64,
    pub english: f64,
    pub inquiry: f64,
}

/// Everything computed before totals, kept around for the override context.
pub(crate) struct SubjectBreakdown {
    pub maxima: SubjectMaxima,
    pub components: Vec<SubjectContribution>,
    pub inquiry: InquirySelection,
}

impl SubjectBreakdown {
    pub fn score(&self, subject: Subject) -> f64 {
        self.components
            .iter()
            .find(|component| component.subject == subject)
            .map(|component| component.score)
            .unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.components.iter().map(|component| component.score).sum()
    }

    /// Placeholder values for override formulas.
    pub fn formula_context(&self, config: &UniversityScoreConfig) -> FormulaContext {
        let mut context = FormulaContext::new();
        let raw = |subject: Subject| {
            self.components
                .iter()
                .find(|component| component.subject == subject)
                .map(|component| component.basis_value)
                .unwrap_or(0.0)
        };

        context.insert("total".into(), config.total_score_points);
        context.insert("suneung_ratio".into(), config.suneung_percent / 100.0);

        context.insert("kor_raw".into(), raw(Subject::Korean));
        context.insert("math_raw".into(), raw(Subject::Math));
        context.insert("eng_raw".into(), raw(Subject::English));
        context.insert("inq_raw".into(), raw(Subject::Inquiry));
        context.insert("hist_raw".into(), raw(Subject::History));

        context.insert("kor_max".into(), self.maxima.korean);
        context.insert("math_max".into(), self.maxima.math);
        context.insert("eng_max".into(), self.maxima.english);
        context.insert("inq_max".into(), self.maxima.inquiry);

        context.insert("kor_ratio".into(), config.weights.korean / 100.0);
        context.insert("math_ratio".into(), config.weights.math / 100.0);
        context.insert("eng_ratio".into(), config.weights.english / 100.0);
        context.insert("inq_ratio".into(), config.weights.inquiry / 100.0);
        context.insert("hist_ratio".into(), config.weights.history / 100.0);

        context.insert("kor_score".into(), self.score(Subject::Korean));
        context.insert("math_score".into(), self.score(Subject::Math));
        context.insert("eng_score".into(), self.score(Subject::English));
        context.insert("inq_score".into(), self.score(Subject::Inquiry));
        context.insert("hist_score".into(), self.score(Subject::History));

        context
    }
}

pub(crate) fn resolve_maxima(
    config: &UniversityScoreConfig,
    student: &StudentAcademicScore,
    highest: Option<&HighestStandardScoreMap>,
    conversion: Option<&SubjectConversionTable>,
    log: &mut Vec<String>,
) -> SubjectMaxima {
    let rule = &config.korean_math;
    let default_max = rule.default_max();

    let section_max = |section: &SectionScore, fallback_name: &str, log: &mut Vec<String>| {
        if rule.max_score != Some(MaxScoreStrategy::HighestOfYear) {
            return default_max;
        }
        let name = section.subject_name.as_deref().unwrap_or(fallback_name);
        match highest.and_then(|map| map.get(name)) {
            Some(max) => max,
            None => {
                log.push(format!(
                    "[최고표점] no highest score for {name}, using {default_max}"
                ));
                default_max
            }
        }
    };

    let korean = section_max(&student.korean, Subject::Korean.label(), log);
    let math = section_max(&student.math, Subject::Math.label(), log);

    let english = config
        .english_max_score
        .or_else(|| config.english_scores.max_points())
        .unwrap_or(100.0);

    let inquiry = match (config.inquiry.basis, conversion) {
        (ScoringBasis::ConvertedStandardScore, Some(table)) => table.max_score().unwrap_or(100.0),
        _ => 100.0,
    };

    SubjectMaxima {
        korean,
        math,
        english,
        inquiry,
    }
}

/// `basis / max * scale`, or 0 when the denominator is unusable.
fn ratio_score(basis: f64, max: f64, scale: f64) -> f64 {
    if max > 0.0 && max.is_finite() {
        basis / max * scale
    } else {
        0.0
    }
}

fn section_basis(section: &SectionScore, basis: ScoringBasis) -> f64 {
    if basis == ScoringBasis::StandardScore {
        finite_or_zero(section.standard_score)
    } else {
        finite_or_zero(section.percentile)
    }
}

pub(crate) fn score_subjects(
    config: &UniversityScoreConfig,
    student: &StudentAcademicScore,
    highest: Option<&HighestStandardScoreMap>,
    conversion: Option<&SubjectConversionTable>,
    log: &mut Vec<String>,
) -> SubjectBreakdown {
    let maxima = resolve_maxima(config, student, highest, conversion, log);
    log.push(format!(
        "[최대점수] korean {}, math {}, english {}, inquiry {}",
        maxima.korean, maxima.math, maxima.english, maxima.inquiry
    ));

    let exam_scale = config.total_score_points * config.suneung_percent / 100.0;
    let weights = &config.weights;
    let km_basis = config.korean_math.effective_basis();
    let mut components = Vec::with_capacity(5);

    for (subject, section, max, weight) in [
        (Subject::Korean, &student.korean, maxima.korean, weights.korean),
        (Subject::Math, &student.math, maxima.math, weights.math),
    ] {
        let basis_value = section_basis(section, km_basis);
        let score = ratio_score(basis_value, max, exam_scale * weight / 100.0);
        log.push(format!(
            "[{}] {} {}, weight {}%, contribution {:.2}",
            subject.label(),
            km_basis.label(),
            basis_value,
            weight,
            score
        ));
        components.push(SubjectContribution {
            subject,
            basis_value,
            max_value: Some(max),
            weight_percent: weight,
            score,
        });
    }

    let english_grade = student.english.resolve(english_grade_from_raw);
    let english_points = config.english_scores.points(english_grade);
    let english_score = ratio_score(
        english_points,
        maxima.english,
        exam_scale * weights.english / 100.0,
    );
    log.push(format!(
        "[{}] grade {}, points {}, weight {}%, contribution {:.2}",
        Subject::English.label(),
        english_grade,
        english_points,
        weights.english,
        english_score
    ));
    components.push(SubjectContribution {
        subject: Subject::English,
        basis_value: english_points,
        max_value: Some(maxima.english),
        weight_percent: weights.english,
        score: english_score,
    });

    let inquiry = select_inquiry(&student.inquiry, &config.inquiry, conversion);
    let inquiry_score = ratio_score(
        inquiry.representative,
        maxima.inquiry,
        exam_scale * weights.inquiry / 100.0,
    );
    let picked = inquiry
        .picked
        .iter()
        .map(|picked| format!("{}({}) {}", picked.subject, picked.track.label(), picked.value))
        .collect::<Vec<_>>()
        .join(", ");
    log.push(format!(
        "[{}] {} {:.2} from top {} of {} [{}], weight {}%, contribution {:.2}",
        Subject::Inquiry.label(),
        config.inquiry.basis.label(),
        inquiry.representative,
        inquiry.picked.len(),
        inquiry.submitted,
        picked,
        weights.inquiry,
        inquiry_score
    ));
    components.push(SubjectContribution {
        subject: Subject::Inquiry,
        basis_value: inquiry.representative,
        max_value: Some(maxima.inquiry),
        weight_percent: weights.inquiry,
        score: inquiry_score,
    });

    // History is added as points x weight, with no max normalization and no exam share.
    let history_grade = student.history.resolve(history_grade_from_raw);
    let history_points = config.history_scores.points(history_grade);
    let history_score = history_points * weights.history / 100.0;
    log.push(format!(
        "[{}] grade {}, points {}, weight {}%, contribution {:.2}",
        Subject::History.label(),
        history_grade,
        history_points,
        weights.history,
        history_score
    ));
    components.push(SubjectContribution {
        subject: Subject::History,
        basis_value: history_points,
        max_value: None,
        weight_percent: weights.history,
        score: history_score,
    });

    SubjectBreakdown {
        maxima,
        components,
        inquiry,
    }
}
