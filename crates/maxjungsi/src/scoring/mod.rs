//! Pure, synchronous score computation.
//!
//! Nothing in this module performs I/O or keeps state between calls, so identical inputs
//! always produce identical results, log text included.

pub mod academic;
pub mod formula;
pub mod keywords;
pub mod practical;

pub use academic::{
    compute_academic_score, AcademicLookups, AcademicScoreEngine, CalculationResult,
    HighestStandardScoreMap, InquiryTrack, StudentAcademicScore, Subject, SubjectContribution,
    SubjectConversionTable, UniversityScoreConfig,
};
pub use formula::FormulaError;
pub use practical::{
    compute_practical_score, EventScoreRow, EventScoreTable, Gender, OutOfRangePolicy,
    PracticalCalculationResult, PracticalEventRecord, PracticalEventScore, RecordValue,
};

/// Failures that abort a calculation. Everything else degrades to a logged default.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid override formula: {0}")]
    InvalidFormula(#[from] FormulaError),
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
