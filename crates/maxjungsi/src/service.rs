use std::sync::Arc;

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CatalogError, ScoringCatalog, UniversityProfile, YearScoped};
use crate::scoring::academic::{MaxScoreStrategy, ScoringBasis, SubjectWeights};
use crate::scoring::practical::{optional_gender, DEFAULT_PRACTICAL_TOTAL};
use crate::scoring::{
    compute_academic_score, compute_practical_score, round2, CalculationResult, EventScoreRow,
    EventScoreTable, Gender, PracticalCalculationResult, PracticalEventRecord, ScoringError,
    StudentAcademicScore, UniversityScoreConfig,
};

/// Admission year used when a request leaves it out: the next calendar year.
pub fn default_admission_year() -> u16 {
    u16::try_from(Local::now().year() + 1).unwrap_or(u16::MAX)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcademicRequest {
    #[serde(default, alias = "uid", alias = "U_ID")]
    pub university_id: u32,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default, alias = "studentScore")]
    pub student: StudentAcademicScore,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PracticalRequest {
    #[serde(default, alias = "uid", alias = "U_ID")]
    pub university_id: u32,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default, alias = "studentRecords")]
    pub records: Vec<PracticalEventRecord>,
    #[serde(default, deserialize_with = "optional_gender")]
    pub gender: Option<Gender>,
    #[serde(default, alias = "practicalTotal")]
    pub practical_total: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinalScoreRequest {
    #[serde(default, alias = "uid", alias = "U_ID")]
    pub university_id: u32,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default, alias = "studentScore")]
    pub student: StudentAcademicScore,
    #[serde(default, alias = "studentRecords")]
    pub records: Vec<PracticalEventRecord>,
    #[serde(default, deserialize_with = "optional_gender")]
    pub gender: Option<Gender>,
    #[serde(default, alias = "practicalTotal")]
    pub practical_total: Option<f64>,
}

/// The weighting dials echoed back to the counselor next to a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaSummary {
    #[serde(rename = "총점")]
    pub total_score_points: f64,
    #[serde(rename = "수능")]
    pub suneung_percent: f64,
    #[serde(rename = "국어")]
    pub korean: f64,
    #[serde(rename = "수학")]
    pub math: f64,
    #[serde(rename = "영어")]
    pub english: f64,
    #[serde(rename = "탐구")]
    pub inquiry: f64,
    #[serde(rename = "한국사")]
    pub history: f64,
}

impl From<&UniversityScoreConfig> for FormulaSummary {
    fn from(config: &UniversityScoreConfig) -> Self {
        let SubjectWeights {
            korean,
            math,
            english,
            inquiry,
            history,
        } = config.weights;
        Self {
            total_score_points: config.total_score_points,
            suneung_percent: config.suneung_percent,
            korean,
            math,
            english,
            inquiry,
            history,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AcademicResponse {
    pub success: bool,
    pub university: Option<UniversityProfile>,
    #[serde(rename = "actualYear")]
    pub actual_year: u16,
    pub result: CalculationResult,
    pub formula: FormulaSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticalResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub university: Option<UniversityProfile>,
    pub events: Vec<String>,
    #[serde(rename = "actualYear")]
    pub actual_year: Option<u16>,
    pub result: PracticalCalculationResult,
    #[serde(rename = "hasScoreTable")]
    pub has_score_table: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalScoreResponse {
    pub success: bool,
    pub university: Option<UniversityProfile>,
    #[serde(rename = "actualYear")]
    pub actual_year: u16,
    #[serde(rename = "총점")]
    pub total: f64,
    #[serde(rename = "수능")]
    pub academic: CalculationResult,
    #[serde(rename = "실기")]
    pub practical: PracticalCalculationResult,
}

/// Events and rows of a university's practical table, for building the record form.
#[derive(Debug, Clone, Serialize)]
pub struct EventListing {
    pub success: bool,
    pub events: Vec<String>,
    #[serde(rename = "scoreTable")]
    pub score_table: Vec<EventScoreRow>,
    #[serde(rename = "actualYear")]
    pub actual_year: Option<u16>,
    #[serde(rename = "hasScoreTable")]
    pub has_score_table: bool,
}

/// Resolves reference data from the catalog and runs the calculators.
pub struct ScoreService<C> {
    catalog: Arc<C>,
    practical_total: f64,
}

impl<C> ScoreService<C>
where
    C: ScoringCatalog + 'static,
{
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            practical_total: DEFAULT_PRACTICAL_TOTAL,
        }
    }

    /// Target used when a practical request omits `practicalTotal`.
    pub fn with_practical_total(mut self, total: f64) -> Self {
        if total.is_finite() && total > 0.0 {
            self.practical_total = total;
        }
        self
    }

    pub fn academic(&self, request: AcademicRequest) -> Result<AcademicResponse, ServiceError> {
        let university_id = require_university(request.university_id)?;
        let year = request.year.unwrap_or_else(default_admission_year);

        let config = self.require_config(university_id, year)?;
        let result = self.score_academic(&config.value, &request.student, config.year)?;
        let university = self.profile(university_id, year)?;

        Ok(AcademicResponse {
            success: true,
            university,
            actual_year: config.year,
            formula: FormulaSummary::from(&config.value),
            result,
        })
    }

    pub fn practical(&self, request: PracticalRequest) -> Result<PracticalResponse, ServiceError> {
        let university_id = require_university(request.university_id)?;
        let year = request.year.unwrap_or_else(default_admission_year);

        let university = self.profile(university_id, year)?;
        if university.is_none() && self.catalog.score_config(university_id, year)?.is_none() {
            return Err(ServiceError::UnknownUniversity {
                university_id,
                year,
            });
        }

        let table = self.catalog.event_table(university_id, year)?;
        log_fallback("practical table", university_id, year, table.as_ref());
        let target = self.target_total(request.practical_total);
        let (actual_year, table) = match table {
            Some(scoped) => (Some(scoped.year), scoped.value),
            None => (None, EventScoreTable::default()),
        };

        let result = compute_practical_score(&request.records, &table, request.gender, target);
        let has_score_table = result.has_score_table;

        Ok(PracticalResponse {
            success: true,
            message: (!has_score_table).then(|| "no practical score table".to_string()),
            university,
            events: table.events(),
            actual_year,
            result,
            has_score_table,
        })
    }

    /// Academic plus practical composite for one university.
    pub fn final_score(
        &self,
        request: FinalScoreRequest,
    ) -> Result<FinalScoreResponse, ServiceError> {
        let university_id = require_university(request.university_id)?;
        let year = request.year.unwrap_or_else(default_admission_year);

        let config = self.require_config(university_id, year)?;
        let academic = self.score_academic(&config.value, &request.student, config.year)?;

        let table = self
            .catalog
            .event_table(university_id, year)?
            .map(|scoped| scoped.value)
            .unwrap_or_default();
        let practical = compute_practical_score(
            &request.records,
            &table,
            request.gender,
            self.target_total(request.practical_total),
        );

        let total = round2(academic.total + practical.total);
        info!(university_id, year = config.year, total, "final score computed");

        Ok(FinalScoreResponse {
            success: true,
            university: self.profile(university_id, year)?,
            actual_year: config.year,
            total,
            academic,
            practical,
        })
    }

    pub fn events(
        &self,
        university_id: u32,
        year: Option<u16>,
    ) -> Result<EventListing, ServiceError> {
        let university_id = require_university(university_id)?;
        let year = year.unwrap_or_else(default_admission_year);

        let listing = match self.catalog.event_table(university_id, year)? {
            Some(scoped) => EventListing {
                success: true,
                events: scoped.value.events(),
                actual_year: Some(scoped.year),
                has_score_table: !scoped.value.is_empty(),
                score_table: scoped.value.rows,
            },
            None => EventListing {
                success: true,
                events: Vec::new(),
                score_table: Vec::new(),
                actual_year: None,
                has_score_table: false,
            },
        };
        Ok(listing)
    }

    fn require_config(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<YearScoped<UniversityScoreConfig>, ServiceError> {
        let config = self
            .catalog
            .score_config(university_id, year)?
            .ok_or(ServiceError::MissingConfiguration {
                university_id,
                year,
            })?;
        log_fallback("score config", university_id, year, Some(&config));
        Ok(config)
    }

    fn score_academic(
        &self,
        config: &UniversityScoreConfig,
        student: &StudentAcademicScore,
        year: u16,
    ) -> Result<CalculationResult, ServiceError> {
        let highest = if config.korean_math.max_score == Some(MaxScoreStrategy::HighestOfYear) {
            self.catalog.highest_scores(year)?.map(|scoped| scoped.value)
        } else {
            None
        };
        let conversion = if config.inquiry.basis == ScoringBasis::ConvertedStandardScore {
            self.catalog
                .conversion_table(config.university_id, year)?
                .map(|scoped| scoped.value)
        } else {
            None
        };

        debug!(
            university_id = config.university_id,
            year,
            highest = highest.is_some(),
            conversion = conversion.is_some(),
            "running academic calculator"
        );
        let result =
            compute_academic_score(config, student, highest.as_ref(), conversion.as_ref())?;
        Ok(result)
    }

    fn profile(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<Option<UniversityProfile>, ServiceError> {
        Ok(self
            .catalog
            .university(university_id, year)?
            .map(|scoped| scoped.value))
    }

    fn target_total(&self, requested: Option<f64>) -> f64 {
        requested
            .filter(|total| total.is_finite() && *total > 0.0)
            .unwrap_or(self.practical_total)
    }
}

fn require_university(university_id: u32) -> Result<u32, ServiceError> {
    if university_id == 0 {
        Err(ServiceError::MissingUniversityId)
    } else {
        Ok(university_id)
    }
}

fn log_fallback<T>(what: &str, university_id: u32, requested: u16, found: Option<&YearScoped<T>>) {
    if let Some(scoped) = found.filter(|scoped| scoped.fell_back(requested)) {
        info!(
            university_id,
            requested,
            used = scoped.year,
            "{what} missing for requested year, using previous year"
        );
    }
}

/// Error raised by the score service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("uid is required")]
    MissingUniversityId,
    #[error("university {university_id} not found for {year} or the year before")]
    UnknownUniversity { university_id: u32, year: u16 },
    #[error("no score configuration for university {university_id} in {year} or the year before")]
    MissingConfiguration { university_id: u32, year: u16 },
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::scoring::RecordValue;
    use serde_json::json;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::from_json_str(
            &json!({
                "universities": [
                    { "U_ID": 101, "학년도": 2026, "대학명": "한빛대", "학과명": "체육교육과" }
                ],
                "score_configs": [
                    {
                        "U_ID": 101, "학년도": 2026,
                        "국어": 30, "수학": 30, "영어": 20, "탐구": 20, "한국사": 10,
                        "english_scores": { "1": 100, "2": 95 },
                        "history_scores": { "1": 10 }
                    },
                    { "U_ID": 202, "학년도": 2026, "국어": 50, "특수공식": "{kor_score} * 2 +" }
                ],
                "event_rows": [
                    { "U_ID": 101, "학년도": 2025, "종목명": "100m달리기", "성별": "", "기록": 10.0, "배점": 100 },
                    { "U_ID": 101, "학년도": 2025, "종목명": "100m달리기", "성별": "", "기록": 12.0, "배점": 80 }
                ]
            })
            .to_string(),
        )
        .expect("catalog loads")
    }

    fn service() -> ScoreService<InMemoryCatalog> {
        ScoreService::new(Arc::new(catalog()))
    }

    fn student() -> StudentAcademicScore {
        serde_json::from_value(json!({
            "국어": { "std": 130, "percentile": 96 },
            "수학": { "std": 135, "percentile": 90 },
            "영어": { "grade": 2 },
            "탐구": [
                { "subject": "물리학Ⅰ", "std": 63, "percentile": 90 },
                { "subject": "화학Ⅰ", "std": 67, "percentile": 95 }
            ],
            "한국사": { "grade": 1 }
        }))
        .expect("student parses")
    }

    #[test]
    fn academic_resolves_config_and_profile() {
        let response = service()
            .academic(AcademicRequest {
                university_id: 101,
                year: Some(2026),
                student: student(),
            })
            .expect("scores");

        assert_eq!(response.actual_year, 2026);
        assert_eq!(response.result.total, 934.0);
        assert_eq!(response.formula.korean, 30.0);
        assert_eq!(
            response.university.map(|profile| profile.name),
            Some("한빛대".to_string())
        );
    }

    #[test]
    fn missing_configuration_is_reported() {
        let error = service()
            .academic(AcademicRequest {
                university_id: 303,
                year: Some(2026),
                student: student(),
            })
            .expect_err("no config");

        assert!(matches!(
            error,
            ServiceError::MissingConfiguration {
                university_id: 303,
                year: 2026
            }
        ));
    }

    #[test]
    fn zero_university_id_is_rejected() {
        let error = service()
            .practical(PracticalRequest::default())
            .expect_err("uid required");
        assert!(matches!(error, ServiceError::MissingUniversityId));
    }

    #[test]
    fn invalid_override_surfaces_scoring_error() {
        let error = service()
            .academic(AcademicRequest {
                university_id: 202,
                year: Some(2026),
                student: student(),
            })
            .expect_err("formula rejected");
        assert!(matches!(error, ServiceError::Scoring(_)));
    }

    #[test]
    fn practical_uses_previous_year_table() {
        let response = service()
            .practical(PracticalRequest {
                university_id: 101,
                year: Some(2026),
                records: vec![PracticalEventRecord::new(
                    "100m달리기",
                    RecordValue::Number(11.5),
                )],
                gender: None,
                practical_total: Some(200.0),
            })
            .expect("scores");

        assert_eq!(response.actual_year, Some(2025));
        assert_eq!(response.result.total, 160.0);
        assert_eq!(response.events, vec!["100m달리기"]);
        assert!(response.has_score_table);
    }

    #[test]
    fn practical_without_table_reports_no_score_table() {
        let response = service()
            .practical(PracticalRequest {
                university_id: 202,
                year: Some(2026),
                ..PracticalRequest::default()
            })
            .expect("scores");

        assert!(!response.has_score_table);
        assert_eq!(response.result.total, 0.0);
        assert!(response.message.is_some());
    }

    #[test]
    fn practical_for_unknown_university_fails() {
        let error = service()
            .practical(PracticalRequest {
                university_id: 999,
                year: Some(2026),
                ..PracticalRequest::default()
            })
            .expect_err("unknown");
        assert!(matches!(error, ServiceError::UnknownUniversity { .. }));
    }

    #[test]
    fn final_score_sums_both_parts() {
        let response = service()
            .with_practical_total(100.0)
            .final_score(FinalScoreRequest {
                university_id: 101,
                year: Some(2026),
                student: student(),
                records: vec![PracticalEventRecord::new(
                    "100m달리기",
                    RecordValue::Number(10.0),
                )],
                gender: Some(Gender::Male),
                practical_total: None,
            })
            .expect("scores");

        assert_eq!(response.academic.total, 934.0);
        assert_eq!(response.practical.total, 100.0);
        assert_eq!(response.total, 1034.0);
    }

    #[test]
    fn request_accepts_source_field_names() {
        let request: PracticalRequest = serde_json::from_value(json!({
            "uid": 101,
            "year": 2026,
            "studentRecords": [{ "종목명": "100m달리기", "value": "11.5" }],
            "gender": "",
            "practicalTotal": 300
        }))
        .expect("request parses");

        assert_eq!(request.university_id, 101);
        assert_eq!(request.gender, None);
        assert_eq!(request.practical_total, Some(300.0));
        assert_eq!(request.records.len(), 1);
    }

    #[test]
    fn default_year_is_next_calendar_year() {
        let expected = Local::now().year() + 1;
        assert_eq!(i32::from(default_admission_year()), expected);
    }

    #[test]
    fn listing_exposes_rows_and_events() {
        let listing = service().events(101, Some(2026)).expect("lists");
        assert_eq!(listing.actual_year, Some(2025));
        assert_eq!(listing.score_table.len(), 2);
        assert!(listing.has_score_table);
    }
}
