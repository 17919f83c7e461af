//! Reference data lookups for the calculators.
//!
//! Every lookup asks for an admission year and falls back to the previous year when the
//! requested one has no data, reporting the year actually used.

mod import;
mod memory;

pub use import::parse_event_rows;
pub use memory::{
    CatalogSnapshot, ConversionRow, EventRow, HighestScoreRow, InMemoryCatalog,
};

use serde::{Deserialize, Serialize};

use crate::scoring::{
    EventScoreTable, HighestStandardScoreMap, SubjectConversionTable, UniversityScoreConfig,
};

/// A value resolved for a requested year, tagged with the year it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearScoped<T> {
    pub year: u16,
    pub value: T,
}

impl<T> YearScoped<T> {
    pub fn new(year: u16, value: T) -> Self {
        Self { year, value }
    }

    pub fn fell_back(&self, requested: u16) -> bool {
        self.year != requested
    }
}

/// Tries `year`, then `year - 1`.
pub fn with_fallback<T>(
    year: u16,
    mut fetch: impl FnMut(u16) -> Result<Option<T>, CatalogError>,
) -> Result<Option<YearScoped<T>>, CatalogError> {
    if let Some(value) = fetch(year)? {
        return Ok(Some(YearScoped::new(year, value)));
    }
    match year.checked_sub(1) {
        Some(previous) => Ok(fetch(previous)?.map(|value| YearScoped::new(previous, value))),
        None => Ok(None),
    }
}

/// Display metadata for a university department (`정시기본`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversityProfile {
    #[serde(alias = "U_ID")]
    pub university_id: u32,
    #[serde(alias = "학년도")]
    pub year: u16,
    #[serde(default, alias = "대학명")]
    pub name: String,
    #[serde(default, alias = "학과명")]
    pub department: String,
    #[serde(default, alias = "군")]
    pub group: Option<String>,
    #[serde(default, alias = "지역")]
    pub region: Option<String>,
}

/// Read access to the scoring reference tables.
pub trait ScoringCatalog: Send + Sync {
    fn university(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<Option<YearScoped<UniversityProfile>>, CatalogError>;

    fn score_config(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<Option<YearScoped<UniversityScoreConfig>>, CatalogError>;

    fn highest_scores(
        &self,
        year: u16,
    ) -> Result<Option<YearScoped<HighestStandardScoreMap>>, CatalogError>;

    fn conversion_table(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<Option<YearScoped<SubjectConversionTable>>, CatalogError>;

    fn event_table(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<Option<YearScoped<EventScoreTable>>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid score table csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid row {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
}
