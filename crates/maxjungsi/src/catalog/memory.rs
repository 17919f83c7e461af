use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::import::parse_event_rows;
use super::{with_fallback, CatalogError, ScoringCatalog, UniversityProfile, YearScoped};
use crate::scoring::practical::optional_gender;
use crate::scoring::{
    EventScoreRow, EventScoreTable, Gender, HighestStandardScoreMap, InquiryTrack,
    OutOfRangePolicy, RecordValue, SubjectConversionTable, UniversityScoreConfig,
};

/// One highest-standard-score row (`정시최고표점`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighestScoreRow {
    #[serde(alias = "학년도")]
    pub year: u16,
    #[serde(alias = "과목")]
    pub subject: String,
    #[serde(alias = "최고표점")]
    pub score: f64,
}

/// One converted-standard-score row (`정시탐구변환표준`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRow {
    #[serde(alias = "U_ID")]
    pub university_id: u32,
    #[serde(alias = "학년도")]
    pub year: u16,
    #[serde(alias = "계열")]
    pub track: InquiryTrack,
    #[serde(alias = "백분위")]
    pub percentile: u32,
    #[serde(alias = "변환표준점수")]
    pub converted_score: f64,
}

/// One practical score row (`정시실기배점`) keyed by university and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    #[serde(alias = "U_ID")]
    pub university_id: u32,
    #[serde(alias = "학년도")]
    pub year: u16,
    #[serde(alias = "종목명")]
    pub event: String,
    #[serde(default, alias = "성별", deserialize_with = "optional_gender")]
    pub gender: Option<Gender>,
    #[serde(alias = "기록")]
    pub record: RecordValue,
    #[serde(alias = "배점")]
    pub points: f64,
}

impl EventRow {
    pub fn into_score_row(self) -> EventScoreRow {
        EventScoreRow::new(self.event, self.gender, self.record, self.points)
    }
}

/// Serialized form of a catalog, one list per source table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub universities: Vec<UniversityProfile>,
    #[serde(default)]
    pub score_configs: Vec<UniversityScoreConfig>,
    #[serde(default)]
    pub highest_scores: Vec<HighestScoreRow>,
    #[serde(default)]
    pub conversions: Vec<ConversionRow>,
    #[serde(default)]
    pub event_rows: Vec<EventRow>,
}

type Key = (u32, u16);

/// Catalog held entirely in memory, loaded from a JSON snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    universities: BTreeMap<Key, UniversityProfile>,
    configs: BTreeMap<Key, UniversityScoreConfig>,
    highest: BTreeMap<u16, HighestStandardScoreMap>,
    conversions: BTreeMap<Key, SubjectConversionTable>,
    events: BTreeMap<Key, Vec<EventScoreRow>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut catalog = Self::new();
        for profile in snapshot.universities {
            catalog.insert_university(profile);
        }
        for config in snapshot.score_configs {
            catalog.insert_config(config);
        }
        for row in snapshot.highest_scores {
            catalog
                .highest
                .entry(row.year)
                .or_default()
                .insert(row.subject, row.score);
        }
        for row in snapshot.conversions {
            catalog
                .conversions
                .entry((row.university_id, row.year))
                .or_default()
                .insert(row.track, row.percentile, row.converted_score);
        }
        catalog.extend_event_rows(snapshot.event_rows);
        catalog
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let snapshot: CatalogSnapshot = serde_json::from_str(raw)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            configs = catalog.configs.len(),
            score_tables = catalog.events.len(),
            "scoring catalog loaded"
        );
        Ok(catalog)
    }

    pub fn insert_university(&mut self, profile: UniversityProfile) {
        self.universities
            .insert((profile.university_id, profile.year), profile);
    }

    pub fn insert_config(&mut self, config: UniversityScoreConfig) {
        if config.university_id == 0 {
            warn!(year = config.year, "score config without a university id ignored");
            return;
        }
        self.configs
            .insert((config.university_id, config.year), config);
    }

    pub fn insert_highest_scores(&mut self, year: u16, scores: HighestStandardScoreMap) {
        self.highest.insert(year, scores);
    }

    pub fn insert_conversion_table(
        &mut self,
        university_id: u32,
        year: u16,
        table: SubjectConversionTable,
    ) {
        self.conversions.insert((university_id, year), table);
    }

    pub fn extend_event_rows(&mut self, rows: impl IntoIterator<Item = EventRow>) {
        for row in rows {
            self.events
                .entry((row.university_id, row.year))
                .or_default()
                .push(row.into_score_row());
        }
    }

    /// Appends rows from a `U_ID,학년도,종목명,성별,기록,배점` export.
    pub fn import_event_csv<R: Read>(&mut self, reader: R) -> Result<usize, CatalogError> {
        let rows = parse_event_rows(reader)?;
        let imported = rows.len();
        self.extend_event_rows(rows);
        info!(rows = imported, "practical score rows imported");
        Ok(imported)
    }

    fn out_of_range_policy(&self, key: Key) -> OutOfRangePolicy {
        self.configs
            .get(&key)
            .map(|config| config.out_of_range)
            .unwrap_or_default()
    }
}

impl ScoringCatalog for InMemoryCatalog {
    fn university(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<Option<YearScoped<UniversityProfile>>, CatalogError> {
        with_fallback(year, |year| {
            Ok(self.universities.get(&(university_id, year)).cloned())
        })
    }

    fn score_config(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<Option<YearScoped<UniversityScoreConfig>>, CatalogError> {
        with_fallback(year, |year| Ok(self.configs.get(&(university_id, year)).cloned()))
    }

    fn highest_scores(
        &self,
        year: u16,
    ) -> Result<Option<YearScoped<HighestStandardScoreMap>>, CatalogError> {
        with_fallback(year, |year| {
            Ok(self.highest.get(&year).filter(|map| !map.is_empty()).cloned())
        })
    }

    fn conversion_table(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<Option<YearScoped<SubjectConversionTable>>, CatalogError> {
        with_fallback(year, |year| {
            Ok(self
                .conversions
                .get(&(university_id, year))
                .filter(|table| !table.is_empty())
                .cloned())
        })
    }

    fn event_table(
        &self,
        university_id: u32,
        year: u16,
    ) -> Result<Option<YearScoped<EventScoreTable>>, CatalogError> {
        with_fallback(year, |year| {
            let key = (university_id, year);
            Ok(self
                .events
                .get(&key)
                .filter(|rows| !rows.is_empty())
                .map(|rows| {
                    EventScoreTable::new(rows.clone())
                        .with_out_of_range(self.out_of_range_policy(key))
                }))
        })
    }
}
