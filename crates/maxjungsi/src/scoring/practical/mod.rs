//! Practical (실기) composite score.
//!
//! Each event record is matched against the university's per-event, per-gender table, and
//! the awarded points are rescaled so that a perfect sheet equals the target total.

mod lookup;
mod table;

pub use lookup::{lookup_points, max_points, min_points, EventLookup, MatchRule};
pub use table::{
    EventScoreRow, EventScoreTable, Gender, OutOfRangePolicy, Qualifier, RecordValue,
};
pub(crate) use table::optional_gender;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::keywords::event_direction;
use super::round2;

/// Target total used when a caller does not supply a usable one.
pub const DEFAULT_PRACTICAL_TOTAL: f64 = 100.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticalEventRecord {
    #[serde(default, alias = "종목명")]
    pub event: String,
    #[serde(default, alias = "value", alias = "기록")]
    pub record: RecordValue,
}

impl PracticalEventRecord {
    pub fn new(event: impl Into<String>, record: RecordValue) -> Self {
        Self {
            event: event.into(),
            record,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticalEventScore {
    pub event: String,
    pub record: RecordValue,
    pub score: f64,
    #[serde(rename = "maxScore")]
    pub max_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticalCalculationResult {
    #[serde(rename = "총점")]
    pub total: f64,
    #[serde(rename = "종목별점수")]
    pub events: Vec<PracticalEventScore>,
    #[serde(rename = "계산로그")]
    pub log: Vec<String>,
    #[serde(rename = "hasScoreTable")]
    pub has_score_table: bool,
}

/// Scores every record and rescales the sum to `target_total`.
///
/// Never fails: unknown events score 0 with a max of 0, and an empty table yields a zero
/// total flagged with `has_score_table = false`.
pub fn compute_practical_score(
    records: &[PracticalEventRecord],
    table: &EventScoreTable,
    gender: Option<Gender>,
    target_total: f64,
) -> PracticalCalculationResult {
    let mut log = Vec::new();

    if table.is_empty() {
        log.push("[실기] no score table, total 0".to_string());
        return PracticalCalculationResult {
            total: 0.0,
            events: Vec::new(),
            log,
            has_score_table: false,
        };
    }

    let target = if target_total.is_finite() && target_total > 0.0 {
        target_total
    } else {
        log.push(format!(
            "[실기] target total {target_total} is not usable, using {DEFAULT_PRACTICAL_TOTAL}"
        ));
        DEFAULT_PRACTICAL_TOTAL
    };
    log.push(format!(
        "[실기] {} records, gender {}, target {}",
        records.len(),
        gender.map(Gender::label).unwrap_or("any"),
        target
    ));

    let mut events = Vec::with_capacity(records.len());
    for record in records {
        let name = record.event.trim();
        if name.is_empty() {
            log.push(format!("[실기] skipped record {} without an event name", record.record));
            continue;
        }

        let rows = table.rows_for(name, gender);
        if rows.is_empty() {
            log.push(format!(
                "[{name}] record {}, not in score table, scored 0",
                record.record
            ));
            events.push(PracticalEventScore {
                event: name.to_string(),
                record: record.record.clone(),
                score: 0.0,
                max_score: 0.0,
            });
            continue;
        }

        let direction = event_direction(name);
        let found = lookup_points(&rows, &record.record, direction, table.out_of_range);
        let max_score = max_points(&rows);
        log.push(format!(
            "[{name}] record {} ({}), {}, points {}/{}",
            record.record,
            direction.label(),
            found.rule,
            found.points,
            max_score
        ));
        events.push(PracticalEventScore {
            event: name.to_string(),
            record: record.record.clone(),
            score: round2(found.points),
            max_score: round2(max_score),
        });
    }

    let awarded: f64 = events.iter().map(|event| event.score).sum();
    let possible: f64 = events.iter().map(|event| event.max_score).sum();
    let total = if possible > 0.0 {
        awarded / possible * target
    } else {
        0.0
    };
    log.push(format!(
        "[합계] {} / {} scaled to {} = {:.2}",
        awarded, possible, target, total
    ));

    debug!(
        events = events.len(),
        total,
        has_score_table = true,
        "practical score computed"
    );

    PracticalCalculationResult {
        total: round2(total),
        events,
        log,
        has_score_table: true,
    }
}
