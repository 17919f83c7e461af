use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// A record as entered by staff: a number, or a label such as "P" or "미응시".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Number(f64),
    Text(String),
}

impl Default for RecordValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl RecordValue {
    /// Numeric reading of the record; text that parses as a finite number counts.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RecordValue::Number(value) => Some(*value),
            RecordValue::Text(text) => text.trim().parse::<f64>().ok(),
        }
        .filter(|value| value.is_finite())
    }

    /// Trimmed, upper-cased text used for label matching.
    pub fn normalized(&self) -> String {
        match self {
            RecordValue::Number(value) => value.to_string(),
            RecordValue::Text(text) => text.trim().to_uppercase(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, RecordValue::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Number(value) => write!(f, "{value}"),
            RecordValue::Text(text) => write!(f, "{}", text.trim()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M", alias = "m", alias = "남")]
    Male,
    #[serde(rename = "F", alias = "f", alias = "여")]
    Female,
}

impl Gender {
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "M" | "m" | "남" => Some(Self::Male),
            "F" | "f" | "여" => Some(Self::Female),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

/// Blank strings mean "no gender restriction"; unknown labels are treated the same way.
pub(crate) fn optional_gender<'de, D>(deserializer: D) -> Result<Option<Gender>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|value| {
        if value.trim().is_empty() {
            return None;
        }
        let gender = Gender::from_label(value);
        if gender.is_none() {
            warn!(value, "unknown gender label, treating as unrestricted");
        }
        gender
    }))
}

/// What to award when a record matches no row (`미달처리`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    #[default]
    #[serde(alias = "0점")]
    Zero,
    #[serde(alias = "최하점")]
    Minimum,
}

impl OutOfRangePolicy {
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "0점" | "zero" => Some(Self::Zero),
            "최하점" | "minimum" => Some(Self::Minimum),
            _ => None,
        }
    }
}

/// One row of a university's practical score table (`정시실기배점`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventScoreRow {
    #[serde(alias = "종목명")]
    pub event: String,
    #[serde(default, alias = "성별", deserialize_with = "optional_gender")]
    pub gender: Option<Gender>,
    #[serde(alias = "기록")]
    pub record: RecordValue,
    #[serde(alias = "배점")]
    pub points: f64,
}

impl EventScoreRow {
    pub fn new(
        event: impl Into<String>,
        gender: Option<Gender>,
        record: RecordValue,
        points: f64,
    ) -> Self {
        Self {
            event: event.into(),
            gender,
            record,
            points,
        }
    }

    pub(crate) fn kind(&self) -> RowKind {
        if let Some(threshold) = self.record.as_number() {
            return RowKind::Threshold(threshold);
        }
        let text = self.record.to_string();
        match parse_range(&text) {
            Some((limit, qualifier)) => RowKind::Range { limit, qualifier },
            None => RowKind::Label(text.to_uppercase()),
        }
    }

    fn applies_to(&self, event: &str, gender: Option<Gender>) -> bool {
        if self.event.trim() != event {
            return false;
        }
        match (self.gender, gender) {
            (Some(row), Some(student)) => row == student,
            _ => true,
        }
    }
}

/// A university's full practical table plus its out-of-range policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventScoreTable {
    #[serde(default)]
    pub rows: Vec<EventScoreRow>,
    #[serde(default)]
    pub out_of_range: OutOfRangePolicy,
}

impl EventScoreTable {
    pub fn new(rows: Vec<EventScoreRow>) -> Self {
        Self {
            rows,
            out_of_range: OutOfRangePolicy::default(),
        }
    }

    pub fn with_out_of_range(mut self, policy: OutOfRangePolicy) -> Self {
        self.out_of_range = policy;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for an event, keeping unrestricted rows and rows for the student's gender.
    pub fn rows_for(&self, event: &str, gender: Option<Gender>) -> Vec<&EventScoreRow> {
        let event = event.trim();
        self.rows
            .iter()
            .filter(|row| row.applies_to(event, gender))
            .collect()
    }

    /// Distinct event names in table order.
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = Vec::new();
        for row in &self.rows {
            let name = row.event.trim();
            if !events.iter().any(|event| event == name) {
                events.push(name.to_string());
            }
        }
        events
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    AtLeast,
    AtMost,
    Above,
    Below,
}

impl Qualifier {
    pub fn matches(self, value: f64, limit: f64) -> bool {
        match self {
            Qualifier::AtLeast => value >= limit,
            Qualifier::AtMost => value <= limit,
            Qualifier::Above => value > limit,
            Qualifier::Below => value < limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RowKind {
    Threshold(f64),
    Range { limit: f64, qualifier: Qualifier },
    Label(String),
}

const KOREAN_QUALIFIERS: [(&str, Qualifier); 4] = [
    ("이상", Qualifier::AtLeast),
    ("이하", Qualifier::AtMost),
    ("초과", Qualifier::Above),
    ("미만", Qualifier::Below),
];

// Two-character operators first so ">=" is not read as ">".
const SYMBOL_QUALIFIERS: [(&str, Qualifier); 6] = [
    (">=", Qualifier::AtLeast),
    ("<=", Qualifier::AtMost),
    ("≥", Qualifier::AtLeast),
    ("≤", Qualifier::AtMost),
    (">", Qualifier::Above),
    ("<", Qualifier::Below),
];

/// Parses "200 이상" / "12.5미만" style rows and their symbol forms ("≥ 200", "<12.5").
pub(crate) fn parse_range(text: &str) -> Option<(f64, Qualifier)> {
    let text = text.trim();

    for (symbol, qualifier) in SYMBOL_QUALIFIERS {
        if let Some(rest) = text.strip_prefix(symbol) {
            return rest
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|limit| limit.is_finite())
                .map(|limit| (limit, qualifier));
        }
    }

    for (word, qualifier) in KOREAN_QUALIFIERS {
        if let Some(position) = text.find(word) {
            let before = text[..position].trim_end();
            let start = before
                .char_indices()
                .rev()
                .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
                .last()
                .map(|(index, _)| index)?;
            return before[start..]
                .parse::<f64>()
                .ok()
                .filter(|limit| limit.is_finite())
                .map(|limit| (limit, qualifier));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(event: &str, gender: Option<Gender>, record: &str, points: f64) -> EventScoreRow {
        EventScoreRow::new(event, gender, RecordValue::Text(record.to_string()), points)
    }

    #[test]
    fn classifies_row_kinds() {
        assert_eq!(row("e", None, "12.5", 1.0).kind(), RowKind::Threshold(12.5));
        assert_eq!(
            row("e", None, "200 이상", 1.0).kind(),
            RowKind::Range {
                limit: 200.0,
                qualifier: Qualifier::AtLeast
            }
        );
        assert_eq!(
            row("e", None, "≤ 9.8", 1.0).kind(),
            RowKind::Range {
                limit: 9.8,
                qualifier: Qualifier::AtMost
            }
        );
        assert_eq!(row("e", None, "pass", 1.0).kind(), RowKind::Label("PASS".into()));
    }

    #[test]
    fn parses_korean_and_symbol_ranges() {
        assert_eq!(parse_range("12.5미만"), Some((12.5, Qualifier::Below)));
        assert_eq!(parse_range("기록 30 초과"), Some((30.0, Qualifier::Above)));
        assert_eq!(parse_range(">=250"), Some((250.0, Qualifier::AtLeast)));
        assert_eq!(parse_range("< 7"), Some((7.0, Qualifier::Below)));
        assert_eq!(parse_range("이상"), None);
        assert_eq!(parse_range("P"), None);
    }

    #[test]
    fn filters_rows_by_event_and_gender() {
        let table = EventScoreTable::new(vec![
            row("제자리멀리뛰기", Some(Gender::Male), "280", 100.0),
            row("제자리멀리뛰기", Some(Gender::Female), "230", 100.0),
            row("제자리멀리뛰기", None, "F", 0.0),
            row("윗몸일으키기", None, "60", 100.0),
        ]);

        assert_eq!(table.rows_for("제자리멀리뛰기", Some(Gender::Female)).len(), 2);
        assert_eq!(table.rows_for(" 제자리멀리뛰기 ", None).len(), 3);
        assert!(table.rows_for("메디신볼던지기", None).is_empty());
        assert_eq!(table.events(), vec!["제자리멀리뛰기", "윗몸일으키기"]);
    }

    #[test]
    fn deserializes_source_rows_with_blank_gender() {
        let rows: Vec<EventScoreRow> = serde_json::from_value(serde_json::json!([
            { "종목명": "100m", "성별": "", "기록": 12.0, "배점": 80 },
            { "종목명": "100m", "성별": "M", "기록": "11.0", "배점": 90 },
        ]))
        .expect("rows parse");

        assert_eq!(rows[0].gender, None);
        assert_eq!(rows[0].record, RecordValue::Number(12.0));
        assert_eq!(rows[1].gender, Some(Gender::Male));
        assert_eq!(rows[1].kind(), RowKind::Threshold(11.0));
    }
}
