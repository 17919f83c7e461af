use std::io::Read;

use serde::Deserialize;

use super::memory::EventRow;
use super::CatalogError;
use crate::scoring::{Gender, RecordValue};

/// Parses a practical score table export with the columns
/// `U_ID,학년도,종목명,성별,기록,배점`.
pub fn parse_event_rows<R: Read>(reader: R) -> Result<Vec<EventRow>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<CsvEventRow>().enumerate() {
        let line = index as u64 + 2;
        let row = record?;
        rows.push(row.into_event_row(line)?);
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct CsvEventRow {
    #[serde(rename = "U_ID")]
    university_id: String,
    #[serde(rename = "학년도")]
    year: String,
    #[serde(rename = "종목명")]
    event: String,
    #[serde(rename = "성별", default)]
    gender: String,
    #[serde(rename = "기록")]
    record: String,
    #[serde(rename = "배점")]
    points: String,
}

impl CsvEventRow {
    fn into_event_row(self, line: u64) -> Result<EventRow, CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidRow { line, reason };

        let university_id = self
            .university_id
            .parse::<u32>()
            .map_err(|_| invalid(format!("U_ID `{}` is not a number", self.university_id)))?;
        let year = self
            .year
            .parse::<u16>()
            .map_err(|_| invalid(format!("학년도 `{}` is not a year", self.year)))?;
        if self.event.is_empty() {
            return Err(invalid("종목명 is empty".to_string()));
        }
        let gender = if self.gender.is_empty() {
            None
        } else {
            Some(
                Gender::from_label(&self.gender)
                    .ok_or_else(|| invalid(format!("성별 `{}` is not M or F", self.gender)))?,
            )
        };
        let points = self
            .points
            .parse::<f64>()
            .ok()
            .filter(|points| points.is_finite())
            .ok_or_else(|| invalid(format!("배점 `{}` is not a number", self.points)))?;
        let record = match self.record.parse::<f64>() {
            Ok(value) if value.is_finite() => RecordValue::Number(value),
            _ => RecordValue::Text(self.record),
        };

        Ok(EventRow {
            university_id,
            year,
            event: self.event,
            gender,
            record,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
U_ID,학년도,종목명,성별,기록,배점
101,2026,100m달리기,,12.0,80
101,2026,제자리멀리뛰기,M,280,100
101,2026,제자리멀리뛰기,F, 200 이상 ,100
101,2026,제자리멀리뛰기,,F,0
";

    #[test]
    fn parses_rows_with_optional_gender_and_labels() {
        let rows = parse_event_rows(SAMPLE.as_bytes()).expect("csv parses");

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].gender, None);
        assert_eq!(rows[0].record, RecordValue::Number(12.0));
        assert_eq!(rows[1].gender, Some(Gender::Male));
        assert_eq!(rows[2].record, RecordValue::Text("200 이상".into()));
        assert_eq!(rows[3].record, RecordValue::Text("F".into()));
        assert_eq!(rows[3].points, 0.0);
    }

    #[test]
    fn reports_line_of_invalid_points() {
        let csv = "U_ID,학년도,종목명,성별,기록,배점\n101,2026,배근력,,200,백점\n";
        let error = parse_event_rows(csv.as_bytes()).expect_err("points rejected");
        match error {
            CatalogError::InvalidRow { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("배점"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unknown_gender() {
        let csv = "U_ID,학년도,종목명,성별,기록,배점\n101,2026,배근력,X,200,100\n";
        assert!(matches!(
            parse_event_rows(csv.as_bytes()),
            Err(CatalogError::InvalidRow { line: 2, .. })
        ));
    }

    #[test]
    fn missing_columns_surface_as_csv_errors() {
        let csv = "U_ID,학년도,종목명\n101,2026,배근력\n";
        assert!(matches!(
            parse_event_rows(csv.as_bytes()),
            Err(CatalogError::Csv(_))
        ));
    }
}
