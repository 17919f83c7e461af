use crate::infra::{parse_gender, read_json};
use clap::Args;
use maxjungsi::catalog::{parse_event_rows, ConversionRow};
use maxjungsi::error::AppError;
use maxjungsi::scoring::practical::DEFAULT_PRACTICAL_TOTAL;
use maxjungsi::scoring::{
    compute_practical_score, AcademicLookups, AcademicScoreEngine, CalculationResult,
    EventScoreRow, EventScoreTable, Gender, HighestStandardScoreMap, OutOfRangePolicy,
    PracticalCalculationResult, PracticalEventRecord, StudentAcademicScore,
    SubjectConversionTable, UniversityScoreConfig,
};
use maxjungsi::service::ServiceError;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct AcademicArgs {
    /// University score config as exported from the admin table (JSON object)
    #[arg(long)]
    pub(crate) config: PathBuf,
    /// Student exam scores (JSON object)
    #[arg(long)]
    pub(crate) student: PathBuf,
    /// Highest standardized scores of the year, keyed by subject name (JSON object)
    #[arg(long)]
    pub(crate) highest: Option<PathBuf>,
    /// Converted standard score rows for inquiry electives (JSON array)
    #[arg(long)]
    pub(crate) conversion: Option<PathBuf>,
    /// Print the full result as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct PracticalArgs {
    /// Practical score table, either a CSV export or a JSON array of rows
    #[arg(long)]
    pub(crate) table: PathBuf,
    /// Student records (JSON array of {종목명, 기록})
    #[arg(long)]
    pub(crate) records: PathBuf,
    /// Student gender (M or F)
    #[arg(long, value_parser = parse_gender)]
    pub(crate) gender: Option<Gender>,
    /// Only keep CSV rows for this university id
    #[arg(long)]
    pub(crate) uid: Option<u32>,
    /// Only keep CSV rows for this admission year
    #[arg(long)]
    pub(crate) year: Option<u16>,
    /// Total the practical score is rescaled to
    #[arg(long, default_value_t = DEFAULT_PRACTICAL_TOTAL)]
    pub(crate) total: f64,
    /// Score out-of-range records at the table minimum instead of 0
    #[arg(long)]
    pub(crate) minimum: bool,
    /// Print the full result as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_academic(args: AcademicArgs) -> Result<(), AppError> {
    let config: UniversityScoreConfig = read_json(&args.config)?;
    let student: StudentAcademicScore = read_json(&args.student)?;
    let highest = args
        .highest
        .as_deref()
        .map(read_json::<HighestStandardScoreMap>)
        .transpose()?;
    let conversion = args
        .conversion
        .as_deref()
        .map(load_conversion_table)
        .transpose()?;

    let engine = AcademicScoreEngine::new(config);
    let lookups = AcademicLookups {
        highest: highest.as_ref(),
        conversion: conversion.as_ref(),
    };
    let result = engine.score(&student, lookups).map_err(ServiceError::from)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render_academic(engine.config(), &result);
    }
    Ok(())
}

pub(crate) fn run_practical(args: PracticalArgs) -> Result<(), AppError> {
    let rows = load_event_table(&args.table, args.uid, args.year)?;
    let policy = if args.minimum {
        OutOfRangePolicy::Minimum
    } else {
        OutOfRangePolicy::Zero
    };
    let table = EventScoreTable::new(rows).with_out_of_range(policy);
    let records: Vec<PracticalEventRecord> = read_json(&args.records)?;

    let result = compute_practical_score(&records, &table, args.gender, args.total);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render_practical(&table, &result);
    }
    Ok(())
}

fn load_conversion_table(path: &Path) -> Result<SubjectConversionTable, AppError> {
    let rows: Vec<ConversionRow> = read_json(path)?;
    let mut table = SubjectConversionTable::new();
    for row in rows {
        table.insert(row.track, row.percentile, row.converted_score);
    }
    Ok(table)
}

fn load_event_table(
    path: &Path,
    university_id: Option<u32>,
    year: Option<u16>,
) -> Result<Vec<EventScoreRow>, AppError> {
    let is_csv = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return read_json(path);
    }

    let rows = parse_event_rows(File::open(path)?)?;
    Ok(rows
        .into_iter()
        .filter(|row| university_id.map_or(true, |id| row.university_id == id))
        .filter(|row| year.map_or(true, |year| row.year == year))
        .map(|row| row.into_score_row())
        .collect())
}

fn render_academic(config: &UniversityScoreConfig, result: &CalculationResult) {
    println!(
        "Academic score, university {} ({})",
        config.university_id, config.year
    );
    for line in &result.log {
        println!("  {line}");
    }
    println!("\nSubject scores");
    println!("- 국어 {:.2}", result.korean);
    println!("- 수학 {:.2}", result.math);
    println!("- 영어 {:.2}", result.english);
    println!("- 탐구 {:.2}", result.inquiry);
    println!("- 한국사 {:.2}", result.history);
    if result.override_applied {
        println!("\nOverride formula applied");
    }
    println!(
        "\n수능 {:.2} | 총점 {:.2} / {}",
        result.suneung_score, result.total, config.total_score_points
    );
}

fn render_practical(table: &EventScoreTable, result: &PracticalCalculationResult) {
    if !result.has_score_table {
        println!("No practical score rows matched; total 0");
        return;
    }

    println!("Practical score ({} events in table)", table.events().len());
    for line in &result.log {
        println!("  {line}");
    }
    println!("\nEvent scores");
    for event in &result.events {
        println!(
            "- {}: {} -> {}/{}",
            event.event, event.record, event.score, event.max_score
        );
    }
    println!("\n총점 {:.2}", result.total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "maxjungsi-api-{}-{}",
            std::process::id(),
            name
        ));
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        path
    }

    #[test]
    fn csv_tables_are_filtered_by_university_and_year() {
        let path = write_temp(
            "table.csv",
            "U_ID,학년도,종목명,성별,기록,배점\n1,2026,윗몸일으키기,,60,100\n2,2026,윗몸일으키기,,50,100\n1,2025,윗몸일으키기,,55,100\n",
        );

        let rows = load_event_table(&path, Some(1), Some(2026)).expect("loads");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].points, 100.0);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn json_tables_are_read_as_rows() {
        let path = write_temp(
            "table.json",
            r#"[{ "종목명": "좌전굴", "성별": "F", "기록": 20, "배점": 100 }]"#,
        );

        let rows = load_event_table(&path, None, None).expect("loads");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].gender, Some(Gender::Female));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn conversion_rows_build_a_table() {
        let path = write_temp(
            "conversion.json",
            r#"[{ "U_ID": 3, "학년도": 2026, "계열": "과탐", "백분위": 90, "변환표준점수": 66.5 }]"#,
        );

        let table = load_conversion_table(&path).expect("loads");

        assert_eq!(
            table.lookup(maxjungsi::scoring::InquiryTrack::Science, 90.0),
            Some(66.5)
        );
        let _ = std::fs::remove_file(path);
    }
}
