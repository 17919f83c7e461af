//! End-to-end scenarios for the two calculators, driven only through the public API with
//! payloads shaped like the admin tables and the counseling front end.

use maxjungsi::scoring::academic::{MaxScoreStrategy, ScoringBasis};
use maxjungsi::scoring::{
    compute_academic_score, compute_practical_score, EventScoreRow, EventScoreTable, Gender,
    HighestStandardScoreMap, OutOfRangePolicy, PracticalEventRecord, RecordValue, ScoringError,
    StudentAcademicScore, SubjectConversionTable, UniversityScoreConfig,
};
use serde_json::json;

fn config_from_admin_row() -> UniversityScoreConfig {
    serde_json::from_value(json!({
        "U_ID": 3104,
        "학년도": 2026,
        "총점": 1000,
        "수능": 100,
        "국어": 25,
        "수학": 25,
        "영어": 25,
        "탐구": 25,
        "한국사": 100,
        "score_config": "{\"korean_math\":{\"type\":\"표준점수\",\"max_score_method\":\"highest_of_year\"},\"inquiry\":{\"type\":\"변환표준점수\",\"count\":2}}",
        "english_scores": "{\"1\":100,\"2\":98,\"3\":94}",
        "history_scores": "{\"1\":0,\"2\":0,\"3\":0}"
    }))
    .expect("admin row parses")
}

fn student() -> StudentAcademicScore {
    serde_json::from_value(json!({
        "국어": { "std": 131, "percentile": 95, "subject": "화법과작문" },
        "수학": { "std": 140, "percentile": 97, "subject": "미적분" },
        "영어": { "grade": 1 },
        "탐구": [
            { "subject": "생활과윤리", "std": 68, "percentile": 97 },
            { "subject": "사회문화", "std": 66, "percentile": 94 }
        ],
        "한국사": { "grade": 4 }
    }))
    .expect("student parses")
}

fn lookups() -> (HighestStandardScoreMap, SubjectConversionTable) {
    let highest: HighestStandardScoreMap = [("화법과작문", 131.0), ("미적분", 140.0)]
        .into_iter()
        .collect();
    let mut conversion = SubjectConversionTable::new();
    conversion.insert(maxjungsi::scoring::InquiryTrack::Social, 100, 70.0);
    conversion.insert(maxjungsi::scoring::InquiryTrack::Social, 97, 67.0);
    conversion.insert(maxjungsi::scoring::InquiryTrack::Social, 94, 63.0);
    (highest, conversion)
}

#[test]
fn admin_row_is_parsed_into_typed_rules() {
    let config = config_from_admin_row();

    assert_eq!(config.korean_math.basis, ScoringBasis::StandardScore);
    assert_eq!(
        config.korean_math.max_score,
        Some(MaxScoreStrategy::HighestOfYear)
    );
    assert_eq!(config.inquiry.basis, ScoringBasis::ConvertedStandardScore);
    assert_eq!(config.history_scores.points(4), 0.0);
}

#[test]
fn top_scorer_earns_full_marks_with_converted_inquiry() {
    let config = config_from_admin_row();
    let (highest, conversion) = lookups();

    let result = compute_academic_score(&config, &student(), Some(&highest), Some(&conversion))
        .expect("computes");

    assert_eq!(result.korean, 250.0);
    assert_eq!(result.math, 250.0);
    assert_eq!(result.english, 250.0);
    assert_eq!(result.inquiry, 232.14);
    assert_eq!(result.history, 0.0);
    assert_eq!(result.total, 982.14);
}

#[test]
fn serialized_result_keeps_front_end_keys() {
    let config = config_from_admin_row();
    let (highest, conversion) = lookups();
    let result = compute_academic_score(&config, &student(), Some(&highest), Some(&conversion))
        .expect("computes");

    let value = serde_json::to_value(&result).expect("serializes");
    for key in [
        "총점",
        "수능점수",
        "국어점수",
        "수학점수",
        "영어점수",
        "탐구점수",
        "한국사점수",
        "계산로그",
    ] {
        assert!(value.get(key).is_some(), "missing key {key}");
    }
}

#[test]
fn override_with_letters_is_rejected_before_evaluation() {
    let mut config = config_from_admin_row();
    config.override_formula = Some("{kor_score} + Math.max(1, 2)".to_string());

    let error = compute_academic_score(&config, &student(), None, None).expect_err("rejected");

    assert!(matches!(error, ScoringError::InvalidFormula(_)));
}

#[test]
fn override_can_reference_raw_values_and_ratios() {
    let mut config = config_from_admin_row();
    config.override_formula =
        Some("({kor_raw} + {math_raw}) * {kor_ratio} * 2 + {unknown}".to_string());
    let (highest, conversion) = lookups();

    let result = compute_academic_score(&config, &student(), Some(&highest), Some(&conversion))
        .expect("computes");

    assert_eq!(result.total, 135.5);
    assert!(result.override_applied);
    assert!(result
        .log
        .iter()
        .any(|line| line.contains("placeholder unknown has no value")));
}

fn practical_table() -> EventScoreTable {
    let rows: Vec<EventScoreRow> = serde_json::from_value(json!([
        { "종목명": "10m왕복달리기", "성별": "M", "기록": "9.0", "배점": 100 },
        { "종목명": "10m왕복달리기", "성별": "M", "기록": "9.5", "배점": 95 },
        { "종목명": "10m왕복달리기", "성별": "M", "기록": "10.0", "배점": 90 },
        { "종목명": "10m왕복달리기", "성별": "F", "기록": "10.0", "배점": 100 },
        { "종목명": "10m왕복달리기", "성별": "F", "기록": "11.0", "배점": 90 },
        { "종목명": "메디신볼던지기", "성별": "", "기록": "12 이상", "배점": 100 },
        { "종목명": "메디신볼던지기", "성별": "", "기록": "10", "배점": 90 },
        { "종목명": "메디신볼던지기", "성별": "", "기록": "8", "배점": 80 },
        { "종목명": "메디신볼던지기", "성별": "", "기록": "P", "배점": 0 }
    ]))
    .expect("rows parse");
    EventScoreTable::new(rows)
}

#[test]
fn gender_specific_rows_are_applied() {
    let records = vec![PracticalEventRecord::new(
        "10m왕복달리기",
        RecordValue::Text("10.4".into()),
    )];

    let male = compute_practical_score(&records, &practical_table(), Some(Gender::Male), 100.0);
    let female = compute_practical_score(&records, &practical_table(), Some(Gender::Female), 100.0);

    assert_eq!(male.events[0].score, 90.0);
    assert_eq!(female.events[0].score, 90.0);
    assert_eq!(female.events[0].max_score, 100.0);
}

#[test]
fn throwing_events_are_higher_is_better_despite_keywords() {
    let records = vec![PracticalEventRecord::new(
        "메디신볼던지기",
        RecordValue::Number(11.2),
    )];

    let result = compute_practical_score(&records, &practical_table(), None, 100.0);

    assert_eq!(result.events[0].score, 90.0);
}

#[test]
fn absent_record_follows_university_policy() {
    let records = vec![PracticalEventRecord::new(
        "메디신볼던지기",
        RecordValue::Text("기권".into()),
    )];

    let zero = compute_practical_score(&records, &practical_table(), None, 100.0);
    let minimum = compute_practical_score(
        &records,
        &practical_table().with_out_of_range(OutOfRangePolicy::Minimum),
        None,
        100.0,
    );

    assert_eq!(zero.events[0].score, 0.0);
    assert_eq!(minimum.events[0].score, 80.0);
}

#[test]
fn practical_result_is_deterministic() {
    let records = vec![
        PracticalEventRecord::new("10m왕복달리기", RecordValue::Number(9.2)),
        PracticalEventRecord::new("메디신볼던지기", RecordValue::Text("미응시".into())),
    ];

    let first = compute_practical_score(&records, &practical_table(), Some(Gender::Male), 300.0);
    let second = compute_practical_score(&records, &practical_table(), Some(Gender::Male), 300.0);

    assert_eq!(first, second);
    assert_eq!(first.events[0].score, 95.0);
    assert_eq!(first.events[1].score, 80.0);
    assert_eq!(first.total, 262.5);
}
