use std::fmt;

use super::table::{EventScoreRow, OutOfRangePolicy, Qualifier, RecordValue, RowKind};
use crate::scoring::keywords::{is_forced_minimum_label, is_minimum_ignored_label, RecordDirection};

/// How a record was matched against the table, kept for the audit log.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchRule {
    ForcedMinimum,
    Label(String),
    Range { limit: f64, qualifier: Qualifier },
    Threshold(f64),
    LowestThreshold(f64),
    OutOfRange(OutOfRangePolicy),
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::ForcedMinimum => write!(f, "forced minimum"),
            MatchRule::Label(label) => write!(f, "label {label}"),
            MatchRule::Range { limit, qualifier } => {
                let symbol = match qualifier {
                    Qualifier::AtLeast => ">=",
                    Qualifier::AtMost => "<=",
                    Qualifier::Above => ">",
                    Qualifier::Below => "<",
                };
                write!(f, "range {symbol} {limit}")
            }
            MatchRule::Threshold(threshold) => write!(f, "threshold {threshold}"),
            MatchRule::LowestThreshold(threshold) => {
                write!(f, "below every threshold, lowest row {threshold}")
            }
            MatchRule::OutOfRange(OutOfRangePolicy::Zero) => write!(f, "no match, 0 points"),
            MatchRule::OutOfRange(OutOfRangePolicy::Minimum) => {
                write!(f, "no match, table minimum")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventLookup {
    pub points: f64,
    pub rule: MatchRule,
}

/// Highest points across the rows, or 0 when there are none.
pub fn max_points(rows: &[&EventScoreRow]) -> f64 {
    rows.iter()
        .map(|row| row.points)
        .filter(|points| points.is_finite())
        .fold(None, |best: Option<f64>, points| {
            Some(best.map_or(points, |best| best.max(points)))
        })
        .unwrap_or(0.0)
}

/// Lowest points, skipping pass/fail-style label rows.
pub fn min_points(rows: &[&EventScoreRow]) -> f64 {
    rows.iter()
        .filter(|row| !is_minimum_ignored_label(&row.record.normalized()))
        .map(|row| row.points)
        .filter(|points| points.is_finite())
        .fold(None, |best: Option<f64>, points| {
            Some(best.map_or(points, |best| best.min(points)))
        })
        .unwrap_or(0.0)
}

/// Resolves the points for one record against the rows of a single event.
pub fn lookup_points(
    rows: &[&EventScoreRow],
    record: &RecordValue,
    direction: RecordDirection,
    policy: OutOfRangePolicy,
) -> EventLookup {
    let normalized = record.normalized();
    if is_forced_minimum_label(&normalized) {
        return EventLookup {
            points: min_points(rows),
            rule: MatchRule::ForcedMinimum,
        };
    }

    let kinds: Vec<(RowKind, f64)> = rows.iter().map(|row| (row.kind(), row.points)).collect();

    let Some(value) = record.as_number() else {
        let label = kinds.iter().find_map(|(kind, points)| match kind {
            RowKind::Label(label) if *label == normalized => Some(*points),
            _ => None,
        });
        return match label {
            Some(points) => EventLookup {
                points,
                rule: MatchRule::Label(normalized),
            },
            None => out_of_range(rows, policy),
        };
    };

    let range = kinds.iter().find_map(|(kind, points)| match kind {
        RowKind::Range { limit, qualifier } if qualifier.matches(value, *limit) => {
            Some(EventLookup {
                points: *points,
                rule: MatchRule::Range {
                    limit: *limit,
                    qualifier: *qualifier,
                },
            })
        }
        _ => None,
    });
    if let Some(found) = range {
        return found;
    }

    let thresholds: Vec<(f64, f64)> = kinds
        .iter()
        .filter_map(|(kind, points)| match kind {
            RowKind::Threshold(threshold) => Some((*threshold, *points)),
            _ => None,
        })
        .collect();
    if thresholds.is_empty() {
        return out_of_range(rows, policy);
    }

    let qualifying = thresholds.iter().filter(|(threshold, _)| match direction {
        RecordDirection::LowerIsBetter => value <= *threshold,
        RecordDirection::HigherIsBetter => value >= *threshold,
    });
    let closest = match direction {
        RecordDirection::LowerIsBetter => qualifying.min_by(|a, b| a.0.total_cmp(&b.0)),
        RecordDirection::HigherIsBetter => qualifying.max_by(|a, b| a.0.total_cmp(&b.0)),
    };
    if let Some((threshold, points)) = closest {
        return EventLookup {
            points: *points,
            rule: MatchRule::Threshold(*threshold),
        };
    }

    let lowest = thresholds
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .copied();
    match lowest {
        Some((threshold, points)) => EventLookup {
            points,
            rule: MatchRule::LowestThreshold(threshold),
        },
        None => out_of_range(rows, policy),
    }
}

fn out_of_range(rows: &[&EventScoreRow], policy: OutOfRangePolicy) -> EventLookup {
    let points = match policy {
        OutOfRangePolicy::Zero => 0.0,
        OutOfRangePolicy::Minimum => min_points(rows),
    };
    EventLookup {
        points,
        rule: MatchRule::OutOfRange(policy),
    }
}
