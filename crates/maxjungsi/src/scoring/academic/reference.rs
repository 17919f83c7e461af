use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::InquiryTrack;

/// Highest standardized score of the year per subject name (`정시최고표점`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighestStandardScoreMap(BTreeMap<String, f64>);

impl HighestStandardScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject: impl Into<String>, score: f64) {
        self.0.insert(subject.into(), score);
    }

    /// Usable maximum for a subject; missing or non-positive entries yield `None`.
    pub fn get(&self, subject: &str) -> Option<f64> {
        self.0
            .get(subject)
            .copied()
            .filter(|score| score.is_finite() && *score > 0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for HighestStandardScoreMap {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(subject, score)| (subject.into(), score))
                .collect(),
        )
    }
}

/// University-specific percentile to converted standard score table (`변환표준점수`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectConversionTable {
    rows: BTreeMap<InquiryTrack, BTreeMap<u32, f64>>,
}

impl SubjectConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track: InquiryTrack, percentile: u32, converted_score: f64) {
        self.rows
            .entry(track)
            .or_default()
            .insert(percentile, converted_score);
    }

    /// Converted score for a percentile, rounded to the nearest whole percentile.
    pub fn lookup(&self, track: InquiryTrack, percentile: f64) -> Option<f64> {
        if !percentile.is_finite() || percentile < 0.0 {
            return None;
        }
        let key = percentile.round() as u32;
        self.rows.get(&track)?.get(&key).copied()
    }

    /// Highest converted score across both tracks.
    pub fn max_score(&self) -> Option<f64> {
        self.rows
            .values()
            .flat_map(|track| track.values().copied())
            .filter(|score| score.is_finite())
            .reduce(f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(BTreeMap::is_empty)
    }
}

impl FromIterator<(InquiryTrack, u32, f64)> for SubjectConversionTable {
    fn from_iter<I: IntoIterator<Item = (InquiryTrack, u32, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (track, percentile, converted_score) in iter {
            table.insert(track, percentile, converted_score);
        }
        table
    }
}
