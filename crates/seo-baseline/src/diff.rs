//! Drift between a stored baseline and a fresh capture.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::SeoRecord;

/// A compared SEO field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeoField {
    Title,
    Description,
    H1,
}

impl SeoField {
    pub const ALL: [SeoField; 3] = [SeoField::Title, SeoField::Description, SeoField::H1];

    fn of(self, record: &SeoRecord) -> &str {
        match self {
            SeoField::Title => &record.title,
            SeoField::Description => &record.description,
            SeoField::H1 => &record.h1,
        }
    }
}

impl fmt::Display for SeoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeoField::Title => "title",
            SeoField::Description => "description",
            SeoField::H1 => "h1",
        })
    }
}

/// One field that no longer matches its baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDrift {
    pub url: String,
    pub field: SeoField,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for FieldDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: expected {:?}, got {:?}",
            self.url, self.field, self.expected, self.actual
        )
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fields of `actual` that differ from `baseline`, ignoring whitespace runs.
pub fn compare(baseline: &SeoRecord, actual: &SeoRecord) -> Vec<FieldDrift> {
    SeoField::ALL
        .iter()
        .filter(|field| normalize(field.of(baseline)) != normalize(field.of(actual)))
        .map(|&field| FieldDrift {
            url: baseline.url.clone(),
            field,
            expected: field.of(baseline).to_string(),
            actual: field.of(actual).to_string(),
        })
        .collect()
}

/// Result of comparing a whole capture against the baseline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DriftReport {
    pub drifts: Vec<FieldDrift>,
    /// Captured pages with no baseline row.
    pub missing_baseline: Vec<String>,
    /// Baseline rows that were not captured.
    pub missing_pages: Vec<String>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty() && self.missing_baseline.is_empty() && self.missing_pages.is_empty()
    }
}

/// Compare every captured record against `baseline`. Output follows the order
/// of `captured`; `missing_pages` is sorted.
pub fn compare_all(baseline: &HashMap<String, SeoRecord>, captured: &[SeoRecord]) -> DriftReport {
    let mut report = DriftReport::default();
    let mut seen = HashSet::new();

    for actual in captured {
        seen.insert(actual.url.as_str());
        match baseline.get(&actual.url) {
            Some(expected) => report.drifts.extend(compare(expected, actual)),
            None => report.missing_baseline.push(actual.url.clone()),
        }
    }

    report.missing_pages = baseline
        .keys()
        .filter(|url| !seen.contains(url.as_str()))
        .cloned()
        .collect();
    report.missing_pages.sort();
    report
}
