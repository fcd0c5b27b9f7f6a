//! Cross-scan comparison.
//!
//! Scans of the same target drift over time: sites add bot defenses, tune
//! rate limits, or drop protections. A [`ScanRecord`] freezes one run's
//! verdict with a timestamp, and [`compare_scans`] reports what changed
//! between two of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::assessment::DefenseAssessment;
use crate::probing::protocol::ProfileResult;

/// One completed profiling run, frozen for storage or comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub url: String,
    pub scanned_at: DateTime<Utc>,
    pub results: ProfileResult,
    pub assessment: DefenseAssessment,
}

impl ScanRecord {
    pub fn new(url: &Url, results: ProfileResult, assessment: DefenseAssessment) -> Self {
        Self {
            url: url.as_str().to_string(),
            scanned_at: Utc::now(),
            results,
            assessment,
        }
    }
}

/// Changes between two scans of the same target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanDiff {
    /// The target started blocking since the previous scan.
    pub blocking_added: Option<&'static str>,
    /// The target stopped blocking since the previous scan.
    pub blocking_removed: Option<&'static str>,
    /// Both scans blocked, with different codes: (previous, current).
    pub blocking_code_changed: Option<(u16, u16)>,
    /// The defense category shifted (e.g. rate limit became fingerprint
    /// blocking), including the added/removed cases above.
    pub assessment_changed: bool,
}

impl ScanDiff {
    pub fn has_changes(&self) -> bool {
        *self != Self::default()
    }
}

/// Compare the current scan against a previous one.
///
/// Operates only on the verdict fields both scans expose; phase counts and
/// timing internals never leak into the comparison.
pub fn compare_scans(current: &ScanRecord, previous: &ScanRecord) -> ScanDiff {
    let mut diff = ScanDiff::default();

    match (
        previous.assessment.is_blocked(),
        current.assessment.is_blocked(),
    ) {
        (false, true) => diff.blocking_added = Some(current.assessment.label()),
        (true, false) => diff.blocking_removed = Some(previous.assessment.label()),
        (true, true) => {
            let prev_code = previous.results.blocking_code;
            let curr_code = current.results.blocking_code;
            if let (Some(prev), Some(curr)) = (prev_code, curr_code)
                && prev != curr
            {
                diff.blocking_code_changed = Some((prev, curr));
            }
        }
        (false, false) => {}
    }

    diff.assessment_changed = previous.assessment.label() != current.assessment.label();

    diff
}
