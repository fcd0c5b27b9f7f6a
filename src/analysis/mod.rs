// Caller-side interpretation of profiling verdicts: classification and drift tracking.

pub mod assessment;
pub mod diff;

pub use assessment::DefenseAssessment;
pub use diff::{ScanDiff, ScanRecord, compare_scans};
