//! # scrapability
//!
//! Probes how aggressively a web endpoint defends itself against
//! automated access, before you invest in building a scraper against it.
//!
//! The engine stages live traffic in two phases: a slow, spaced baseline
//! that mimics polite crawling, then a concurrent burst that stresses
//! rate tolerance. Each probe travels under a rotated browser identity so
//! a single fingerprint cannot get the whole run blocked, and every
//! response is classified against a fixed set of blocking status codes.
//! The engine observes defenses; it never tries to defeat them.
//!
//! ## Features
//!
//! - Two-phase probing protocol with early exit on the first block
//! - Browser identity rotation, with Chromium client hints only where a
//!   real browser would send them
//! - robots.txt crawl-delay hints seeding the baseline spacing
//! - Defense classification: fingerprint blocking vs rate limiting vs
//!   burst limiting
//! - Cross-scan diffing for tracking a target's defenses over time
//!
//! ## Example
//!
//! ```no_run
//! use scrapability::profile_rate_limits;
//!
//! #[tokio::main]
//! async fn main() {
//!     let outcome = profile_rate_limits("https://example.com", None).await;
//!     println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
//! }
//! ```

mod profiler;

pub mod analysis;
pub mod probing;
pub mod robots;

pub use crate::profiler::{
    ProfileOutcome,
    ProfilerError,
    ProfilerResult,
    SiteProfiler,
    SiteProfilerBuilder,
    profile_rate_limits,
};

pub use crate::probing::identities::{ClientHints, ClientIdentity, IdentityPool};

pub use crate::probing::protocol::{
    DEFAULT_BLOCKING_CODES,
    ProfileConfig,
    ProfileResult,
    RateLimitProfiler,
};

pub use crate::probing::transport::{
    ProbeOutcome,
    ProbeTransport,
    ReqwestProbeTransport,
    TransportError,
    execute_probe,
};

pub use crate::analysis::assessment::DefenseAssessment;
pub use crate::analysis::diff::{ScanDiff, ScanRecord, compare_scans};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
