//! Interpretation of profiling verdicts.
//!
//! A block after exactly one request cannot be a rate limit (no rate can
//! plausibly be exceeded by a single request), so it points at
//! fingerprint-based heuristics (User-Agent, TLS, header checks) instead.
//! This module turns the raw verdict into that caller-facing distinction.

use serde::{Deserialize, Serialize};

use crate::probing::protocol::{ProfileConfig, ProfileResult};

/// What kind of defense, if any, a profiling run revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefenseAssessment {
    /// Every probe went through unchallenged.
    NoBlocking,
    /// Blocked on the very first request: likely fingerprint-based
    /// blocking rather than a request-rate limit.
    FingerprintSuspected { code: u16 },
    /// Blocked partway through the slow, spaced baseline: a strict
    /// request-rate limit.
    RateLimited { code: u16, after_requests: u32 },
    /// Tolerated the polite baseline but rejected the concurrent volley.
    BurstLimited { code: u16 },
}

impl DefenseAssessment {
    /// Classify a run's verdict against the configuration that produced it.
    pub fn classify(results: &ProfileResult, config: &ProfileConfig) -> Self {
        match results.blocking_code {
            None => Self::NoBlocking,
            Some(code) if results.requests_sent == 1 => Self::FingerprintSuspected { code },
            Some(code) if results.requests_sent <= config.gentle_probes => Self::RateLimited {
                code,
                after_requests: results.requests_sent,
            },
            Some(code) => Self::BurstLimited { code },
        }
    }

    pub fn is_blocked(&self) -> bool {
        !matches!(self, Self::NoBlocking)
    }

    pub fn blocking_code(&self) -> Option<u16> {
        match self {
            Self::NoBlocking => None,
            Self::FingerprintSuspected { code }
            | Self::RateLimited { code, .. }
            | Self::BurstLimited { code } => Some(*code),
        }
    }

    /// Stable display name for the detected defense category.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoBlocking => "no blocking",
            Self::FingerprintSuspected { .. } => "fingerprint blocking",
            Self::RateLimited { .. } => "rate limiting",
            Self::BurstLimited { .. } => "burst limiting",
        }
    }
}
