//! High level profiling orchestration.
//!
//! Wires the identity pool, probe transport, staged protocol, robots
//! crawl-delay hint, and defense classification into a single profiling
//! pass, and exposes the flat `profile_rate_limits` contract the rest of
//! the system consumes.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::analysis::assessment::DefenseAssessment;
use crate::analysis::diff::ScanRecord;
use crate::probing::protocol::{ProfileConfig, ProfileResult, RateLimitProfiler};
use crate::probing::transport::ReqwestProbeTransport;
use crate::robots;

/// Result alias used across the orchestration layer.
pub type ProfilerResult<T> = Result<T, ProfilerError>;

/// Failures that abort a profiling run before any probe is sent.
///
/// Individual probe failures never show up here; they are absorbed by the
/// protocol as unreachable outcomes.
#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Collaborator-facing outcome of [`profile_rate_limits`].
///
/// The serialized form keeps the `status`/`results`/`message` shape scan
/// uploaders, presenters, and the diff engine consume; callers depend on
/// that shape, never on internal phase counts or timing constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProfileOutcome {
    Success { results: ProfileResult },
    Error { message: String },
}

/// Profile a target's rate-limit and blocking behavior.
///
/// `crawl_delay` is the site-provided hint in seconds (usually sourced
/// from robots.txt); when absent, the default baseline spacing applies.
///
/// This function never fails: session-setup problems come back as the
/// `Error` variant, and a run in which nothing blocked is a normal
/// `Success`.
pub async fn profile_rate_limits(url: &str, crawl_delay: Option<f64>) -> ProfileOutcome {
    let mut config = ProfileConfig::default();
    if let Some(delay) = crawl_delay.filter(|delay| delay.is_finite() && *delay >= 0.0) {
        config = config.with_baseline_delay(Duration::from_secs_f64(delay));
    }

    match run_protocol(url, config).await {
        Ok(results) => ProfileOutcome::Success { results },
        Err(err) => ProfileOutcome::Error {
            message: err.to_string(),
        },
    }
}

async fn run_protocol(url: &str, config: ProfileConfig) -> ProfilerResult<ProfileResult> {
    let target = Url::parse(url)?;
    let transport = ReqwestProbeTransport::new(config.probe_timeout)?;
    let profiler = RateLimitProfiler::new(Arc::new(transport), config);
    Ok(profiler.run(&target).await)
}

/// Site profiler with hint sourcing and verdict classification on top of
/// the raw protocol.
///
/// Baseline spacing precedence: an explicit delay set on the builder wins
/// over the robots.txt hint, which wins over the configured default. Each
/// [`profile`](Self::profile) call opens a fresh session context; nothing
/// persists between runs.
pub struct SiteProfiler {
    config: ProfileConfig,
    explicit_delay: Option<Duration>,
    respect_robots: bool,
}

impl SiteProfiler {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SiteProfilerBuilder {
        SiteProfilerBuilder::new()
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Run a full profiling pass: source the crawl-delay hint, run the
    /// staged protocol, classify the verdict, and stamp a scan record.
    pub async fn profile(&self, url: &str) -> ProfilerResult<ScanRecord> {
        let target = Url::parse(url)?;
        let transport = ReqwestProbeTransport::new(self.config.probe_timeout)?;

        let delay = match self.explicit_delay {
            Some(delay) => delay,
            None => self
                .crawl_delay_hint(transport.client(), &target)
                .await
                .unwrap_or(self.config.baseline_delay),
        };

        let config = self.config.clone().with_baseline_delay(delay);
        let profiler = RateLimitProfiler::new(Arc::new(transport), config.clone());
        let results = profiler.run(&target).await;
        let assessment = DefenseAssessment::classify(&results, &config);

        Ok(ScanRecord::new(&target, results, assessment))
    }

    async fn crawl_delay_hint(
        &self,
        client: &reqwest::Client,
        target: &Url,
    ) -> Option<Duration> {
        if !self.respect_robots {
            return None;
        }
        let seconds = robots::fetch_crawl_delay(client, target).await?;
        log::debug!("{target} robots.txt asks for a {seconds}s crawl delay");
        Some(Duration::from_secs_f64(seconds))
    }
}

impl Default for SiteProfiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent builder for [`SiteProfiler`].
pub struct SiteProfilerBuilder {
    config: ProfileConfig,
    explicit_delay: Option<Duration>,
    respect_robots: bool,
}

impl SiteProfilerBuilder {
    pub fn new() -> Self {
        Self {
            config: ProfileConfig::default(),
            explicit_delay: None,
            respect_robots: true,
        }
    }

    pub fn with_config(mut self, config: ProfileConfig) -> Self {
        self.config = config;
        self
    }

    /// Pin the baseline spacing, overriding any robots.txt hint.
    pub fn with_baseline_delay(mut self, delay: Duration) -> Self {
        self.explicit_delay = Some(delay);
        self
    }

    /// Skip the robots.txt lookup and use the configured default spacing.
    pub fn ignore_robots_hint(mut self) -> Self {
        self.respect_robots = false;
        self
    }

    pub fn build(self) -> SiteProfiler {
        SiteProfiler {
            config: self.config,
            explicit_delay: self.explicit_delay,
            respect_robots: self.respect_robots,
        }
    }
}

impl Default for SiteProfilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
