//! Two-phase rate-limit profiling protocol.
//!
//! BASELINE sends slow, spaced, strictly sequential probes: the control
//! condition that separates "tolerates polite traffic" from "blocks bots
//! outright". BURST then fires a concurrent volley to stress burst
//! tolerance independent of per-request spacing. The first blocking
//! signal ends the run; the protocol never retries past a confirmed block.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use url::Url;

use super::identities::IdentityPool;
use super::transport::{ProbeOutcome, ProbeTransport, execute_probe};

const DEFAULT_GENTLE_PROBES: u32 = 4;
const DEFAULT_BURST_PROBES: u32 = 8;
const DEFAULT_BASELINE_DELAY: Duration = Duration::from_secs(3);
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Status codes read as "the target is actively defending".
///
/// This set is policy, not measurement: it is carried as configuration and
/// never inferred from response bodies.
pub const DEFAULT_BLOCKING_CODES: [u16; 4] = [401, 403, 429, 503];

/// Tuning knobs for one profiling run.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    /// Probe count for the sequential baseline phase.
    pub gentle_probes: u32,
    /// Probe count for the concurrent burst phase.
    pub burst_probes: u32,
    /// Spacing between consecutive baseline probes.
    pub baseline_delay: Duration,
    /// Per-probe request timeout.
    pub probe_timeout: Duration,
    /// Status codes classified as blocking signals.
    pub blocking_codes: Vec<u16>,
    /// Identity catalog probes rotate through.
    pub identities: IdentityPool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            gentle_probes: DEFAULT_GENTLE_PROBES,
            burst_probes: DEFAULT_BURST_PROBES,
            baseline_delay: DEFAULT_BASELINE_DELAY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            blocking_codes: DEFAULT_BLOCKING_CODES.to_vec(),
            identities: IdentityPool::default(),
        }
    }
}

impl ProfileConfig {
    pub fn with_probe_counts(mut self, gentle: u32, burst: u32) -> Self {
        self.gentle_probes = gentle;
        self.burst_probes = burst;
        self
    }

    pub fn with_baseline_delay(mut self, delay: Duration) -> Self {
        self.baseline_delay = delay;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_blocking_codes(mut self, codes: impl Into<Vec<u16>>) -> Self {
        self.blocking_codes = codes.into();
        self
    }

    pub fn with_identities(mut self, identities: IdentityPool) -> Self {
        self.identities = identities;
        self
    }

    /// The status code carried by `outcome` if it is a blocking signal.
    /// Unreachable probes are never blocking.
    pub fn blocking_code(&self, outcome: ProbeOutcome) -> Option<u16> {
        match outcome {
            ProbeOutcome::Status(code) if self.blocking_codes.contains(&code) => Some(code),
            _ => None,
        }
    }
}

/// Aggregate verdict of one profiling run.
///
/// `blocking_code` is present exactly when a blocking signal was observed;
/// downstream consumers rely on that presence/absence semantic, so the
/// field is omitted from serialized records when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResult {
    /// Total probes sent before the run ended.
    pub requests_sent: u32,
    /// The status that triggered the block, when one occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_code: Option<u16>,
    /// Human-readable summary of how the run ended.
    pub details: String,
}

impl ProfileResult {
    pub fn was_blocked(&self) -> bool {
        self.blocking_code.is_some()
    }
}

/// Drives the staged probing protocol over a shared transport.
pub struct RateLimitProfiler {
    transport: Arc<dyn ProbeTransport>,
    config: ProfileConfig,
}

impl RateLimitProfiler {
    pub fn new(transport: Arc<dyn ProbeTransport>, config: ProfileConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Run BASELINE → BURST and aggregate the verdict.
    ///
    /// Individual probe failures never fail the run; they surface as
    /// unreachable outcomes and the phases continue.
    pub async fn run(&self, target: &Url) -> ProfileResult {
        let mut requests_sent = 0u32;

        // BASELINE: each probe fully resolves before the next is sent.
        // The spacing is load-bearing; no delay after the final probe.
        for sent in 0..self.config.gentle_probes {
            let outcome =
                execute_probe(self.transport.as_ref(), &self.config.identities, target).await;
            requests_sent += 1;

            if let Some(code) = self.config.blocking_code(outcome) {
                log::info!("{target} blocked baseline probe {requests_sent} with {code}");
                return ProfileResult {
                    requests_sent,
                    blocking_code: Some(code),
                    details: format!(
                        "Blocked after {requests_sent} requests with a {:.1}s delay.",
                        self.config.baseline_delay.as_secs_f64()
                    ),
                };
            }

            if sent + 1 < self.config.gentle_probes {
                sleep(self.config.baseline_delay).await;
            }
        }

        // BURST: fire the whole volley at once and wait for every
        // completion. Ordering among the outcomes carries no meaning;
        // only whether any of them blocked.
        let volley = (0..self.config.burst_probes)
            .map(|_| execute_probe(self.transport.as_ref(), &self.config.identities, target));
        let outcomes = join_all(volley).await;
        requests_sent += self.config.burst_probes;

        for outcome in outcomes {
            // Several burst probes may block at once; which code gets
            // reported is arbitrary, and the first found wins.
            if let Some(code) = self.config.blocking_code(outcome) {
                log::info!("{target} blocked during the concurrent burst with {code}");
                return ProfileResult {
                    requests_sent,
                    blocking_code: Some(code),
                    details: format!(
                        "Blocked during a concurrent burst of {} requests.",
                        self.config.burst_probes
                    ),
                };
            }
        }

        log::debug!("{target} tolerated all {requests_sent} probes");
        ProfileResult {
            requests_sent,
            blocking_code: None,
            details: format!("No blocking detected after {requests_sent} requests."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probing::identities::{ClientIdentity, IdentityPool};
    use crate::probing::transport::TransportError;
    use async_trait::async_trait;
    use http::HeaderMap;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Transport that replays a scripted status sequence and records how
    /// and when it was called. Exhausting the script yields 200s.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<u16, TransportError>>>,
        calls: AtomicU32,
        dispatched_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(script: impl IntoIterator<Item = Result<u16, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicU32::new(0),
                dispatched_at: Mutex::new(Vec::new()),
            })
        }

        fn statuses(script: impl IntoIterator<Item = u16>) -> Arc<Self> {
            Self::new(script.into_iter().map(Ok))
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn dispatch_times(&self) -> Vec<Instant> {
            self.dispatched_at.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProbeTransport for ScriptedTransport {
        async fn fetch_status(
            &self,
            _url: &Url,
            _headers: HeaderMap,
        ) -> Result<u16, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.dispatched_at.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(200))
        }
    }

    fn test_config() -> ProfileConfig {
        // Single-entry pool keeps selection deterministic.
        ProfileConfig::default()
            .with_identities(IdentityPool::new(vec![ClientIdentity {
                user_agent: "test-agent/1.0".into(),
                hints: None,
            }]))
    }

    fn target() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn clean_run_sends_every_probe_in_both_phases() {
        let transport = ScriptedTransport::statuses([]);
        let profiler = RateLimitProfiler::new(transport.clone(), test_config());

        let result = profiler.run(&target()).await;

        assert_eq!(result.requests_sent, 4 + 8);
        assert_eq!(result.blocking_code, None);
        assert!(!result.was_blocked());
        assert_eq!(result.details, "No blocking detected after 12 requests.");
        assert_eq!(transport.calls(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn baseline_block_stops_the_run_before_the_burst() {
        let transport = ScriptedTransport::statuses([200, 403]);
        let profiler = RateLimitProfiler::new(transport.clone(), test_config());

        let result = profiler.run(&target()).await;

        assert_eq!(result.requests_sent, 2);
        assert_eq!(result.blocking_code, Some(403));
        assert!(result.details.starts_with("Blocked after 2 requests"));
        // The burst phase must never have fired.
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn block_on_the_very_first_probe_reports_one_request() {
        // One request cannot exceed any rate; callers read this case as
        // fingerprint-based blocking.
        let transport = ScriptedTransport::statuses([429]);
        let profiler = RateLimitProfiler::new(transport.clone(), test_config());

        let result = profiler.run(&target()).await;

        assert_eq!(result.requests_sent, 1);
        assert_eq!(result.blocking_code, Some(429));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_block_reports_the_full_request_count() {
        let transport = ScriptedTransport::statuses([200, 200, 200, 200, 200, 200, 503]);
        let profiler = RateLimitProfiler::new(transport.clone(), test_config());

        let result = profiler.run(&target()).await;

        assert_eq!(result.requests_sent, 12);
        assert_eq!(result.blocking_code, Some(503));
        assert_eq!(
            result.details,
            "Blocked during a concurrent burst of 8 requests."
        );
        assert_eq!(transport.calls(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_tiebreak_reports_one_of_the_observed_codes() {
        // Several burst probes block at once; the reported code is
        // arbitrary but must be one that actually occurred.
        let transport = ScriptedTransport::statuses([200, 200, 200, 200, 429, 503, 401]);
        let profiler = RateLimitProfiler::new(transport.clone(), test_config());

        let result = profiler.run(&target()).await;

        assert_eq!(result.requests_sent, 12);
        assert!(matches!(
            result.blocking_code,
            Some(401) | Some(429) | Some(503)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_probes_are_not_blocks() {
        let transport =
            ScriptedTransport::new((0..12).map(|_| Err(TransportError::Timeout)));
        let profiler = RateLimitProfiler::new(transport.clone(), test_config());

        let result = profiler.run(&target()).await;

        assert_eq!(result.requests_sent, 12);
        assert_eq!(result.blocking_code, None);
        assert_eq!(transport.calls(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_baseline_probe_does_not_stop_the_phase() {
        let transport = ScriptedTransport::new([
            Err(TransportError::Transport("connection reset".into())),
            Ok(200),
            Ok(200),
            Ok(403),
        ]);
        let profiler = RateLimitProfiler::new(transport.clone(), test_config());

        let result = profiler.run(&target()).await;

        assert_eq!(result.requests_sent, 4);
        assert_eq!(result.blocking_code, Some(403));
    }

    #[tokio::test(start_paused = true)]
    async fn baseline_is_spaced_and_burst_is_not() {
        let delay = Duration::from_secs(3);
        let transport = ScriptedTransport::statuses([]);
        let profiler = RateLimitProfiler::new(
            transport.clone(),
            test_config().with_baseline_delay(delay),
        );

        profiler.run(&target()).await;

        let times = transport.dispatch_times();
        assert_eq!(times.len(), 12);

        // Consecutive baseline dispatches are at least one delay apart.
        for pair in times[..4].windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }

        // The burst volley introduces no artificial spacing.
        let burst_span = times[11] - times[4];
        assert!(burst_span < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_blocking_policy_is_honored() {
        let transport = ScriptedTransport::statuses([418]);
        let config = test_config().with_blocking_codes([418]);
        let profiler = RateLimitProfiler::new(transport.clone(), config);

        let result = profiler.run(&target()).await;

        assert_eq!(result.blocking_code, Some(418));
        assert_eq!(result.requests_sent, 1);
    }

    #[test]
    fn result_serialization_omits_absent_blocking_code() {
        let clean = ProfileResult {
            requests_sent: 12,
            blocking_code: None,
            details: "No blocking detected after 12 requests.".into(),
        };
        let json = serde_json::to_value(&clean).unwrap();
        assert!(json.get("blocking_code").is_none());

        let blocked = ProfileResult {
            requests_sent: 1,
            blocking_code: Some(403),
            details: "Blocked after 1 requests with a 3.0s delay.".into(),
        };
        let json = serde_json::to_value(&blocked).unwrap();
        assert_eq!(json["blocking_code"], 403);
    }
}
