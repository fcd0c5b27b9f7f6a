//! Probe transport and execution.
//!
//! A probe is one outbound GET issued under a rotated browser identity.
//! Every failure mode (timeout, refused connection, DNS) is reduced to a
//! data value at this boundary; no error crosses into the protocol layer.

use std::time::Duration;

use async_trait::async_trait;
use http::HeaderMap;
use thiserror::Error;
use url::Url;

use super::identities::IdentityPool;

/// Classified result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The target answered with this HTTP status.
    Status(u16),
    /// No response was obtained: the request timed out or the transport
    /// failed outright.
    ///
    /// Unreachable is never a blocking signal, so a defense that silently
    /// drops packets instead of answering 403/429 is invisible to the
    /// classifier. Known detection gap, kept as-is.
    Unreachable,
}

impl ProbeOutcome {
    /// The observed status code, if any response came back.
    pub fn status(self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(code),
            Self::Unreachable => None,
        }
    }
}

/// Transport-level failures, reduced to `Unreachable` by the executor.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("probe timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Contract abstracting the HTTP transport probes travel over.
///
/// Implementations share one connection context across every probe of a
/// run; each call is an independent outbound GET against that context.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Issue a GET with the given header set and return the final status
    /// code after redirects.
    async fn fetch_status(&self, url: &Url, headers: HeaderMap) -> Result<u16, TransportError>;
}

/// Reqwest-backed transport used for live probing.
///
/// Cookies persist across the probes of a run and redirects are followed,
/// matching what a real browser session would do.
pub struct ReqwestProbeTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestProbeTransport {
    /// Build the shared session context for one profiling run.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self { client, timeout })
    }

    /// Wrap an existing reqwest client. The client should follow
    /// redirects; a redirect-terminal status would otherwise be classified
    /// instead of the page behind it.
    pub fn from_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// The underlying session context, for collaborators that need an
    /// auxiliary fetch over the same connections (robots.txt).
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl ProbeTransport for ReqwestProbeTransport {
    async fn fetch_status(&self, url: &Url, headers: HeaderMap) -> Result<u16, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Transport(err.to_string())
                }
            })?;

        // Only the status matters; dropping the response releases the body
        // and its connection immediately.
        Ok(response.status().as_u16())
    }
}

/// Issue one probe against `target` under a freshly drawn identity.
///
/// Never fails: timeouts and transport errors come back as
/// [`ProbeOutcome::Unreachable`]. Retry policy, if any, belongs to the
/// caller.
pub async fn execute_probe(
    transport: &dyn ProbeTransport,
    identities: &IdentityPool,
    target: &Url,
) -> ProbeOutcome {
    let identity = identities.select();

    match transport.fetch_status(target, identity.header_map()).await {
        Ok(status) => ProbeOutcome::Status(status),
        Err(err) => {
            log::debug!("probe to {target} obtained no response: {err}");
            ProbeOutcome::Unreachable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedTransport {
        responses: Mutex<Vec<Result<u16, TransportError>>>,
    }

    impl FixedTransport {
        fn new(responses: Vec<Result<u16, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl ProbeTransport for FixedTransport {
        async fn fetch_status(
            &self,
            _url: &Url,
            headers: HeaderMap,
        ) -> Result<u16, TransportError> {
            assert!(headers.contains_key(http::header::USER_AGENT));
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn target() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[tokio::test]
    async fn status_passes_through() {
        let transport = FixedTransport::new(vec![Ok(429)]);
        let outcome = execute_probe(&transport, &IdentityPool::default(), &target()).await;
        assert_eq!(outcome, ProbeOutcome::Status(429));
    }

    #[tokio::test]
    async fn timeout_reduces_to_unreachable() {
        let transport = FixedTransport::new(vec![Err(TransportError::Timeout)]);
        let outcome = execute_probe(&transport, &IdentityPool::default(), &target()).await;
        assert_eq!(outcome, ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn connection_failure_reduces_to_unreachable() {
        let transport = FixedTransport::new(vec![Err(TransportError::Transport(
            "connection refused".into(),
        ))]);
        let outcome = execute_probe(&transport, &IdentityPool::default(), &target()).await;
        assert_eq!(outcome, ProbeOutcome::Unreachable);
    }
}
