//! Browser identity catalog and rotation.
//!
//! Responsibilities:
//! - Carry a fixed, version-pinned catalog of realistic browser header sets.
//! - Hand out one identity per outbound probe, drawn uniformly at random.
//!
//! Rotating the identity per probe keeps a defense from correlating the
//! whole run on a single fingerprint and blocking it on the first
//! identity-based signal instead of revealing a genuine rate limit.

use http::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use once_cell::sync::Lazy;
use rand::Rng;
use rand::seq::SliceRandom;
use rand::thread_rng;

/// Client-hint headers that accompany a Chromium-family User-Agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHints {
    pub sec_ch_ua: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_platform: String,
}

/// One immutable browser fingerprint: a User-Agent plus, for
/// Chromium-family browsers only, the matching `sec-ch-ua*` hints.
///
/// Firefox and Safari do not send client hints. Those entries carry
/// `None`, and no hint header is ever synthesized for them: a Safari
/// User-Agent paired with Chromium hints is itself a detectable mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_agent: String,
    pub hints: Option<ClientHints>,
}

impl ClientIdentity {
    /// Chromium-family entry (Chrome, Edge, CriOS): User-Agent plus the
    /// brand/version/platform client hints a real Chromium build sends.
    fn chromium(user_agent: &str, brand: &str, version: u16, mobile: bool, platform: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            hints: Some(ClientHints {
                sec_ch_ua: format!(
                    r#""Chromium";v="{version}", "{brand}";v="{version}", "Not?A_Brand";v="99""#
                ),
                sec_ch_ua_mobile: if mobile { "?1" } else { "?0" }.to_string(),
                sec_ch_ua_platform: format!(r#""{platform}""#),
            }),
        }
    }

    /// Entry for engines that send no client hints (Gecko, WebKit).
    fn plain(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            hints: None,
        }
    }

    /// Assemble the outbound header set for this identity.
    pub fn header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }

        if let Some(ref hints) = self.hints {
            for (name, value) in [
                ("sec-ch-ua", &hints.sec_ch_ua),
                ("sec-ch-ua-mobile", &hints.sec_ch_ua_mobile),
                ("sec-ch-ua-platform", &hints.sec_ch_ua_platform),
            ] {
                if let Ok(value) = HeaderValue::from_str(value) {
                    headers.insert(HeaderName::from_static(name), value);
                }
            }
        }

        headers
    }
}

/// Version-pinned catalog spanning desktop Chrome/Firefox/Edge/Safari and
/// mobile Chrome/Safari on Android and iOS.
static MODERN_BROWSER_IDENTITIES: Lazy<Vec<ClientIdentity>> = Lazy::new(|| {
    vec![
        // Chrome on Windows
        ClientIdentity::chromium(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
            "Google Chrome",
            130,
            false,
            "Windows",
        ),
        // Firefox on Windows
        ClientIdentity::plain(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:131.0) Gecko/20100101 Firefox/131.0",
        ),
        // Edge on Windows
        ClientIdentity::chromium(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36 Edg/130.0.0.0",
            "Microsoft Edge",
            130,
            false,
            "Windows",
        ),
        // Chrome on macOS
        ClientIdentity::chromium(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
            "Google Chrome",
            130,
            false,
            "macOS",
        ),
        // Safari on macOS
        ClientIdentity::plain(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.0 Safari/605.1.15",
        ),
        // Chrome on macOS, newer OS build
        ClientIdentity::chromium(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
            "Google Chrome",
            130,
            false,
            "macOS",
        ),
        // Chrome on Android
        ClientIdentity::chromium(
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Mobile Safari/537.36",
            "Google Chrome",
            130,
            true,
            "Android",
        ),
        // Chrome on iPhone
        ClientIdentity::chromium(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/130.0.6723.90 Mobile/15E148 Safari/604.1",
            "Google Chrome",
            130,
            true,
            "iOS",
        ),
        // Safari on iPhone
        ClientIdentity::plain(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
        ),
    ]
});

/// Uniform random rotation (with replacement) over an identity catalog.
///
/// The default pool is the built-in catalog; injecting a custom catalog,
/// down to a single entry, makes runs deterministic for testing.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    entries: Vec<ClientIdentity>,
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self {
            entries: MODERN_BROWSER_IDENTITIES.clone(),
        }
    }
}

impl IdentityPool {
    /// Pool over a custom catalog.
    ///
    /// # Panics
    /// Panics if `entries` is empty; selection has no failure mode.
    pub fn new(entries: Vec<ClientIdentity>) -> Self {
        assert!(
            !entries.is_empty(),
            "identity pool requires at least one entry"
        );
        Self { entries }
    }

    /// Draw one identity using the thread-local generator.
    pub fn select(&self) -> &ClientIdentity {
        self.select_with(&mut thread_rng())
    }

    /// Draw one identity from an injected generator (seeded in tests).
    pub fn select_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &ClientIdentity {
        self.entries
            .choose(rng)
            .expect("identity pool is never empty")
    }

    pub fn entries(&self) -> &[ClientIdentity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
