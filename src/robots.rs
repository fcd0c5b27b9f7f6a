//! robots.txt crawl-delay hints.
//!
//! The profiler needs exactly one datum from robots.txt: the crawl delay a
//! site asks polite crawlers to keep, which seeds the baseline spacing.
//! Anything missing, unreachable, or unparseable degrades to "no hint" and
//! the configured default delay applies.

use url::Url;

/// Fetch `<origin>/robots.txt` over the shared session context and return
/// the wildcard-group crawl delay in seconds, if the site declares one.
///
/// Never fails a profiling run: every fetch or parse problem yields `None`.
pub async fn fetch_crawl_delay(client: &reqwest::Client, target: &Url) -> Option<f64> {
    let robots_url = robots_txt_url(target)?;

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(err) => {
            log::debug!("robots.txt fetch failed for {robots_url}: {err}");
            return None;
        }
    };

    if !response.status().is_success() {
        log::debug!("robots.txt at {robots_url} answered {}", response.status());
        return None;
    }

    let body = response.text().await.ok()?;
    parse_crawl_delay(&body, "*")
}

/// Extract the crawl delay that applies to `user_agent`.
///
/// A group naming the agent specifically wins over the `*` group. Values
/// must parse as finite, non-negative seconds; zero is a legitimate hint.
pub fn parse_crawl_delay(robots_txt: &str, user_agent: &str) -> Option<f64> {
    let ua_lower = user_agent.to_lowercase();
    let mut in_matching_group = false;
    let mut group_is_specific = false;
    let mut wildcard_delay = None;
    let mut specific_delay = None;

    for line in robots_txt.lines() {
        // Strip inline comments before interpreting the line.
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                let ua = value.to_lowercase();
                group_is_specific = ua != "*" && ua == ua_lower;
                in_matching_group = ua == "*" || group_is_specific;
            }
            "crawl-delay" if in_matching_group => {
                let parsed = value
                    .parse::<f64>()
                    .ok()
                    .filter(|delay| delay.is_finite() && *delay >= 0.0);
                if let Some(delay) = parsed {
                    if group_is_specific {
                        specific_delay = Some(delay);
                    } else {
                        wildcard_delay = Some(delay);
                    }
                }
            }
            _ => {}
        }
    }

    specific_delay.or(wildcard_delay)
}

fn robots_txt_url(target: &Url) -> Option<Url> {
    if !matches!(target.scheme(), "http" | "https") {
        return None;
    }
    target.join("/robots.txt").ok()
}
