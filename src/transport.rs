use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{COOKIE, LOCATION, USER_AGENT};
use url::Url;

use crate::config::Credentials;

const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Sleep before the 1-based `attempt`. The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(31);
        self.backoff_base
            .saturating_mul(1_u32 << exponent)
            .min(self.backoff_max)
    }

    fn should_retry_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Cookie-bearing GET client that hides transient failures from its callers.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::blocking::Client,
    policy: RetryPolicy,
}

impl Transport {
    pub fn new(policy: RetryPolicy) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            policy: RetryPolicy {
                max_attempts: policy.max_attempts.max(1),
                ..policy
            },
        })
    }

    /// Issues `GET url` until it yields a non-retryable answer or the attempt
    /// budget is spent. The last response is returned even if it is not 2xx; an
    /// error is returned only when the final attempt never got a response.
    pub fn fetch(&self, url: &str, credentials: &Credentials) -> anyhow::Result<Response> {
        let mut attempt = 1;
        loop {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            let last_attempt = attempt >= self.policy.max_attempts;
            match self.send_once(url, credentials) {
                Ok(response) => {
                    if last_attempt || !RetryPolicy::should_retry_status(response.status) {
                        return Ok(response);
                    }
                    tracing::debug!(%url, attempt, status = response.status, "retryable status");
                }
                Err(err) => {
                    if last_attempt {
                        return Err(err).with_context(|| {
                            format!("GET {url} failed after {attempt} attempts")
                        });
                    }
                    tracing::debug!(%url, attempt, ?err, "request failed; retrying");
                }
            }
            attempt += 1;
        }
    }

    /// One logical request. Redirects are followed here rather than by reqwest,
    /// which strips `Cookie` when a hop changes host.
    fn send_once(&self, url: &str, credentials: &Credentials) -> anyhow::Result<Response> {
        let mut current = Url::parse(url).with_context(|| format!("parse url: {url}"))?;
        let mut hops = 0;
        loop {
            let mut request = self
                .client
                .get(current.clone())
                .header(USER_AGENT, concat!("spinegrab/", env!("CARGO_PKG_VERSION")));
            if !credentials.is_empty() {
                request = request.header(COOKIE, credentials.cookie_header());
            }

            let response = request.send().with_context(|| format!("GET {current}"))?;
            if response.status().is_redirection()
                && let Some(location) = response.headers().get(LOCATION)
            {
                if hops >= MAX_REDIRECTS {
                    anyhow::bail!("GET {url}: more than {MAX_REDIRECTS} redirects");
                }
                let location = location
                    .to_str()
                    .with_context(|| format!("GET {current}: non-ascii Location header"))?;
                let next = current
                    .join(location)
                    .with_context(|| format!("GET {current}: bad Location {location}"))?;
                tracing::debug!(from = %current, to = %next, "following redirect");
                current = next;
                hops += 1;
                continue;
            }

            let status = response.status().as_u16();
            let bytes = response
                .bytes()
                .with_context(|| format!("read body: {current}"))?
                .to_vec();
            return Ok(Response { status, bytes });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(5),
        };
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(1));
        assert_eq!(policy.delay_before(3), Duration::from_secs(2));
        assert_eq!(policy.delay_before(4), Duration::from_secs(4));
        assert_eq!(policy.delay_before(5), Duration::from_secs(5));
        assert_eq!(policy.delay_before(40), Duration::from_secs(5));
    }

    #[test]
    fn not_found_is_not_retryable() {
        assert!(!RetryPolicy::should_retry_status(404));
        assert!(!RetryPolicy::should_retry_status(200));
        assert!(RetryPolicy::should_retry_status(503));
    }

    #[test]
    fn response_success_range() {
        let ok = Response {
            status: 204,
            bytes: Vec::new(),
        };
        let missing = Response {
            status: 404,
            bytes: b"gone".to_vec(),
        };
        assert!(ok.is_success());
        assert!(!missing.is_success());
        assert_eq!(missing.text(), "gone");
    }
}
