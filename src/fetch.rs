//! Retry-wrapped section retrieval against the filing-extraction service.
//!
//! The extraction service resolves one disclosure item of one filing into
//! text. Two outcomes are ordinary: the section text, or a 404 meaning the
//! filing simply does not contain that item — the latter is terminal and is
//! never retried. Rate limiting (429), server errors, and transport failures
//! are retried with exponential backoff under a bounded attempt budget; any
//! other status fails immediately.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::IngestError;

/// Output format requested from the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionFormat {
    /// Plain-text extraction.
    Text,
    /// Raw HTML extraction.
    Html,
}

impl SectionFormat {
    fn as_query_value(self) -> &'static str {
        match self {
            SectionFormat::Text => "text",
            SectionFormat::Html => "html",
        }
    }
}

/// Result of fetching one disclosure item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    /// The extracted section text.
    Section(String),
    /// The filing does not contain this item; expected, not an error.
    NotFound,
}

/// Retry budget and backoff policy for section fetches.
///
/// The per-request timeout doubles as the pipeline's only cancellation
/// boundary: no orchestration-level timeout exists above it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up (first try included).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
    /// Timeout applied to each individual request.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        exp.min(self.max_delay)
    }
}

/// HTTP client for the section-extraction service.
#[derive(Debug, Clone)]
pub struct SectionClient {
    http: Client,
    base_url: Url,
    api_key: String,
    retry: RetryPolicy,
}

impl SectionClient {
    /// Build a client for the extraction endpoint at `base_url`.
    pub fn new(
        base_url: Url,
        api_key: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self, IngestError> {
        let http = Client::builder()
            .timeout(retry.request_timeout)
            .build()
            .map_err(|err| IngestError::InvalidEnv {
                key: "SECTION_API_URL".into(),
                message: format!("unable to build HTTP client: {err}"),
            })?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            retry,
        })
    }

    /// Fetch the text of one disclosure item from `link`.
    ///
    /// `item` is the dash-form label (`"1-1"`). Missing items resolve to
    /// [`SectionOutcome::NotFound`]; transient failures are retried per the
    /// configured [`RetryPolicy`]; everything else propagates as an error
    /// scoped to this single item.
    #[instrument(skip(self))]
    pub async fn fetch_section(
        &self,
        link: &str,
        item: &str,
        format: SectionFormat,
    ) -> Result<SectionOutcome, IngestError> {
        let mut attempt = 0u32;
        loop {
            let request = self
                .http
                .get(self.base_url.clone())
                .query(&[
                    ("url", link),
                    ("item", item),
                    ("type", format.as_query_value()),
                    ("token", self.api_key.as_str()),
                ]);

            let transient = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_FOUND {
                        debug!(item, link, "section not present in filing");
                        return Ok(SectionOutcome::NotFound);
                    }
                    if status.is_success() {
                        let body = response.text().await.map_err(|err| {
                            IngestError::FetchExhausted {
                                item: item.to_string(),
                                link: link.to_string(),
                                attempts: attempt + 1,
                                message: format!("body read failed: {err}"),
                            }
                        })?;
                        return Ok(SectionOutcome::Section(body));
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        format!("status {status}")
                    } else {
                        return Err(IngestError::FetchStatus {
                            status: status.as_u16(),
                            item: item.to_string(),
                            link: link.to_string(),
                        });
                    }
                }
                Err(err) => err.to_string(),
            };

            attempt += 1;
            if attempt >= self.retry.max_attempts {
                return Err(IngestError::FetchExhausted {
                    item: item.to_string(),
                    link: link.to_string(),
                    attempts: attempt,
                    message: transient,
                });
            }

            let delay = self.retry.backoff(attempt - 1);
            warn!(
                item,
                link,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %transient,
                "transient section fetch failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn client_for(server: &MockServer, attempts: u32) -> SectionClient {
        let base = Url::parse(&server.url("/extractor")).unwrap();
        SectionClient::new(base, "test-token", fast_policy(attempts)).unwrap()
    }

    #[tokio::test]
    async fn success_returns_section_text() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/extractor")
                .query_param("item", "1-1")
                .query_param("type", "text")
                .query_param("token", "test-token");
            then.status(200).body("Material agreement signed");
        });

        let client = client_for(&server, 3);
        let outcome = client
            .fetch_section("https://example.com/f", "1-1", SectionFormat::Text)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SectionOutcome::Section("Material agreement signed".into())
        );
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn not_found_is_terminal_and_never_retried() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/extractor").query_param("item", "9-1");
            then.status(404);
        });

        let client = client_for(&server, 4);
        let outcome = client
            .fetch_section("https://example.com/f", "9-1", SectionFormat::Text)
            .await
            .unwrap();

        assert_eq!(outcome, SectionOutcome::NotFound);
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_the_budget_runs_out() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/extractor");
            then.status(503);
        });

        let client = client_for(&server, 3);
        let err = client
            .fetch_section("https://example.com/f", "1-1", SectionFormat::Text)
            .await
            .unwrap_err();

        match err {
            IngestError::FetchExhausted { attempts, item, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(item, "1-1");
            }
            other => panic!("expected FetchExhausted, got {other:?}"),
        }
        mock.assert_hits(3);
    }

    #[tokio::test]
    async fn rate_limit_responses_are_retried() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/extractor");
            then.status(429);
        });

        let client = client_for(&server, 2);
        let err = client
            .fetch_section("https://example.com/f", "2-2", SectionFormat::Text)
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::FetchExhausted { .. }));
        mock.assert_hits(2);
    }

    #[tokio::test]
    async fn client_errors_fail_immediately() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/extractor");
            then.status(403);
        });

        let client = client_for(&server, 5);
        let err = client
            .fetch_section("https://example.com/f", "1-1", SectionFormat::Text)
            .await
            .unwrap_err();

        match err {
            IngestError::FetchStatus { status, .. } => assert_eq!(status, 403),
            other => panic!("expected FetchStatus, got {other:?}"),
        }
        mock.assert_hits(1);
    }

    #[test]
    fn backoff_is_bounded_by_max_delay() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            request_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(350));
        assert_eq!(policy.backoff(9), Duration::from_millis(350));
    }
}
