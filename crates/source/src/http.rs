//! HTTP client with retry / backoff / error classification.
//!
//! Sources own their base URL and auth headers. They pass a request-building
//! closure to [`FetchClient::request_with_retry`], which runs the retry loop
//! and maps HTTP statuses onto [`SourceError`] variants:
//!
//! | Status            | Outcome                                   |
//! |-------------------|-------------------------------------------|
//! | 2xx               | body parsed as JSON                       |
//! | 401, 403          | `Auth`, no retry                          |
//! | 400               | `Validation`, no retry                    |
//! | other 4xx         | `Upstream`, no retry                      |
//! | 429               | retried, honours `Retry-After` seconds    |
//! | 5xx, network      | retried with exponential backoff          |

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use tracing::warn;

use crate::error::SourceError;

pub(crate) const MAX_RETRIES: u32 = 3;
pub(crate) const USER_AGENT: &str = concat!("fplsnap/", env!("CARGO_PKG_VERSION"));

pub(crate) struct FetchClient {
    http: Client,
    source_name: String,
    error_extractor: fn(&serde_json::Value, u16) -> String,
    backoff_base: Duration,
}

impl FetchClient {
    pub(crate) fn new(
        source_name: &str,
        timeout: Duration,
        error_extractor: fn(&serde_json::Value, u16) -> String,
    ) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            source_name: source_name.to_string(),
            error_extractor,
            backoff_base: Duration::from_secs(1),
        }
    }

    /// First backoff interval; doubles per attempt.
    pub(crate) fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub(crate) fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Make a request with retry + exponential backoff.
    ///
    /// `build_request` is called once per attempt and must return a fully
    /// configured `RequestBuilder` (URL, auth, headers, query params).
    pub(crate) fn request_with_retry(
        &self,
        build_request: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<serde_json::Value, SourceError> {
        let mut backoff = self.backoff_base;

        for attempt in 0..=MAX_RETRIES {
            match build_request(&self.http).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status == 401 || status == 403 {
                        let msg = self.error_message(resp, status);
                        return Err(SourceError::Auth {
                            source_name: self.source_name.clone(),
                            status,
                            message: msg,
                        });
                    }

                    if status == 400 {
                        let msg = self.error_message(resp, status);
                        return Err(SourceError::Validation {
                            source_name: self.source_name.clone(),
                            status,
                            message: msg,
                        });
                    }

                    if (400..500).contains(&status) && status != 429 {
                        let msg = self.error_message(resp, status);
                        return Err(SourceError::upstream(
                            &self.source_name,
                            format!("HTTP {status}: {msg}"),
                        ));
                    }

                    if status == 429 || status >= 500 {
                        if attempt == MAX_RETRIES {
                            return Err(if status == 429 {
                                SourceError::RateLimited {
                                    source_name: self.source_name.clone(),
                                    attempts: MAX_RETRIES,
                                }
                            } else {
                                SourceError::upstream(
                                    &self.source_name,
                                    format!("HTTP {status} after {MAX_RETRIES} attempts"),
                                )
                            });
                        }

                        let wait = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.trim().parse::<u64>().ok())
                                .map(Duration::from_secs)
                                .unwrap_or(backoff)
                        } else {
                            backoff
                        };

                        warn!(
                            source = %self.source_name,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            wait_ms = wait.as_millis() as u64,
                            status,
                            "retrying request"
                        );
                        thread::sleep(wait);
                        backoff *= 2;
                        continue;
                    }

                    // Read as text first; some gateways prefix a BOM
                    let text = resp.text().map_err(|e| {
                        SourceError::upstream(
                            &self.source_name,
                            format!("failed to read response body: {e}"),
                        )
                    })?;
                    let trimmed = text.trim_start_matches('\u{feff}');
                    let body: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
                        SourceError::upstream(
                            &self.source_name,
                            format!(
                                "failed to parse JSON response: {} (body: {})",
                                e,
                                truncate(trimmed, 200),
                            ),
                        )
                    })?;

                    return Ok(body);
                }
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(SourceError::upstream(
                            &self.source_name,
                            format!("{e} (after {MAX_RETRIES} attempts)"),
                        ));
                    }

                    warn!(
                        source = %self.source_name,
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        wait_ms = backoff.as_millis() as u64,
                        error = %e,
                        "retrying request"
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }

        unreachable!()
    }

    fn error_message(&self, resp: reqwest::blocking::Response, status: u16) -> String {
        let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
        (self.error_extractor)(&body, status)
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("Ødegaard", 2), "Ød");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn user_agent_names_tool() {
        assert!(USER_AGENT.starts_with("fplsnap/"));
    }
}
