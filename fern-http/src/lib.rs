//! HTTP client for Mastodon-compatible REST APIs.
//!
//! Wraps `reqwest` with the conventions every fern call site needs:
//! - a base-url anchor plus relative paths
//! - bearer auth with token sanitisation
//! - per-request query params, timeout, and retry budget
//! - retries for network failures and 429/5xx with exponential backoff,
//!   honouring `Retry-After`
//! - capture of the pagination `Link` response header
//!
//! Security: tokens are sanitised up front and never logged; request logs
//! carry only host + path and response metadata.

use std::borrow::Cow;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, LINK, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("client build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// Per-request tuning knobs.
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    /// Query params, e.g. `[("limit", "20".into())]`. Repeat a key for
    /// array-style params (`id[]`).
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

/// A decoded JSON body together with the raw pagination `Link` header.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub body: T,
    pub link: Option<String>,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    bearer: Option<String>,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            bearer: None,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    /// Attach a bearer token sent with every request.
    pub fn with_bearer(mut self, token: &str) -> Result<Self, HttpError> {
        self.bearer = Some(sanitize_token(token)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// GET a JSON resource, discarding pagination headers.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.get_json_linked(path, opts).await.map(|f| f.body)
    }

    /// GET a JSON resource and keep the raw `Link` header, if the server
    /// sent one.
    pub async fn get_json_linked<T>(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<Fetched<T>, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let max_retries = opts.retries.unwrap_or(self.max_retries);

        let mut attempt = 0usize;
        loop {
            let mut rb = self.inner.get(url.clone()).timeout(timeout);
            if let Some(q) = &opts.query {
                let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }
            if let Some(token) = &self.bearer {
                rb = rb.bearer_auth(token);
            }

            tracing::debug!(
                attempt = attempt + 1,
                max_retries,
                host_path = %format!("{}{}", url.domain().unwrap_or("-"), url.path()),
                timeout_ms = timeout.as_millis() as u64,
                authed = self.bearer.is_some(),
                "http.request.start"
            );

            let t0 = std::time::Instant::now();
            let resp = match rb.send().await {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            attempt,
                            backoff_ms = delay.as_millis() as u64,
                            message = %err,
                            "http.retrying.send"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    return Err(HttpError::Network(err.to_string()));
                }
            };

            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = match resp.bytes().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            attempt,
                            backoff_ms = delay.as_millis() as u64,
                            message = %err,
                            "http.retrying.body"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    return Err(HttpError::Network(err.to_string()));
                }
            };

            tracing::debug!(
                %status,
                duration_ms = t0.elapsed().as_millis() as u64,
                body_len = bytes.len(),
                rate_limit.limit = ?header_str(&headers, "x-ratelimit-limit"),
                rate_limit.remaining = ?header_str(&headers, "x-ratelimit-remaining"),
                rate_limit.reset = ?header_str(&headers, "x-ratelimit-reset"),
                "http.response"
            );

            if status.is_success() {
                let link = headers
                    .get(LINK)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let snippet = snip_body(&bytes);
                let body = serde_json::from_slice::<T>(&bytes).map_err(|e| {
                    tracing::warn!(
                        serde_err = %e,
                        body_snippet = %snippet,
                        "http.response.decode_error"
                    );
                    HttpError::Decode(e.to_string(), snippet)
                })?;
                return Ok(Fetched { body, link });
            }

            let message = extract_error_message(&bytes);
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < max_retries {
                attempt += 1;
                let delay = match retry_after_secs(&headers) {
                    Some(secs) => Duration::from_secs(secs),
                    None if status == StatusCode::TOO_MANY_REQUESTS => {
                        // default floor for 429 when no Retry-After is present
                        backoff(attempt).max(Duration::from_millis(1100))
                    }
                    None => backoff(attempt),
                };
                tracing::warn!(
                    %status,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    message = %message,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(%status, message = %message, "http.error");
            return Err(HttpError::Api { status, message });
        }
    }
}

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << (attempt - 1)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .parse()
        .ok()
}

/// Mastodon error bodies are `{"error": "...", "error_description": "..."}`.
fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct ErrBody {
        #[serde(default)]
        error: String,
        #[serde(default)]
        error_description: String,
    }

    if let Ok(e) = serde_json::from_slice::<ErrBody>(body) {
        if !e.error_description.is_empty() {
            return format!("{}: {}", e.error, e.error_description);
        }
        if !e.error.is_empty() {
            return e.error;
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        snip.truncate(500);
        snip.push_str("...");
    }
    snip
}

fn sanitize_token(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("access token contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "access token contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_token(" \"abc def\"\n").unwrap(), "abcdef");
    }

    #[test]
    fn sanitize_rejects_control_chars() {
        assert!(matches!(sanitize_token("ab\x01cd"), Err(HttpError::Build(_))));
    }

    #[test]
    fn error_message_prefers_description() {
        let body = br#"{"error":"invalid_grant","error_description":"expired token"}"#;
        assert_eq!(extract_error_message(body), "invalid_grant: expired token");
    }

    #[test]
    fn error_message_falls_back_to_snippet() {
        assert_eq!(extract_error_message(b"<html>nope</html>"), "<html>nope</html>");
    }
}
