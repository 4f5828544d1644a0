//! # Schema Retrieval
//!
//! Fetches the JSON Schema named by a document's `$schema` reference with a
//! single HTTP GET.
//!
//! The request policy is fixed by [`FetchConfig`]: a bounded timeout, a
//! bounded number of redirects, and no retries. A transport error, timeout,
//! or non-success status ends the fetch with [`CheckError::SchemaFetch`].
//!
//! Remote `$ref`s inside the fetched schema are resolved during schema
//! compilation by [`RefRetriever`], under the same policy.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::CheckError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default maximum number of redirects followed.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Longest response body excerpt quoted in a fetch error.
const BODY_EXCERPT_LEN: usize = 200;

/// HTTP policy for schema retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Total time allowed for the request, body included.
    pub timeout: Duration,
    /// Redirects followed before giving up. `0` disables redirects.
    pub max_redirects: usize,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: concat!("mcpreg-validate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP client for schema documents.
#[derive(Debug, Clone)]
pub struct SchemaFetcher {
    http: reqwest::Client,
    config: FetchConfig,
}

impl SchemaFetcher {
    /// Build a fetcher with the given policy.
    ///
    /// # Errors
    ///
    /// [`CheckError::SchemaFetch`] if the underlying HTTP client cannot be
    /// constructed (e.g. the TLS backend fails to initialize).
    pub fn new(config: FetchConfig) -> Result<Self, CheckError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(redirect_policy(&config))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(client_init_error)?;

        Ok(Self { http, config })
    }

    /// The policy this fetcher was built with.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch and parse the schema at `reference`.
    ///
    /// # Errors
    ///
    /// [`CheckError::SchemaFetch`] for an unusable URL, a transport failure,
    /// a timeout, or a non-2xx status; [`CheckError::SchemaParse`] when the
    /// body is not JSON.
    pub async fn fetch(&self, reference: &str) -> Result<Value, CheckError> {
        let fetch_error = |reason: String| CheckError::SchemaFetch {
            url: reference.to_string(),
            reason,
        };

        let url = parse_reference(reference)?;

        tracing::debug!(%url, timeout = ?self.config.timeout, "fetching schema");

        let resp = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| fetch_error(describe(&e, &self.config)))?;

        let status = resp.status();
        if resp.url() != &url {
            tracing::warn!(final_url = %resp.url(), "schema request was redirected");
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "schema server returned an error status");
            return Err(fetch_error(format!("HTTP {status}{}", excerpt(&body))));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| fetch_error(describe(&e, &self.config)))?;

        serde_json::from_slice(&body).map_err(|e| CheckError::SchemaParse {
            url: reference.to_string(),
            source: e,
        })
    }

}

/// Blocking resolver for remote `$ref`s, handed to the validator.
///
/// Schema compilation is synchronous and runs outside the pipeline's
/// runtime, so each retrieval uses reqwest's blocking client with the same
/// timeout, redirect bound, and user agent as [`SchemaFetcher`].
#[derive(Debug, Clone, Default)]
pub struct RefRetriever {
    config: FetchConfig,
}

impl RefRetriever {
    /// Build a retriever with the given policy.
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    /// Fetch and parse the schema document at `reference`.
    ///
    /// Must not be called from within an async context.
    ///
    /// # Errors
    ///
    /// The same as [`SchemaFetcher::fetch`].
    pub fn fetch(&self, reference: &str) -> Result<Value, CheckError> {
        let fetch_error = |reason: String| CheckError::SchemaFetch {
            url: reference.to_string(),
            reason,
        };

        let url = parse_reference(reference)?;

        tracing::debug!(%url, timeout = ?self.config.timeout, "retrieving referenced schema");

        let http = reqwest::blocking::Client::builder()
            .timeout(self.config.timeout)
            .redirect(redirect_policy(&self.config))
            .user_agent(self.config.user_agent.clone())
            .build()
            .map_err(client_init_error)?;

        let resp = http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| fetch_error(describe(&e, &self.config)))?;

        let status = resp.status();
        if resp.url() != &url {
            tracing::warn!(final_url = %resp.url(), "referenced schema request was redirected");
        }

        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                %url,
                "referenced schema server returned an error status"
            );
            return Err(fetch_error(format!("HTTP {status}{}", excerpt(&body))));
        }

        let body = resp
            .bytes()
            .map_err(|e| fetch_error(describe(&e, &self.config)))?;

        serde_json::from_slice(&body).map_err(|e| CheckError::SchemaParse {
            url: reference.to_string(),
            source: e,
        })
    }
}

impl jsonschema::Retrieve for RefRetriever {
    fn retrieve(
        &self,
        uri: &jsonschema::Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        self.fetch(uri.as_str()).map_err(|e| match e {
            CheckError::SchemaFetch { reason, .. } => reason.into(),
            CheckError::SchemaParse { source, .. } => format!("invalid JSON: {source}").into(),
            other => other.to_string().into(),
        })
    }
}

/// Parse a schema URL, accepting only `http` and `https`.
fn parse_reference(reference: &str) -> Result<Url, CheckError> {
    let fetch_error = |reason: String| CheckError::SchemaFetch {
        url: reference.to_string(),
        reason,
    };

    let url = Url::parse(reference).map_err(|e| fetch_error(format!("invalid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(fetch_error(format!("unsupported URL scheme '{}'", url.scheme())));
    }
    Ok(url)
}

fn redirect_policy(config: &FetchConfig) -> reqwest::redirect::Policy {
    if config.max_redirects == 0 {
        reqwest::redirect::Policy::none()
    } else {
        reqwest::redirect::Policy::limited(config.max_redirects)
    }
}

fn client_init_error(error: reqwest::Error) -> CheckError {
    CheckError::SchemaFetch {
        url: "client_init".into(),
        reason: error.to_string(),
    }
}

fn describe(error: &reqwest::Error, config: &FetchConfig) -> String {
    if error.is_timeout() {
        format!("request timed out after {}s", config.timeout.as_secs_f64())
    } else if error.is_redirect() {
        format!("too many redirects (limit {})", config.max_redirects)
    } else {
        error.to_string()
    }
}

/// `": <body>"` for a non-empty body, cut at [`BODY_EXCERPT_LEN`] characters.
fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut cut: String = trimmed.chars().take(BODY_EXCERPT_LEN).collect();
    if cut.len() < trimmed.len() {
        cut.push_str("...");
    }
    format!(": {cut}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_ten_second_timeout() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_redirects, 5);
        assert!(config.user_agent.starts_with("mcpreg-validate/"));
    }

    #[test]
    fn excerpt_is_empty_for_blank_body() {
        assert_eq!(excerpt("  \n"), "");
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let body = "x".repeat(500);
        let cut = excerpt(&body);
        assert_eq!(cut.len(), 2 + BODY_EXCERPT_LEN + 3);
        assert!(cut.ends_with("..."));
    }

    #[tokio::test]
    async fn rejects_unparsable_reference() {
        let fetcher = SchemaFetcher::new(FetchConfig::default()).unwrap();
        match fetcher.fetch("not a url").await {
            Err(CheckError::SchemaFetch { url, reason }) => {
                assert_eq!(url, "not a url");
                assert!(reason.starts_with("invalid URL"), "reason: {reason}");
            }
            other => panic!("expected SchemaFetch, got: {other:?}"),
        }
    }

    #[test]
    fn retriever_rejects_non_http_scheme() {
        let retriever = RefRetriever::default();
        let result = retriever.fetch("file:///etc/passwd");
        assert!(
            matches!(&result, Err(CheckError::SchemaFetch { url, reason })
                if url == "file:///etc/passwd" && reason.contains("scheme")),
            "got: {result:?}"
        );
    }

    #[tokio::test]
    async fn rejects_non_http_scheme() {
        let fetcher = SchemaFetcher::new(FetchConfig::default()).unwrap();
        let result = fetcher.fetch("file:///etc/passwd").await;
        assert!(
            matches!(&result, Err(CheckError::SchemaFetch { reason, .. }) if reason.contains("scheme")),
            "got: {result:?}"
        );
    }
}
