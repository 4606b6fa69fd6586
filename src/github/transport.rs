//! HTTP transport to the GitHub API, optionally behind the response cache

use crate::cache::{
    CacheEntry, CacheStats, FileCacheStore, auth_fingerprint, is_storable, request_key,
};
use crate::config::GitHubConfig;
use crate::error::{GitHubMembersError, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;

/// Media type for the v3 REST API
pub const GITHUB_V3_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// Cache signature: method, URL, `Accept` and the credential in use
    pub fn signature(&self) -> String {
        let accept = self
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(GITHUB_V3_ACCEPT);
        let credential = self
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        request_key(
            self.method.as_str(),
            self.url.as_str(),
            accept,
            &auth_fingerprint(credential),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
    /// Served from the response cache without a full download
    pub from_cache: bool,
}

/// Rate-limit budget reported by GitHub on every response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let number =
            |name: &str| -> Option<u64> { headers.get(name)?.to_str().ok()?.parse().ok() };

        Some(Self {
            limit: number("x-ratelimit-limit")?,
            remaining: number("x-ratelimit-remaining")?,
            reset: number("x-ratelimit-reset")
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }
}

impl ApiResponse {
    fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK),
            headers: entry.header_map(),
            body: entry.body.clone(),
            from_cache: true,
        }
    }

    pub fn rate_limit(&self) -> Option<RateLimit> {
        RateLimit::from_headers(&self.headers)
    }

    /// Turn a non-success status into the matching error
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }

        let message = serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message")?.as_str().map(str::to_string))
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        let rate_limit = self.rate_limit();
        let exhausted = rate_limit.is_some_and(|r| r.remaining == 0);

        Err(match self.status {
            StatusCode::UNAUTHORIZED => GitHubMembersError::Unauthorized(message),
            StatusCode::TOO_MANY_REQUESTS => GitHubMembersError::RateLimited {
                reset: rate_limit.and_then(|r| r.reset),
            },
            StatusCode::FORBIDDEN if exhausted => GitHubMembersError::RateLimited {
                reset: rate_limit.and_then(|r| r.reset),
            },
            status => GitHubMembersError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Plain HTTP access to the API
pub struct DirectTransport {
    http: reqwest::Client,
}

impl DirectTransport {
    /// Build the HTTP client; performs no I/O
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(GITHUB_V3_ACCEPT));

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self { http })
    }

    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        tracing::trace!(
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            "GitHub API response"
        );

        Ok(ApiResponse {
            status,
            headers,
            body,
            from_cache: false,
        })
    }
}

/// Read-through, write-through cache in front of a [`DirectTransport`]
///
/// Only `GET` requests are cached. Store failures are logged and counted,
/// then the request continues as if the cache were empty.
pub struct CachedTransport {
    inner: DirectTransport,
    store: FileCacheStore,
    default_ttl_secs: u64,
    stats: RwLock<CacheStats>,
}

impl CachedTransport {
    pub fn new(inner: DirectTransport, store: FileCacheStore, default_ttl_secs: u64) -> Self {
        tracing::info!(
            dir = %store.dir().display(),
            default_ttl_secs = default_ttl_secs,
            "Enabling GitHub response cache"
        );

        Self {
            inner,
            store,
            default_ttl_secs,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        if request.method != Method::GET {
            return self.fetch(request).await;
        }

        let key = request.signature();
        let cached = match self.store.load(&key).await {
            Ok(entry) => entry,
            Err(e) => {
                self.store_failed("read", &key, &e).await;
                None
            }
        };

        // Fresh entry: no network call at all
        if let Some(entry) = cached.as_ref().filter(|e| e.is_fresh(Utc::now())) {
            self.stats.write().await.hits += 1;
            tracing::debug!(url = %request.url, "Response cache hit");
            return Ok(ApiResponse::from_entry(entry));
        }

        let mut outgoing = request.clone();
        if let Some(entry) = cached.as_ref().filter(|e| e.has_validator()) {
            add_validators(&mut outgoing.headers, entry);
        }

        let response = self.fetch(&outgoing).await?;

        if response.status == StatusCode::NOT_MODIFIED {
            if let Some(mut entry) = cached {
                self.stats.write().await.revalidated += 1;
                tracing::debug!(url = %request.url, "Response cache entry revalidated");

                entry.refresh(&response.headers, Utc::now());
                self.save(&entry).await;
                let mut replay = ApiResponse::from_entry(&entry);
                // Keep the live rate-limit headers
                replay.headers.extend(response.headers);
                return Ok(replay);
            }
        }

        self.stats.write().await.misses += 1;
        tracing::debug!(
            url = %request.url,
            status = response.status.as_u16(),
            "Response cache miss"
        );

        if response.status == StatusCode::OK && is_storable(&response.headers) {
            let entry = CacheEntry::new(
                key,
                response.status.as_u16(),
                &response.headers,
                response.body.clone(),
                Utc::now(),
                self.default_ttl_secs,
            );
            self.save(&entry).await;
        }

        Ok(response)
    }

    async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.stats.write().await.network_calls += 1;
        self.inner.send(request).await
    }

    async fn save(&self, entry: &CacheEntry) {
        if let Err(e) = self.store.save(entry).await {
            self.store_failed("write", &entry.request_key, &e).await;
        }
    }

    async fn store_failed(&self, operation: &str, key: &str, error: &GitHubMembersError) {
        self.stats.write().await.store_errors += 1;
        tracing::warn!(
            operation = %operation,
            key = %key,
            error = %error,
            "Response cache unavailable, continuing without it"
        );
    }
}

fn add_validators(headers: &mut HeaderMap, entry: &CacheEntry) {
    if let Some(value) = entry
        .etag
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
    {
        headers.insert(header::IF_NONE_MATCH, value);
    }
    if let Some(value) = entry
        .last_modified
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
    {
        headers.insert(header::IF_MODIFIED_SINCE, value);
    }
}

/// HTTP transport used by the API client
pub enum Transport {
    Direct(DirectTransport),
    Cached(CachedTransport),
}

impl Transport {
    /// Put the response cache in front of a direct transport
    pub fn with_cache(self, store: FileCacheStore, default_ttl_secs: u64) -> Self {
        match self {
            Transport::Direct(direct) => {
                Transport::Cached(CachedTransport::new(direct, store, default_ttl_secs))
            }
            cached @ Transport::Cached(_) => cached,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Transport::Cached(_))
    }

    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        match self {
            Transport::Direct(direct) => direct.send(request).await,
            Transport::Cached(cached) => cached.send(request).await,
        }
    }

    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match self {
            Transport::Direct(_) => None,
            Transport::Cached(cached) => Some(cached.stats().await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use mockito::Matcher;

    fn direct() -> DirectTransport {
        DirectTransport::new(&Settings::new("acme", "widgets").github).unwrap()
    }

    fn url(server: &mockito::ServerGuard, path: &str) -> Url {
        Url::parse(&format!("{}{}", server.url(), path)).unwrap()
    }

    fn response(status: u16, headers: &[(&'static str, &'static str)], body: &str) -> ApiResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        ApiResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: map,
            body: body.to_string(),
            from_cache: false,
        }
    }

    #[test]
    fn test_error_mapping() {
        let err = response(401, &[], r#"{"message":"Bad credentials"}"#)
            .error_for_status()
            .unwrap_err();
        assert!(matches!(err, GitHubMembersError::Unauthorized(ref m) if m == "Bad credentials"));

        let err = response(
            403,
            &[
                ("x-ratelimit-limit", "60"),
                ("x-ratelimit-remaining", "0"),
                ("x-ratelimit-reset", "1700000000"),
            ],
            r#"{"message":"API rate limit exceeded"}"#,
        )
        .error_for_status()
        .unwrap_err();
        match err {
            GitHubMembersError::RateLimited { reset } => {
                assert_eq!(reset.unwrap().timestamp(), 1_700_000_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Forbidden with budget left is a plain API error
        let err = response(
            403,
            &[("x-ratelimit-limit", "60"), ("x-ratelimit-remaining", "12")],
            r#"{"message":"Must have push access"}"#,
        )
        .error_for_status()
        .unwrap_err();
        assert!(matches!(err, GitHubMembersError::Api { status: 403, .. }));

        let err = response(404, &[], "").error_for_status().unwrap_err();
        assert_eq!(err.to_string(), "GitHub API error (404): Not Found");

        assert!(response(200, &[], "[]").error_for_status().is_ok());
    }

    #[test]
    fn test_signature_depends_on_credentials() {
        let url = Url::parse("https://api.github.com/users/octocat").unwrap();
        let anonymous = ApiRequest::get(url.clone());
        let mut authed = ApiRequest::get(url);
        authed
            .headers
            .insert(header::AUTHORIZATION, HeaderValue::from_static("token abc"));

        assert_eq!(anonymous.signature(), anonymous.clone().signature());
        assert_ne!(anonymous.signature(), authed.signature());
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users/octocat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("cache-control", "private, max-age=60")
            .with_header("etag", "\"v1\"")
            .with_body(r#"{"login":"octocat"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let transport = Transport::Direct(direct()).with_cache(FileCacheStore::new(dir.path()), 60);
        let request = ApiRequest::get(url(&server, "/users/octocat"));

        let first = transport.send(&request).await.unwrap();
        let second = transport.send(&request).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.body, second.body);
        mock.assert_async().await;

        let stats = transport.cache_stats().await.unwrap();
        assert_eq!(stats.network_calls, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_stale_entry_revalidates_with_etag() {
        let mut server = mockito::Server::new_async().await;
        let full = server
            .mock("GET", "/users/octocat")
            .match_header("if-none-match", Matcher::Missing)
            .with_status(200)
            .with_header("cache-control", "private, max-age=0")
            .with_header("etag", "\"v1\"")
            .with_body(r#"{"login":"octocat","name":"The Octocat"}"#)
            .expect(1)
            .create_async()
            .await;
        let conditional = server
            .mock("GET", "/users/octocat")
            .match_header("if-none-match", "\"v1\"")
            .with_status(304)
            .with_header("x-ratelimit-limit", "60")
            .with_header("x-ratelimit-remaining", "59")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let transport = Transport::Direct(direct()).with_cache(FileCacheStore::new(dir.path()), 60);
        let request = ApiRequest::get(url(&server, "/users/octocat"));

        let first = transport.send(&request).await.unwrap();
        let second = transport.send(&request).await.unwrap();

        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(first.body, second.body);
        assert!(second.from_cache);
        assert_eq!(second.rate_limit().unwrap().remaining, 59);
        full.assert_async().await;
        conditional.assert_async().await;

        let stats = transport.cache_stats().await.unwrap();
        assert_eq!(stats.revalidated, 1);
        assert_eq!(stats.network_calls, 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users/ghost")
            .with_status(404)
            .with_header("cache-control", "max-age=60")
            .with_body(r#"{"message":"Not Found"}"#)
            .expect(2)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let transport = Transport::Direct(direct()).with_cache(FileCacheStore::new(dir.path()), 60);
        let request = ApiRequest::get(url(&server, "/users/ghost"));

        for _ in 0..2 {
            let response = transport.send(&request).await.unwrap();
            assert_eq!(response.status, StatusCode::NOT_FOUND);
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users/octocat")
            .with_status(200)
            .with_header("cache-control", "max-age=60")
            .with_body(r#"{"login":"octocat"}"#)
            .expect(2)
            .create_async()
            .await;

        // The cache directory sits below a regular file, so it can never be created
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let transport =
            Transport::Direct(direct()).with_cache(FileCacheStore::new(blocker.join("github")), 60);
        let request = ApiRequest::get(url(&server, "/users/octocat"));

        for _ in 0..2 {
            let response = transport.send(&request).await.unwrap();
            assert_eq!(response.body, r#"{"login":"octocat"}"#);
        }
        mock.assert_async().await;

        let stats = transport.cache_stats().await.unwrap();
        assert_eq!(stats.network_calls, 2);
        assert!(stats.store_errors >= 2);
    }

    #[tokio::test]
    async fn test_direct_transport_has_no_stats() {
        let transport = Transport::Direct(direct());
        assert!(!transport.is_cached());
        assert!(transport.cache_stats().await.is_none());
    }
}
