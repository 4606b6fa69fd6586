//! Cache entries and the HTTP freshness rules applied to them

use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderName};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Response headers worth replaying from the cache
const STORED_HEADERS: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::ETAG,
    header::LAST_MODIFIED,
    header::CACHE_CONTROL,
];

/// A stored response plus the metadata needed to judge and revalidate it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Signature of the request this response answers
    pub request_key: String,

    /// HTTP status of the stored response
    pub status: u16,

    /// Replayable subset of the response headers
    pub headers: Vec<(String, String)>,

    /// Response body
    pub body: String,

    /// `ETag` validator, if the server sent one
    pub etag: Option<String>,

    /// `Last-Modified` validator, if the server sent one
    pub last_modified: Option<String>,

    /// When the response was stored or last revalidated
    pub stored_at: DateTime<Utc>,

    /// Seconds after `stored_at` during which the entry is served without asking the server
    pub max_age_secs: u64,
}

impl CacheEntry {
    pub fn new(
        request_key: impl Into<String>,
        status: u16,
        headers: &HeaderMap,
        body: String,
        stored_at: DateTime<Utc>,
        default_ttl_secs: u64,
    ) -> Self {
        Self {
            request_key: request_key.into(),
            status,
            headers: STORED_HEADERS
                .iter()
                .filter_map(|name| {
                    let value = headers.get(name)?.to_str().ok()?;
                    Some((name.as_str().to_string(), value.to_string()))
                })
                .collect(),
            body,
            etag: header_string(headers, header::ETAG),
            last_modified: header_string(headers, header::LAST_MODIFIED),
            stored_at,
            max_age_secs: max_age(headers).unwrap_or(default_ttl_secs),
        }
    }

    /// Check if the entry can be served without contacting the server
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let max_age_ms = i64::try_from(self.max_age_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        now.signed_duration_since(self.stored_at).num_milliseconds() < max_age_ms
    }

    /// Whether a stale entry can be revalidated with a conditional request
    pub fn has_validator(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }

    /// Restart the freshness window after a `304 Not Modified`
    pub fn refresh(&mut self, headers: &HeaderMap, now: DateTime<Utc>) {
        self.stored_at = now;
        if let Some(secs) = max_age(headers) {
            self.max_age_secs = secs;
        }
        if let Some(etag) = header_string(headers, header::ETAG) {
            self.etag = Some(etag);
        }
    }

    /// Rebuild the stored headers as a `HeaderMap`
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                header::HeaderValue::from_str(value),
            ) {
                map.insert(name, value);
            }
        }
        map
    }
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn cache_directives(headers: &HeaderMap) -> impl Iterator<Item = String> + '_ {
    headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|d| d.trim().to_ascii_lowercase())
}

/// `max-age` from `Cache-Control`, if present
pub fn max_age(headers: &HeaderMap) -> Option<u64> {
    cache_directives(headers).find_map(|d| {
        d.strip_prefix("max-age=")
            .and_then(|secs| secs.trim_matches('"').parse().ok())
    })
}

/// A response may be stored unless it says `no-store`
pub fn is_storable(headers: &HeaderMap) -> bool {
    !cache_directives(headers).any(|d| d == "no-store")
}

/// Deterministic signature of a request
///
/// Two requests share an entry only when they agree on method, URL,
/// `Accept` and the identity they authenticate as.
pub fn request_key(method: &str, url: &str, accept: &str, auth: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [method, url, accept, auth] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Identity component of a request key; never contains the token itself
pub fn auth_fingerprint(token: Option<&str>) -> String {
    match token {
        Some(token) => {
            let digest = Sha256::digest(token.as_bytes());
            format!("token:{}", &hex::encode(digest)[..16])
        }
        None => "anonymous".to_string(),
    }
}
