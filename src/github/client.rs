use crate::cache::{CacheStats, FileCacheStore};
use crate::config::Settings;
use crate::error::{GitHubMembersError, Result};
use crate::github::api::{RepoApi, UserApi};
use crate::github::transport::{ApiRequest, DirectTransport, Transport};
use reqwest::Url;
use reqwest::header::{self, HeaderValue};
use serde::de::DeserializeOwned;

/// Who requests are made as
#[derive(Clone)]
pub enum Authentication {
    Anonymous,
    /// Prepared `Authorization` header for a personal access token
    Token(HeaderValue),
}

impl std::fmt::Debug for Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authentication::Anonymous => f.write_str("Anonymous"),
            Authentication::Token(_) => f.write_str("Token(<redacted>)"),
        }
    }
}

/// Client for the GitHub REST API
///
/// Holds one HTTP session, the optional response cache and the credentials.
/// Building a client never touches the network.
pub struct ApiClient {
    base_url: Url,
    transport: Transport,
    auth: Authentication,
}

impl ApiClient {
    /// Build a client from settings: connection options first, then the
    /// response cache, then the token
    pub fn new(settings: &Settings) -> Result<Self> {
        let base_url = Url::parse(&settings.github.api_url).map_err(|e| {
            GitHubMembersError::Config(format!(
                "Invalid GITHUB_API_URL {:?}: {}",
                settings.github.api_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GitHubMembersError::Config(format!(
                "GITHUB_API_URL {:?} cannot be used as a base URL",
                settings.github.api_url
            )));
        }

        let mut transport = Transport::Direct(DirectTransport::new(&settings.github)?);

        if settings.cache.enabled {
            transport = transport.with_cache(
                FileCacheStore::new(&settings.cache.dir),
                settings.cache.default_ttl_secs,
            );
        }

        let mut client = Self {
            base_url,
            transport,
            auth: Authentication::Anonymous,
        };

        if let Some(token) = &settings.github.token {
            client.authenticate(token)?;
        }

        tracing::info!(
            api_url = %client.base_url,
            cached = client.transport.is_cached(),
            authenticated = client.is_authenticated(),
            "GitHub API client created"
        );

        Ok(client)
    }

    fn authenticate(&mut self, token: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("token {}", token)).map_err(|_| {
            GitHubMembersError::Config("GITHUB_TOKEN contains invalid characters".to_string())
        })?;
        value.set_sensitive(true);
        self.auth = Authentication::Token(value);
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, Authentication::Token(_))
    }

    pub fn authentication(&self) -> &Authentication {
        &self.auth
    }

    /// Repository-scoped operations
    pub fn repo(&self) -> RepoApi<'_> {
        RepoApi::new(self)
    }

    /// User-scoped operations
    pub fn user(&self) -> UserApi<'_> {
        UserApi::new(self)
    }

    /// Cache statistics, `None` when caching is disabled
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        self.transport.cache_stats().await
    }

    /// Resolve an endpoint below the API root; each segment is percent-encoded
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GitHubMembersError::Internal("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET` an endpoint and decode its JSON body
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let mut request = ApiRequest::get(url);
        if let Authentication::Token(value) = &self.auth {
            request.headers.insert(header::AUTHORIZATION, value.clone());
        }

        let response = self.transport.send(&request).await?;

        if let Some(limit) = response.rate_limit() {
            tracing::debug!(
                url = %request.url,
                limit = limit.limit,
                remaining = limit.remaining,
                "GitHub rate limit"
            );
        }

        response.error_for_status()?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(api_url: &str) -> Settings {
        let mut settings = Settings::new("acme", "widgets");
        settings.github.api_url = api_url.to_string();
        settings.cache.enabled = false;
        settings
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = ApiClient::new(&settings("https://api.github.com/")).unwrap();
        let url = client
            .endpoint(&["repos", "acme", "widgets", "collaborators"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/widgets/collaborators"
        );

        let url = client.endpoint(&["repos", "a b", "c/d"]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/a%20b/c%2Fd");
    }

    #[test]
    fn test_endpoint_under_path_prefix() {
        let client = ApiClient::new(&settings("https://ghe.example.com/api/v3")).unwrap();
        let url = client.endpoint(&["users", "octocat"]).unwrap();
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/users/octocat");
    }

    #[test]
    fn test_invalid_api_url() {
        let err = ApiClient::new(&settings("not a url")).err().unwrap();
        assert!(matches!(err, GitHubMembersError::Config(_)));

        let err = ApiClient::new(&settings("mailto:octocat@example.com"))
            .err()
            .unwrap();
        assert!(matches!(err, GitHubMembersError::Config(_)));
    }

    #[test]
    fn test_construction_order() {
        let mut with_everything = settings("https://api.github.com/");
        with_everything.cache.enabled = true;
        with_everything.github.token = Some("ghp_secret".to_string());

        let client = ApiClient::new(&with_everything).unwrap();
        assert!(client.transport.is_cached());
        assert!(client.is_authenticated());
        assert_eq!(format!("{:?}", client.authentication()), "Token(<redacted>)");

        let client = ApiClient::new(&settings("https://api.github.com/")).unwrap();
        assert!(!client.transport.is_cached());
        assert!(!client.is_authenticated());
    }
}
