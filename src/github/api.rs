//! Resource-scoped views of the API client

use crate::error::{GitHubMembersError, Result};
use crate::github::ApiClient;
use crate::github::types::{Event, MemberSummary, UserProfile};

/// Reject logins that cannot name a user path segment
///
/// GitHub's own login rules vary (`[bot]` app accounts, `_shortcode` managed
/// users), so anything else is accepted and percent-encoded by the endpoint
/// builder.
pub fn validate_login(login: &str) -> Result<()> {
    if login.trim().is_empty() || login == "." || login == ".." {
        return Err(GitHubMembersError::InvalidLogin(login.to_string()));
    }
    Ok(())
}

/// Repository operations (`/repos/{org}/{repo}/...`)
#[derive(Clone, Copy)]
pub struct RepoApi<'a> {
    client: &'a ApiClient,
}

impl<'a> RepoApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Users with direct access to the repository, first page only
    pub async fn collaborators(&self, org: &str, repo: &str) -> Result<Vec<MemberSummary>> {
        let url = self
            .client
            .endpoint(&["repos", org, repo, "collaborators"])?;
        self.client.get_json(url).await
    }

    /// Commit authors with their contribution counts, first page only
    pub async fn contributors(&self, org: &str, repo: &str) -> Result<Vec<MemberSummary>> {
        let url = self.client.endpoint(&["repos", org, repo, "contributors"])?;
        self.client.get_json(url).await
    }
}

/// User operations (`/users/{login}/...`)
#[derive(Clone, Copy)]
pub struct UserApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UserApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Full profile of a user
    pub async fn show(&self, login: &str) -> Result<UserProfile> {
        validate_login(login)?;
        let url = self.client.endpoint(&["users", login])?;
        self.client.get_json(url).await
    }

    /// Recent public events, newest first
    pub async fn public_events(&self, login: &str) -> Result<Vec<Event>> {
        validate_login(login)?;
        let url = self.client.endpoint(&["users", login, "events", "public"])?;
        self.client.get_json(url).await
    }
}
