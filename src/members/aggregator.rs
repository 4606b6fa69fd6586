use crate::config::Settings;
use crate::error::Result;
use crate::github::{ApiClient, Event, MemberSummary, UserApi, UserProfile};
use crate::logging::FetchTimer;
use crate::members::{MemberKind, MembersResult};
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Composite membership queries over one lazily built API client
///
/// The client (and with it the HTTP session and response cache) is created
/// on first use and reused by every later call on this aggregator.
pub struct MembershipAggregator {
    settings: Arc<Settings>,
    client: OnceCell<ApiClient>,
}

impl MembershipAggregator {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the API client, building it on the first call
    pub async fn client(&self) -> Result<&ApiClient> {
        self.client
            .get_or_try_init(|| async { ApiClient::new(&self.settings) })
            .await
    }

    pub async fn fetch_collaborators(&self, enrich: bool) -> Result<MembersResult> {
        self.fetch(MemberKind::Collaborators, enrich).await
    }

    pub async fn fetch_contributors(&self, enrich: bool) -> Result<MembersResult> {
        self.fetch(MemberKind::Contributors, enrich).await
    }

    /// List the configured repository's members, optionally with full profiles
    ///
    /// Enrichment keeps the listing order. If any profile lookup fails the
    /// whole call fails with that error.
    pub async fn fetch(&self, kind: MemberKind, enrich: bool) -> Result<MembersResult> {
        self.settings.validate()?;
        let github = &self.settings.github;
        let mut timer = FetchTimer::start(kind, &github.org, &github.repo, enrich);

        let client = self.client().await?;
        let repo = client.repo();
        let listing = match kind {
            MemberKind::Collaborators => repo.collaborators(&github.org, &github.repo).await?,
            MemberKind::Contributors => repo.contributors(&github.org, &github.repo).await?,
        };

        tracing::debug!(
            org = %github.org,
            repo = %github.repo,
            kind = %kind,
            count = listing.len(),
            enrich = enrich,
            "Fetched member listing"
        );

        if !enrich {
            timer.finish(listing.len());
            return Ok(MembersResult::summaries(listing));
        }

        let profiles = enrich_members(client.user(), listing, github.enrich_concurrency).await?;
        timer.finish(profiles.len());
        Ok(MembersResult::profiles(profiles))
    }

    pub async fn user_profile(&self, login: &str) -> Result<UserProfile> {
        self.client().await?.user().show(login).await
    }

    pub async fn user_public_events(&self, login: &str) -> Result<Vec<Event>> {
        self.client().await?.user().public_events(login).await
    }
}

/// Replace each summary by its profile, at most `concurrency` lookups in flight
async fn enrich_members(
    users: UserApi<'_>,
    listing: Vec<MemberSummary>,
    concurrency: usize,
) -> Result<Vec<UserProfile>> {
    stream::iter(listing)
        .map(move |member| async move {
            users.show(&member.login).await.inspect_err(|e| {
                tracing::warn!(
                    login = %member.login,
                    error = %e,
                    "Profile lookup failed, abandoning enrichment"
                );
            })
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}
