//! Logging utilities for structured tracing

use crate::error::GitHubMembersError;
use crate::members::MemberKind;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; logs go to stderr so stdout stays clean for output
///
/// `RUST_LOG` overrides the default filter. `json` switches to one JSON
/// object per line.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("github_members=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Times one membership fetch and logs its outcome on drop
///
/// A fetch that returns early through `?` never calls [`FetchTimer::finish`]
/// and is logged as failed.
pub struct FetchTimer {
    start: Instant,
    kind: MemberKind,
    repository: String,
    enrich: bool,
    members: Option<usize>,
}

impl FetchTimer {
    pub fn start(kind: MemberKind, org: &str, repo: &str, enrich: bool) -> Self {
        Self {
            start: Instant::now(),
            kind,
            repository: format!("{}/{}", org, repo),
            enrich,
            members: None,
        }
    }

    /// Record how many members the fetch returned
    pub fn finish(&mut self, members: usize) {
        self.members = Some(members);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for FetchTimer {
    fn drop(&mut self) {
        match self.members {
            Some(members) => tracing::info!(
                kind = %self.kind,
                repository = %self.repository,
                enrich = self.enrich,
                members,
                duration_ms = self.elapsed_ms(),
                "Membership fetch completed"
            ),
            None => tracing::debug!(
                kind = %self.kind,
                repository = %self.repository,
                enrich = self.enrich,
                duration_ms = self.elapsed_ms(),
                "Membership fetch failed"
            ),
        }
    }
}

/// Log a failed command with its error class
pub fn log_error(command: &str, error: &GitHubMembersError) {
    tracing::error!(
        command = %command,
        error = %error,
        error_kind = error.kind(),
        "Command failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fetch_timer_tracks_duration() {
        let mut timer = FetchTimer::start(MemberKind::Contributors, "acme", "widgets", false);
        thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10);
        assert_eq!(timer.repository, "acme/widgets");

        timer.finish(2);
        assert_eq!(timer.members, Some(2));
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(false);
        init_tracing(true);
    }
}
