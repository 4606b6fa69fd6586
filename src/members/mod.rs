//! Repository membership queries
//!
//! The aggregator lists a repository's collaborators or contributors and can
//! enrich every listed member with the full user profile. Enrichment costs one
//! extra request per member; GitHub has no batch endpoint for it.

mod aggregator;

pub use aggregator::MembershipAggregator;

use crate::github::{MemberSummary, UserProfile};
use serde::Serialize;
use std::fmt;

/// Which membership listing to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Collaborators,
    Contributors,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Collaborators => "collaborators",
            MemberKind::Contributors => "contributors",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Members in the order GitHub listed them, either all summaries or all profiles
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Members {
    Summaries(Vec<MemberSummary>),
    Profiles(Vec<UserProfile>),
}

impl Members {
    pub fn len(&self) -> usize {
        match self {
            Members::Summaries(list) => list.len(),
            Members::Profiles(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self, Members::Profiles(_))
    }

    pub fn logins(&self) -> Vec<&str> {
        match self {
            Members::Summaries(list) => list.iter().map(|m| m.login.as_str()).collect(),
            Members::Profiles(list) => list.iter().map(|m| m.login.as_str()).collect(),
        }
    }
}

/// Context handed to the render bridge: `{"members": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MembersResult {
    pub members: Members,
}

impl MembersResult {
    pub fn summaries(members: Vec<MemberSummary>) -> Self {
        Self {
            members: Members::Summaries(members),
        }
    }

    pub fn profiles(members: Vec<UserProfile>) -> Self {
        Self {
            members: Members::Profiles(members),
        }
    }
}
