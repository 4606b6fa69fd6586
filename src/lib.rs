pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod members;
pub mod render;

pub use error::{GitHubMembersError, Result};
pub use members::{MemberKind, Members, MembersResult, MembershipAggregator};
