//! GitHub REST API access
//!
//! `ApiClient` owns the HTTP session and hands out resource-scoped views
//! (`repo()`, `user()`). Requests go through a [`Transport`], which is either
//! a direct connection or the same connection behind the response cache.

mod api;
mod client;
mod transport;
mod types;

pub use api::{RepoApi, UserApi, validate_login};
pub use client::{ApiClient, Authentication};
pub use transport::{
    ApiRequest, ApiResponse, CachedTransport, DirectTransport, GITHUB_V3_ACCEPT, RateLimit,
    Transport,
};
pub use types::{Event, MemberSummary, UserProfile};
