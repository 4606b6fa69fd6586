//! Durable response cache for GitHub API requests
//!
//! Responses are stored on disk, one JSON document per request signature,
//! and mirrored in memory for the lifetime of the store. The cache keeps
//! what GitHub says about freshness (`Cache-Control: max-age`) and the
//! validators (`ETag`, `Last-Modified`) needed to revalidate a stale entry
//! with a conditional request, which GitHub does not count against the
//! rate limit when it answers `304 Not Modified`.
//!
//! Nothing here is fatal: callers treat every store error as a cache miss.

mod entry;
mod stats;
mod store;

pub use entry::{CacheEntry, auth_fingerprint, is_storable, max_age, request_key};
pub use stats::CacheStats;
pub use store::FileCacheStore;
