use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubMembersError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid GitHub login: {0:?}")]
    InvalidLogin(String),

    #[error("GitHub rejected the credentials: {0}")]
    Unauthorized(String),

    #[error("GitHub API rate limit exceeded{}", format_reset(.reset))]
    RateLimited { reset: Option<DateTime<Utc>> },

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_reset(reset: &Option<DateTime<Utc>>) -> String {
    match reset {
        Some(at) => format!(", resets at {}", at.to_rfc3339()),
        None => String::new(),
    }
}

impl From<tera::Error> for GitHubMembersError {
    fn from(err: tera::Error) -> Self {
        // tera keeps the useful part of the message in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        Self::Template(message)
    }
}

impl GitHubMembersError {
    /// Short stable name of the failure class, for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::InvalidLogin(_) => "invalid_login",
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::Api { .. } => "api",
            Self::Http(_) => "http",
            Self::Io(_) => "io",
            Self::Serde(_) => "serde",
            Self::Template(_) => "template",
            Self::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, GitHubMembersError>;
