use crate::error::{GitHubMembersError, Result};
use crate::members::MemberKind;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "https://api.github.com/";

#[derive(Debug, Clone)]
pub struct Settings {
    pub github: GitHubConfig,
    pub cache: CacheConfig,
    pub templates: TemplateConfig,
}

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub org: String,
    pub repo: String,
    pub token: Option<String>,
    pub api_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// How many profile lookups enrichment keeps in flight (1 = sequential)
    pub enrich_concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Freshness applied to responses that carry no `max-age`
    pub default_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TemplateConfig {
    pub dir: PathBuf,
    pub collaborators: String,
    pub contributors: String,
}

impl Settings {
    /// Settings for `org/repo` with every other field at its default
    pub fn new(org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            github: GitHubConfig {
                org: org.into(),
                repo: repo.into(),
                token: None,
                api_url: DEFAULT_API_URL.to_string(),
                timeout_secs: 10,
                user_agent: default_user_agent(),
                enrich_concurrency: 1,
            },
            cache: CacheConfig {
                enabled: true,
                dir: default_cache_dir(),
                default_ttl_secs: 60,
            },
            templates: TemplateConfig {
                dir: PathBuf::from("templates"),
                collaborators: "members.html".to_string(),
                contributors: "members.html".to_string(),
            },
        }
    }

    /// Fails unless both the organization and repository are set
    pub fn validate(&self) -> Result<()> {
        if self.github.org.trim().is_empty() {
            return Err(GitHubMembersError::Config(
                "GitHub organization is not set".to_string(),
            ));
        }
        if self.github.repo.trim().is_empty() {
            return Err(GitHubMembersError::Config(
                "GitHub repository is not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Template identifier configured for a membership listing
    pub fn template_for(&self, kind: MemberKind) -> &str {
        match kind {
            MemberKind::Collaborators => &self.templates.collaborators,
            MemberKind::Contributors => &self.templates.contributors,
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "{}/{} (+https://github.com/tyrchen/github-members)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

fn default_cache_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".cache")
        .join("github-members")
        .join("github")
}

pub fn load_settings() -> Result<Settings> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    load_settings_from(|key| std::env::var(key).ok())
}

/// Build settings from an arbitrary variable lookup
pub fn load_settings_from<F>(lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::new("bolt", "bolt");

    // Load GitHub config
    let github = &mut settings.github;
    if let Some(org) = lookup("GITHUB_ORG") {
        github.org = org;
    }
    if let Some(repo) = lookup("GITHUB_REPO") {
        github.repo = repo;
    }
    github.token = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty());
    if let Some(url) = lookup("GITHUB_API_URL") {
        github.api_url = url;
    }
    if let Some(agent) = lookup("GITHUB_USER_AGENT") {
        github.user_agent = agent;
    }
    github.timeout_secs = parse_or(&lookup, "GITHUB_TIMEOUT_SECS", github.timeout_secs)?;
    github.enrich_concurrency = parse_or(
        &lookup,
        "GITHUB_ENRICH_CONCURRENCY",
        github.enrich_concurrency,
    )?;
    if github.enrich_concurrency == 0 {
        return Err(GitHubMembersError::Config(
            "GITHUB_ENRICH_CONCURRENCY must be at least 1".to_string(),
        ));
    }

    // Load cache config
    let cache = &mut settings.cache;
    cache.enabled = parse_or(&lookup, "GITHUB_CACHE", cache.enabled)?;
    if let Some(dir) = lookup("GITHUB_CACHE_DIR") {
        cache.dir = dir.into();
    }
    cache.default_ttl_secs = parse_or(&lookup, "GITHUB_CACHE_TTL_SECS", cache.default_ttl_secs)?;

    // Load template config
    let templates = &mut settings.templates;
    if let Some(dir) = lookup("TEMPLATES_DIR") {
        templates.dir = dir.into();
    }
    if let Some(name) = lookup("TEMPLATE_COLLABORATORS") {
        templates.collaborators = name;
    }
    if let Some(name) = lookup("TEMPLATE_CONTRIBUTORS") {
        templates.contributors = name;
    }

    settings.validate()?;
    Ok(settings)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| GitHubMembersError::Config(format!("Invalid {}", key))),
        None => Ok(default),
    }
}
