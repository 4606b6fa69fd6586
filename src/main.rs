use clap::{Parser, Subcommand};
use github_members::config::load_settings;
use github_members::error::Result;
use github_members::logging::{init_tracing, log_error};
use github_members::render::{TeraRenderer, render_members};
use github_members::{MemberKind, MembershipAggregator};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;

/// Query a GitHub repository's collaborators and contributors
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the repository's collaborators
    Collaborators(ListArgs),
    /// List the repository's contributors
    Contributors(ListArgs),
    /// Show a user's profile
    User { login: String },
    /// Show a user's recent public events
    Events { login: String },
}

#[derive(Debug, clap::Args)]
struct ListArgs {
    /// Replace each member with the full user profile (one request per member)
    #[arg(long)]
    enrich: bool,

    /// Render with the configured template instead of printing JSON
    #[arg(long)]
    render: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize rustls crypto provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error("github-members", &e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    let settings = Arc::new(load_settings()?);
    tracing::debug!(
        org = %settings.github.org,
        repo = %settings.github.repo,
        cache = settings.cache.enabled,
        "Configuration loaded"
    );

    let aggregator = MembershipAggregator::new(settings.clone());

    let output = match command {
        Command::Collaborators(args) => list(&aggregator, MemberKind::Collaborators, args).await?,
        Command::Contributors(args) => list(&aggregator, MemberKind::Contributors, args).await?,
        Command::User { login } => to_json(&aggregator.user_profile(&login).await?)?,
        Command::Events { login } => to_json(&aggregator.user_public_events(&login).await?)?,
    };
    println!("{}", output);

    if let Some(stats) = aggregator.client().await?.cache_stats().await {
        stats.log();
    }
    Ok(())
}

async fn list(aggregator: &MembershipAggregator, kind: MemberKind, args: ListArgs) -> Result<String> {
    let result = aggregator.fetch(kind, args.enrich).await?;
    tracing::info!(
        kind = %kind,
        count = result.members.len(),
        enriched = result.members.is_enriched(),
        "Fetched members"
    );

    if args.render {
        let settings = aggregator.settings();
        let renderer = TeraRenderer::from_dir(&settings.templates.dir)?;
        render_members(&renderer, settings, kind, &result)
    } else {
        to_json(&result)
    }
}

fn to_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
