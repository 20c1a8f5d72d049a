use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use conventional::{validate, ValidationOptions};
use github::{GitHubClient, SourceHost};
use llm::{ProviderCache, ProviderRegistry, TitleGenerator, TitleSuggester};
use orchestrator::{ActionTaken, ProcessingResult, TitleProcessor};

mod config;
mod logging;
mod outputs;

use config::AppConfig;

/// Providers built within one process stay warm for this long.
const PROVIDER_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Parser)]
#[command(name = "prtitle")]
#[command(about = "Checks PR titles against Conventional Commits and proposes fixes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the configured PR and apply the remediation action
    Run {
        /// PR number (defaults to the one derived from the environment)
        #[arg(long)]
        pr: Option<u64>,
    },
    /// Validate a title locally, without credentials or network
    Check {
        /// The title to validate
        title: String,
        /// Require a scope in parentheses
        #[arg(long)]
        require_scope: bool,
        /// Maximum title length
        #[arg(long, default_value_t = 72)]
        max_length: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run { pr: None }) {
        Commands::Run { pr } => run(pr).await,
        Commands::Check {
            title,
            require_scope,
            max_length,
        } => check(&title, require_scope, max_length),
    }
}

async fn run(pr_override: Option<u64>) -> Result<()> {
    let config = AppConfig::from_env()?;
    let pr_number = pr_override
        .or(config.pr_number)
        .ok_or_else(|| anyhow!("No PR number given; pass --pr or set PR_NUMBER"))?;

    let host = Arc::new(GitHubClient::new(
        &config.token,
        &config.repository,
        config.api_base.clone(),
    )?);

    let registry = ProviderRegistry::with_defaults();
    let cache = ProviderCache::new(PROVIDER_CACHE_TTL);
    let provider = cache.get_or_create(&registry, &config.provider)?;
    let suggester = Arc::new(TitleSuggester::new(provider).with_retry_config(config.retry.clone()));

    if !suggester.is_healthy().await {
        warn!(
            "Provider '{}' failed its health probe; continuing anyway",
            config.provider.provider
        );
    }

    info!("Processing PR #{} in {}", pr_number, config.repository);

    let (result, original_title) = match host.get_pr_info(pr_number).await {
        Ok(pr) => {
            let processor = TitleProcessor::new(
                host,
                suggester as Arc<dyn TitleGenerator>,
                config.options.clone(),
            );
            let result = processor.process_pr(&pr).await;
            (result, pr.title)
        }
        Err(e) => (
            ProcessingResult::failure(false, format!("Failed to fetch PR: {e:#}")),
            String::new(),
        ),
    };

    outputs::write_outputs(&result, &original_title)?;
    report(&result);

    if result.action_taken == ActionTaken::Error {
        std::process::exit(1);
    }
    Ok(())
}

fn report(result: &ProcessingResult) {
    match result.action_taken {
        ActionTaken::Skipped => info!("Nothing to do: {}", result.reasoning),
        ActionTaken::Updated => info!("Title updated to '{}'", result.suggestions[0]),
        ActionTaken::Commented => info!("Posted {} suggestion(s) as a comment", result.suggestions.len()),
        ActionTaken::Error => warn!(
            "Processing failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn check(title: &str, require_scope: bool, max_length: usize) -> Result<()> {
    let options = ValidationOptions::default()
        .with_require_scope(require_scope)
        .with_max_length(max_length);
    let result = validate(title, &options);

    if result.is_valid {
        println!("{} title is Conventional Commits compliant", style("✓").green());
        return Ok(());
    }

    println!("{} title is not compliant:", style("✗").red());
    for error in &result.errors {
        println!("  - {error}");
    }
    if !result.suggestions.is_empty() {
        println!("\nSuggested instead:");
        for suggestion in &result.suggestions {
            println!("  {}", style(suggestion).cyan());
        }
    }
    std::process::exit(1);
}
