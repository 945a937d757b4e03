mod ai;
mod config;
mod github;
mod http;
mod prompt;
mod review;
#[cfg(test)]
mod test_support;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::ai::{AiBackend, GeminiBackend, OpenAiBackend};
use crate::config::{AiFailurePolicy, Config, FileConfig, HostingSettings};
use crate::github::{GitHubClient, HostingApi};
use crate::review::{Backends, Completion, ReviewError, RunOptions};

/// PR Reviewer: fetches the changes of a GitHub Pull Request, asks an AI
/// backend to review them and posts the answer as a PR comment.
///
/// Credentials and the target PR come from the environment:
/// GITHUB_TOKEN, GOOGLE_API_KEY, OPENAI_API_KEY (optional),
/// GITHUB_REPOSITORY (owner/name) and PR_NUMBER.
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to .pr-reviewer.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// What to do when the primary AI backend fails and no fallback is configured
    #[arg(long, value_enum)]
    ai_failure_policy: Option<AiFailurePolicy>,

    /// Generate the review and print it instead of posting it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let completion = review_pull_request(&cli).await;
    review::print_summary(&completion);
    completion.exit_code()
}

async fn review_pull_request(cli: &Cli) -> Completion {
    info!("loading configuration");
    let file = match FileConfig::load(cli.config.as_deref()) {
        Ok(file) => file,
        Err(e) => {
            // The file is optional; reporting still works from the environment alone.
            return report_setup_failure(&FileConfig::default(), e.into()).await;
        }
    };

    let mut config = match Config::from_env(&file) {
        Ok(config) => config,
        Err(e) => return report_setup_failure(&file, e.into()).await,
    };
    if let Some(policy) = cli.ai_failure_policy {
        config.ai_failure_policy = policy;
    }
    debug!(?config, "resolved configuration");

    let client = match http::build_client() {
        Ok(client) => client,
        Err(e) => return review::fail(None, e.into()).await,
    };

    let pr = &config.hosting.pull_request;
    let _span = info_span!("pr_review", pr = %pr).entered();

    let hosting = GitHubClient::new(client.clone(), &config.hosting.api_url, &config.hosting.token);
    let primary = GeminiBackend::new(client.clone(), config.primary.clone());
    let secondary = config
        .secondary
        .clone()
        .map(|settings| OpenAiBackend::new(client.clone(), settings));
    let backends = Backends {
        primary: &primary,
        secondary: secondary.as_ref().map(|b| b as &dyn AiBackend),
    };
    info!(
        primary = primary.name(),
        fallback = backends.secondary.map(|b| b.name()).unwrap_or("none"),
        policy = ?config.ai_failure_policy,
        "reviewing pull request"
    );

    let options = RunOptions {
        ai_failure_policy: config.ai_failure_policy,
        dry_run: cli.dry_run,
    };
    review::execute(pr, &hosting, &backends, &options).await
}

/// Report a failure that happened before the full configuration was available.
///
/// A manual-review comment is still posted when the GitHub settings alone resolve.
async fn report_setup_failure(file: &FileConfig, error: ReviewError) -> Completion {
    let hosting = match HostingSettings::resolve(file, config::env_lookup) {
        Ok(hosting) => hosting,
        Err(e) => {
            debug!(error = %e, "cannot resolve GitHub settings for the failure comment");
            return review::fail(None, error).await;
        }
    };
    let client = match http::build_client() {
        Ok(client) => client,
        Err(e) => {
            debug!(error = %e, "cannot build HTTP client for the failure comment");
            return review::fail(None, error).await;
        }
    };

    let github = GitHubClient::new(client, &hosting.api_url, &hosting.token);
    review::fail(Some((&github as &dyn HostingApi, &hosting.pull_request)), error).await
}
