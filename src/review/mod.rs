pub mod types;

pub use types::{Completion, ReviewResult, RunOutcome, APPROVAL_MESSAGE};
#[cfg(test)]
pub use types::PLACEHOLDER_MESSAGE;

use colored::Colorize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::ai::{AiBackend, AiError};
use crate::config::{AiFailurePolicy, ConfigError};
use crate::github::{HostingApi, HostingError, PullRequestRef};
use crate::http::DependencyError;
use crate::prompt;

/// Replies that are swapped for `APPROVAL_MESSAGE`, compared case-insensitively.
const SHORT_APPROVALS: &[&str] = &["lgtm", "lgtm!", "looks good"];

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("dependency unavailable: {0}")]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Hosting(#[from] HostingError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("all AI backends failed. Primary: {primary}. Secondary: {secondary}")]
    AiBackends { primary: AiError, secondary: AiError },
}

/// The AI backends available to a run, in the order they are tried.
pub struct Backends<'a> {
    pub primary: &'a dyn AiBackend,
    pub secondary: Option<&'a dyn AiBackend>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub ai_failure_policy: AiFailurePolicy,
    /// Print the review instead of posting it
    pub dry_run: bool,
}

/// Replace short affirmative replies with the canned approval. Anything else is returned as is.
pub fn normalize_reply(text: &str) -> &str {
    let lower = text.trim().to_lowercase();
    if SHORT_APPROVALS.contains(&lower.as_str()) {
        APPROVAL_MESSAGE
    } else {
        text
    }
}

fn into_result(backend: &str, text: String) -> ReviewResult {
    if normalize_reply(&text) == APPROVAL_MESSAGE && text != APPROVAL_MESSAGE {
        ReviewResult::Approved {
            backend: backend.to_string(),
        }
    } else {
        ReviewResult::Generated {
            backend: backend.to_string(),
            text,
        }
    }
}

/// Ask the primary backend for a review, falling back to the secondary one on any failure.
///
/// Without a secondary backend, a primary failure either degrades to the
/// placeholder or is returned, depending on `policy`. Both backends failing is
/// always an error naming both failures.
pub async fn generate_review(
    prompt: &str,
    backends: &Backends<'_>,
    policy: AiFailurePolicy,
) -> Result<ReviewResult, ReviewError> {
    let primary = backends.primary;
    let primary_err = match primary.generate(prompt).await {
        Ok(text) => return Ok(into_result(primary.name(), text)),
        Err(e) => e,
    };

    if primary_err.is_quota() {
        warn!(backend = primary.name(), error = %primary_err, "primary backend quota exhausted");
    } else {
        warn!(backend = primary.name(), error = %primary_err, "primary backend failed");
    }

    let Some(secondary) = backends.secondary else {
        return match policy {
            AiFailurePolicy::Degrade => {
                warn!("no fallback backend configured, posting placeholder review");
                Ok(ReviewResult::Placeholder {
                    reason: primary_err.to_string(),
                })
            }
            AiFailurePolicy::Fatal => Err(ReviewError::Ai(primary_err)),
        };
    };

    info!(backend = secondary.name(), "retrying with fallback backend");
    match secondary.generate(prompt).await {
        Ok(text) => Ok(into_result(secondary.name(), text)),
        Err(secondary_err) => Err(ReviewError::AiBackends {
            primary: primary_err,
            secondary: secondary_err,
        }),
    }
}

/// Fetch the changed files, generate a review and post it.
///
/// Returns early with `RunOutcome::NoChanges` when no file carries a patch,
/// before any AI or write call.
#[instrument(skip_all, fields(pr = %pr))]
pub async fn run(
    pr: &PullRequestRef,
    hosting: &dyn HostingApi,
    backends: &Backends<'_>,
    options: &RunOptions,
) -> Result<RunOutcome, ReviewError> {
    info!("fetching changed files");
    let files = hosting.fetch_changed_files(pr).await?;
    let additions: usize = files.iter().map(|f| f.additions).sum();
    let deletions: usize = files.iter().map(|f| f.deletions).sum();
    info!(files = files.len(), additions, deletions, "fetched changed files");
    for f in &files {
        debug!(
            file = %f.filename,
            status = f.status.as_deref().unwrap_or("unknown"),
            has_patch = f.reviewable_patch().is_some(),
            "changed file"
        );
    }

    let reviewable = prompt::reviewable(&files);
    if reviewable.is_empty() {
        info!("no code changes found to review");
        return Ok(RunOutcome::NoChanges);
    }
    debug!(reviewable = reviewable.len(), skipped = files.len() - reviewable.len(), "filtered files without patch");

    let prompt = prompt::build_prompt(&files);
    debug!(prompt_bytes = prompt.len(), "built review prompt");

    let review = generate_review(&prompt, backends, options.ai_failure_policy).await?;
    info!(
        backend = review.backend().unwrap_or("none"),
        needs_attention = review.needs_attention(),
        "review generated"
    );

    if options.dry_run {
        return Ok(RunOutcome::DryRun(review));
    }

    hosting.post_comment(pr, review.body()).await?;
    info!("review posted");
    Ok(RunOutcome::Posted(review))
}

/// Render the manual-review comment posted when a run fails.
pub fn failure_comment(err: &(dyn std::error::Error + 'static)) -> String {
    let mut trace = String::new();
    let mut current = Some(err);
    let mut depth = 0;
    while let Some(e) = current {
        trace.push_str(&format!("{depth}: {e}\n"));
        current = e.source();
        depth += 1;
    }

    format!(
        "⚠️ **Automated review failed, manual review required.**\n\n\
         **Error:** {err}\n\n\
         <details>\n<summary>Error trace</summary>\n\n```\n{trace}```\n\n</details>\n"
    )
}

/// Turn a failed run into a `Completion`, posting the manual-review comment when a target is known.
///
/// Exactly one post is attempted. A failure to post is logged and otherwise swallowed.
pub async fn fail(
    target: Option<(&dyn HostingApi, &PullRequestRef)>,
    error: ReviewError,
) -> Completion {
    error!(error = %error, "review run failed");

    let fallback_posted = match target {
        Some((hosting, pr)) => match hosting.post_comment(pr, &failure_comment(&error)).await {
            Ok(()) => {
                info!("manual review comment posted");
                true
            }
            Err(post_err) => {
                error!(error = %post_err, "failed to post manual review comment");
                false
            }
        },
        None => {
            warn!("not enough configuration to post a manual review comment");
            false
        }
    };

    Completion::Failed {
        error,
        fallback_posted,
    }
}

/// Run the review and route any failure to the manual-review comment.
pub async fn execute(
    pr: &PullRequestRef,
    hosting: &dyn HostingApi,
    backends: &Backends<'_>,
    options: &RunOptions,
) -> Completion {
    match run(pr, hosting, backends, options).await {
        Ok(outcome) => Completion::Finished(outcome),
        Err(error) => fail(Some((hosting, pr)), error).await,
    }
}

/// Print a one-line status for the run to stdout, plus the review body on a dry run.
pub fn print_summary(completion: &Completion) {
    match completion {
        Completion::Finished(RunOutcome::NoChanges) => {
            println!("{}", "No code changes found to review.".green());
        }
        Completion::Finished(RunOutcome::Posted(review)) => {
            println!("{}", "✅ Review posted successfully!".green().bold());
            if let ReviewResult::Placeholder { reason } = review {
                println!("{} {}", "AI review unavailable:".yellow(), reason);
            } else if review.needs_attention() {
                println!("{}", "The review suggests changes.".yellow());
            }
        }
        Completion::Finished(RunOutcome::DryRun(review)) => {
            println!("{}", "Dry run, review not posted:".cyan().bold());
            println!();
            println!("{}", review.body());
        }
        Completion::Failed {
            error,
            fallback_posted,
        } => {
            println!("{} {}", "❌ Review failed:".red().bold(), error);
            if *fallback_posted {
                println!("{}", "Manual review comment posted.".yellow());
            } else {
                println!("{}", "No comment could be posted.".red());
            }
        }
    }
}
