use std::process::ExitCode;

/// Posted in place of short affirmative replies such as "LGTM".
pub const APPROVAL_MESSAGE: &str = "✅ LGTM! No major issues found. Good to go! 🚀";

/// Posted when the AI step failed and the run was allowed to degrade.
pub const PLACEHOLDER_MESSAGE: &str = "⚠️ AI review unavailable, manual review required.";

/// Phrases that suggest the reviewer asked for changes.
const ATTENTION_KEYWORDS: &[&str] = &[
    "consider",
    "recommend",
    "could be improved",
    "potential issue",
    "possible bug",
    "optimize",
    "fix",
    "security risk",
];

/// The text that becomes the pull request comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewResult {
    /// Free text from an AI backend
    Generated { backend: String, text: String },
    /// A short affirmative reply, replaced by the canned approval
    Approved { backend: String },
    /// The AI step failed and the failure policy allowed degrading
    Placeholder { reason: String },
}

impl ReviewResult {
    /// Comment body to post.
    pub fn body(&self) -> &str {
        match self {
            ReviewResult::Generated { text, .. } => text.as_str(),
            ReviewResult::Approved { .. } => APPROVAL_MESSAGE,
            ReviewResult::Placeholder { .. } => PLACEHOLDER_MESSAGE,
        }
    }

    /// Name of the backend that produced the text, if any.
    pub fn backend(&self) -> Option<&str> {
        match self {
            ReviewResult::Generated { backend, .. } | ReviewResult::Approved { backend } => {
                Some(backend.as_str())
            }
            ReviewResult::Placeholder { .. } => None,
        }
    }

    /// Whether the review text reads like a change request. Informational only.
    pub fn needs_attention(&self) -> bool {
        match self {
            ReviewResult::Generated { text, .. } => {
                let lower = text.to_lowercase();
                ATTENTION_KEYWORDS.iter().any(|k| lower.contains(k))
            }
            ReviewResult::Approved { .. } => false,
            ReviewResult::Placeholder { .. } => true,
        }
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No file had a patch; nothing was generated or posted
    NoChanges,
    /// The review was posted as a comment
    Posted(ReviewResult),
    /// The review was generated but only printed
    DryRun(ReviewResult),
}

/// Terminal state of one invocation.
#[derive(Debug)]
pub enum Completion {
    Finished(RunOutcome),
    Failed {
        error: super::ReviewError,
        /// Whether the manual-review comment made it onto the pull request
        fallback_posted: bool,
    },
}

impl Completion {
    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Finished(_))
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bodies() {
        let generated = ReviewResult::Generated {
            backend: "Gemini".to_string(),
            text: "**File: `a.py`** - Issue".to_string(),
        };
        assert_eq!(generated.body(), "**File: `a.py`** - Issue");
        assert_eq!(generated.backend(), Some("Gemini"));
        assert_eq!(
            ReviewResult::Approved { backend: "Gemini".to_string() }.body(),
            APPROVAL_MESSAGE
        );
        let placeholder = ReviewResult::Placeholder { reason: "quota".to_string() };
        assert_eq!(placeholder.body(), PLACEHOLDER_MESSAGE);
        assert!(placeholder.backend().is_none());
    }

    #[test]
    fn test_needs_attention() {
        let flagged = ReviewResult::Generated {
            backend: "Gemini".to_string(),
            text: "Possible bug: consider checking for None".to_string(),
        };
        assert!(flagged.needs_attention());

        let clean = ReviewResult::Generated {
            backend: "Gemini".to_string(),
            text: "Nice tidy change.".to_string(),
        };
        assert!(!clean.needs_attention());
        assert!(!ReviewResult::Approved { backend: "OpenAI".to_string() }.needs_attention());
    }

    #[test]
    fn test_completion_success() {
        assert!(Completion::Finished(RunOutcome::NoChanges).is_success());
    }
}
