use serde::Deserialize;

/// One entry of `GET /repos/{owner}/{repo}/pulls/{number}/files`.
///
/// Only the fields the reviewer uses are decoded; GitHub omits `patch`
/// for binary files, pure renames and diffs that are too large.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    /// Path of the file in the head commit
    pub filename: String,
    /// Unified-diff fragment for this file, if GitHub returned one
    #[serde(default)]
    pub patch: Option<String>,
    /// "added", "modified", "removed", "renamed", ...
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub additions: usize,
    #[serde(default)]
    pub deletions: usize,
}

impl ChangedFile {
    /// The patch text, if present and non-empty.
    pub fn reviewable_patch(&self) -> Option<&str> {
        self.patch.as_deref().filter(|p| !p.is_empty())
    }
}

/// Identifies the pull request being reviewed.
/// Built from `GITHUB_REPOSITORY` and `PR_NUMBER` by `parse_repository()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PR_FILES_JSON: &str = include_str!("../../tests/fixtures/pr_files.json");

    #[test]
    fn test_decode_pr_files_fixture() {
        let files: Vec<ChangedFile> = serde_json::from_str(PR_FILES_JSON).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].filename, "src/auth/login.py");
        assert!(files[0].patch.as_deref().unwrap().starts_with("@@"));
        assert_eq!(files[0].additions, 4);
        // binary asset: GitHub omits the patch field entirely
        assert_eq!(files[2].filename, "assets/logo.png");
        assert!(files[2].patch.is_none());
    }

    #[test]
    fn test_reviewable_patch_skips_empty() {
        let file = ChangedFile {
            filename: "a.py".to_string(),
            patch: Some(String::new()),
            status: None,
            additions: 0,
            deletions: 0,
        };
        assert!(file.reviewable_patch().is_none());
    }

    #[test]
    fn test_pull_request_ref_display() {
        let pr = PullRequestRef {
            owner: "org".to_string(),
            repo: "repo".to_string(),
            number: 42,
        };
        assert_eq!(pr.to_string(), "org/repo#42");
    }
}
