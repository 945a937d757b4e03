use crate::github::ChangedFile;

/// Review guidelines placed ahead of the diff. `{changes}` is replaced with the per-file blocks.
const REVIEW_TEMPLATE: &str = r#"
You are a **senior software engineer** reviewing a GitHub pull request.
Your goal is to **approve PRs unless critical changes are needed**.

### Review Guidelines:
- ✅ **Approve** if the code has **no major issues**. Simply respond with **"LGTM"**.
- 🔍 **Provide feedback** only for **clear bugs, security risks, or major performance problems**.
- ✨ **Minor improvements** (best practices, readability) are **optional suggestions**, not blockers.
- ⏳ **Do NOT request changes for subjective or stylistic preferences**.
- 🔥 **Be concise** (at most 2-3 sentences per issue) and use **code snippets** where useful.

### Example Format:
**File: `path/to/file.ext`**
- **Issue:** Briefly explain the problem **only if necessary**.
- **Why?** Explain why it matters.
- **Suggested Fix:** Short fix.

If there are **no major issues**, respond with:
**"✅ LGTM! No major issues found. Good to go!"** 🚀

Now, review these changes:

{changes}

Respond in **Markdown format**.
"#;

/// Files that carry a non-empty patch. Binary and rename-only entries are dropped.
pub fn reviewable(files: &[ChangedFile]) -> Vec<&ChangedFile> {
    files
        .iter()
        .filter(|f| f.reviewable_patch().is_some())
        .collect()
}

/// Render one `File: ...\nChanges:\n...` block per reviewable file, separated by a blank line.
pub fn diff_blocks(files: &[ChangedFile]) -> String {
    files
        .iter()
        .filter_map(|f| {
            f.reviewable_patch()
                .map(|patch| format!("File: {}\nChanges:\n{}", f.filename, patch))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the full review prompt: fixed guidelines followed by every file's diff.
///
/// Pure and deterministic. The caller is expected to have short-circuited when
/// no file has a patch.
pub fn build_prompt(files: &[ChangedFile]) -> String {
    REVIEW_TEMPLATE.replace("{changes}", &diff_blocks(files))
}
