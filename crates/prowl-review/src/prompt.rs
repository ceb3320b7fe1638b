use prowl_core::PullRequestRef;

const INSTRUCTIONS: &str = "\
Your task is to review pull requests. Instructions:
- Provide the review as plain Markdown, with no preamble.
- Only point out problems and concrete improvements; do not give compliments.
- Do not suggest adding comments to the code.
- Use the pull request title and description only as context; review the code.
- If the diff looks correct, answer with an empty response.";

/// Build the completion prompt for one file of a pull request.
///
/// Embeds the PR title, description, and the file's patch text.
///
/// # Examples
///
/// ```
/// use prowl_core::PullRequestRef;
/// use prowl_review::prompt::build_review_prompt;
///
/// let pr = PullRequestRef {
///     owner: "a".into(),
///     repo: "b".into(),
///     pull_number: 1,
///     title: "Add retry".into(),
///     description: "Retries failed uploads".into(),
/// };
/// let prompt = build_review_prompt(&pr, "src/upload.rs", "+retry();");
/// assert!(prompt.contains("Title: Add retry"));
/// assert!(prompt.contains("+retry();"));
/// ```
pub fn build_review_prompt(pr: &PullRequestRef, path: &str, patch: &str) -> String {
    format!(
        "{INSTRUCTIONS}\n\n\
         Title: {title}\n\
         Description: {description}\n\n\
         File: {path}\n\
         Diff to review:\n\
         ```diff\n{patch}\n```\n",
        title = pr.title,
        description = pr.description,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(description: &str) -> PullRequestRef {
        PullRequestRef {
            owner: "o".into(),
            repo: "r".into(),
            pull_number: 3,
            title: "Refactor parser".into(),
            description: description.into(),
        }
    }

    #[test]
    fn prompt_embeds_all_parts() {
        let prompt = build_review_prompt(&pr("Splits the lexer out"), "src/lex.rs", "@@ -1 +1 @@\n-a\n+b");
        assert!(prompt.starts_with("Your task is to review pull requests."));
        assert!(prompt.contains("Title: Refactor parser"));
        assert!(prompt.contains("Description: Splits the lexer out"));
        assert!(prompt.contains("File: src/lex.rs"));
        assert!(prompt.contains("```diff\n@@ -1 +1 @@\n-a\n+b\n```"));
    }

    #[test]
    fn empty_description_and_patch_still_render() {
        let prompt = build_review_prompt(&pr(""), "bin.dat", "");
        assert!(prompt.contains("Description: \n"));
        assert!(prompt.contains("```diff\n\n```"));
    }
}
