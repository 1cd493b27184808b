//! Git CLI wrapper for producing diffs of a checked-out branch.
//!
//! Shells out to `git` via `tokio::process::Command`.

use std::path::Path;

use super::DiffError;

/// Run `git` with `args` in `repo_root` and return stdout.
async fn run_git(repo_root: &Path, args: &[&str]) -> Result<String, DiffError> {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .await
        .map_err(|e| DiffError::GitError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DiffError::GitError(format!(
            "git {} failed (exit {}): {}",
            args.first().copied().unwrap_or_default(),
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Diff `HEAD` against its merge base with `base_ref`.
///
/// Uses the three-dot form so the result matches what a pull request from
/// the current branch into `base_ref` shows.
pub async fn git_diff(repo_root: &Path, base_ref: &str) -> Result<String, DiffError> {
    let range = format!("{base_ref}...HEAD");
    run_git(
        repo_root,
        &["diff", "--no-color", "--no-ext-diff", "--src-prefix=a/", "--dst-prefix=b/", &range],
    )
    .await
}

/// Resolve the commit SHA of `HEAD`.
pub async fn head_sha(repo_root: &Path) -> Result<String, DiffError> {
    Ok(run_git(repo_root, &["rev-parse", "HEAD"]).await?.trim().to_string())
}

/// Find the root of the git repository containing `start_dir`.
pub async fn find_repo_root(start_dir: &Path) -> Result<String, DiffError> {
    run_git(start_dir, &["rev-parse", "--show-toplevel"])
        .await
        .map(|out| out.trim().to_string())
        .map_err(|e| DiffError::GitError(format!("not a git repository: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn git(dir: &Path, args: &[&str]) {
        tokio::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .unwrap();
    }

    async fn init_repo(dir: &Path) {
        git(dir, &["init", "-b", "main"]).await;
        git(dir, &["config", "user.email", "test@test.com"]).await;
        git(dir, &["config", "user.name", "Test"]).await;
        git(dir, &["config", "commit.gpgsign", "false"]).await;
    }

    #[tokio::test]
    async fn git_diff_in_non_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = git_diff(dir.path(), "main").await.unwrap_err().to_string();
        assert!(err.contains("git"), "got: {err}");
    }

    #[tokio::test]
    async fn find_repo_root_non_git() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_repo_root(dir.path()).await.unwrap_err().to_string();
        assert!(err.contains("not a git repository"), "got: {err}");
    }

    #[tokio::test]
    async fn git_diff_against_base_branch() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        init_repo(p).await;

        tokio::fs::write(p.join("Sales.al"), "codeunit 50100 Sales\n{\n}\n")
            .await
            .unwrap();
        git(p, &["add", "."]).await;
        git(p, &["commit", "-m", "init"]).await;
        git(p, &["checkout", "-b", "feature"]).await;
        tokio::fs::write(p.join("Sales.al"), "codeunit 50100 Sales\n{\n    // new\n}\n")
            .await
            .unwrap();
        git(p, &["commit", "-am", "change"]).await;

        let diff = git_diff(p, "main").await.unwrap();
        assert!(diff.contains("+    // new"), "diff should contain the change: {diff}");
        assert!(diff.contains("diff --git a/Sales.al b/Sales.al"));

        let sha = head_sha(p).await.unwrap();
        assert_eq!(sha.len(), 40);

        let root = find_repo_root(p).await.unwrap();
        assert!(!root.is_empty());
    }
}
