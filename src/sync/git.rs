//! Thin wrapper around the git CLI

use std::path::{Path, PathBuf};
use std::process::Command;

use super::SyncError;

/// Captured output of one git invocation
#[derive(Debug)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl GitOutput {
    /// Stdout on success, a command error otherwise
    pub fn into_result(self, command: &str) -> Result<String, SyncError> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(SyncError::GitCommand {
                command: command.to_string(),
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs git commands inside a fixed working copy
#[derive(Debug, Clone)]
pub struct GitRunner {
    work_tree: PathBuf,
}

impl GitRunner {
    pub fn new(work_tree: impl Into<PathBuf>) -> Self {
        Self {
            work_tree: work_tree.into(),
        }
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// Execute git with the given arguments in the working copy
    pub fn run(&self, args: &[&str]) -> Result<GitOutput, SyncError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_tree)
            // Disable interactive prompts so unattended syncs never hang
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(SyncError::GitSpawn)?;

        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// `git status --porcelain`; empty output means a clean tree
    pub fn status_porcelain(&self) -> Result<String, SyncError> {
        self.run(&["status", "--porcelain"])?.into_result("status")
    }

    pub fn add_all(&self) -> Result<(), SyncError> {
        self.run(&["add", "-A"])?.into_result("add").map(|_| ())
    }

    pub fn commit(&self, message: &str) -> Result<(), SyncError> {
        self.run(&["commit", "-m", message])?
            .into_result("commit")
            .map(|_| ())
    }

    pub fn push(&self, remote: &str, branch: &str) -> Result<(), SyncError> {
        self.run(&["push", remote, branch])?
            .into_result("push")
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result_success_returns_stdout() {
        let output = GitOutput {
            success: true,
            stdout: " M src/app.js\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
        };
        assert_eq!(output.into_result("status").unwrap(), " M src/app.js\n");
    }

    #[test]
    fn test_into_result_failure_carries_context() {
        let output = GitOutput {
            success: false,
            stdout: String::new(),
            stderr: "fatal: not a git repository\n".to_string(),
            exit_code: 128,
        };
        let err = output.into_result("status").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("status"));
        assert!(message.contains("128"));
        assert!(message.contains("not a git repository"));
    }
}
