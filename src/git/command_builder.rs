//! Process runner for git subcommands.
//!
//! [`GitCommand`] is a builder around [`tokio::process::Command`] that every git
//! call in gitpin goes through. It gives all invocations the same treatment:
//!
//! - the working directory is passed with `git -C <dir>` so the process's own
//!   current directory never matters;
//! - variables that redirect git to another repository (`GIT_DIR`,
//!   `GIT_WORK_TREE`, ...) are removed from the child's environment. The parent
//!   environment is left untouched, so concurrent invocations cannot observe
//!   each other and nothing has to be restored afterwards;
//! - interactive credential prompts are disabled;
//! - a timeout bounds each call, and a timed-out child is killed.
//!
//! [`GitCommand::run`] reports the exit status without interpreting it. The
//! `execute*` methods treat a nonzero status as [`GitpinError::ToolExecution`],
//! keeping git's stderr verbatim.
//!
//! ```rust,no_run
//! use gitpin_cli::git::command_builder::GitCommand;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let sha = GitCommand::rev_parse("HEAD").current_dir("/path/to/repo").execute_stdout().await?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::{GIT_DEFAULT_TIMEOUT, GIT_REDIRECT_ENV_VARS};
use crate::core::GitpinError;

/// Name of the git executable on this platform.
#[must_use]
pub const fn git_program() -> &'static str {
    if cfg!(windows) { "git.exe" } else { "git" }
}

/// Builder for a single git invocation.
#[derive(Debug, Clone)]
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            timeout_duration: Some(GIT_DEFAULT_TIMEOUT),
            context: None,
        }
    }
}

/// Captured result of a git invocation.
#[derive(Debug, Clone)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl GitCommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

impl GitCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Label used in log lines, usually the repository being worked on.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn display_args(&self) -> String {
        self.args.join(" ")
    }

    fn display_dir(&self) -> String {
        match &self.current_dir {
            Some(dir) => dir.display().to_string(),
            None => std::env::current_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|_| ".".to_string()),
        }
    }

    /// Run the command and capture its output. A nonzero exit is *not* an error.
    ///
    /// Fails with [`GitpinError::ToolMissing`] when git cannot be spawned, and
    /// with [`GitpinError::ToolExecution`] when the timeout elapses.
    pub async fn run(&self) -> Result<GitCommandOutput> {
        let start = Instant::now();
        let mut cmd = Command::new(git_program());

        if let Some(dir) = &self.current_dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(&self.args);

        for var in GIT_REDIRECT_ENV_VARS {
            cmd.env_remove(var);
        }
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "git", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        match &self.context {
            Some(ctx) => tracing::debug!(target: "git", "({}) Executing: git {}", ctx, self.display_args()),
            None => tracing::debug!(target: "git", "Executing: git {}", self.display_args()),
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GitpinError::ToolMissing.into());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to execute git {}", self.display_args())));
            }
        };

        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "Command timed out after {} seconds: git {}",
                        duration.as_secs(),
                        self.display_args()
                    );
                    return Err(GitpinError::ToolExecution {
                        command: self.display_args(),
                        dir: self.display_dir(),
                        stderr: format!(
                            "Git command timed out after {} seconds. Any partially fetched data is \
                             reused when the command is run again.",
                            duration.as_secs()
                        ),
                    }
                    .into());
                }
            },
            None => child.wait_with_output().await?,
        };

        let result = GitCommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        };

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "git::perf",
                "git {} took {:.2}s",
                self.args.first().map_or("", String::as_str),
                elapsed.as_secs_f64()
            );
        }
        if !result.success() {
            tracing::debug!(target: "git", "Command exited with {:?}: {}", result.exit_code, result.stderr.trim());
        }

        Ok(result)
    }

    /// Run the command and fail with [`GitpinError::ToolExecution`] on a
    /// nonzero exit status.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let output = self.run().await?;
        if output.success() {
            return Ok(output);
        }

        let stderr = if output.stderr.trim().is_empty() {
            output.stdout.clone()
        } else {
            output.stderr.clone()
        };
        Err(GitpinError::ToolExecution {
            command: self.display_args(),
            dir: self.display_dir(),
            stderr: stderr.trim_end().to_string(),
        }
        .into())
    }

    /// Run and return stdout with surrounding whitespace removed.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

// Convenience builders for the operations gitpin performs

impl GitCommand {
    /// `git clone --bare` of `url` into `target`.
    pub fn clone_bare(url: &str, target: impl AsRef<Path>) -> Self {
        Self::new()
            .args(["clone", "--bare", "--quiet", url])
            .arg(target.as_ref().display().to_string())
            .with_timeout(Some(crate::constants::GIT_CLONE_TIMEOUT))
    }

    /// Refresh branches and tags of a bare clone, following force-pushes and
    /// dropping branches deleted upstream.
    pub fn fetch() -> Self {
        Self::new()
            .args([
                "fetch",
                "--force",
                "--tags",
                "--prune",
                "--quiet",
                "origin",
                "+refs/heads/*:refs/heads/*",
            ])
            .with_timeout(Some(crate::constants::GIT_FETCH_TIMEOUT))
    }

    /// `git worktree add --detach <path> <sha>`.
    pub fn worktree_add(worktree_path: impl AsRef<Path>, sha: &str) -> Self {
        Self::new()
            .args(["worktree", "add", "--detach", "--force"])
            .arg(worktree_path.as_ref().display().to_string())
            .arg(sha)
            .with_timeout(Some(crate::constants::GIT_WORKTREE_TIMEOUT))
    }

    pub fn worktree_prune() -> Self {
        Self::new().args(["worktree", "prune"])
    }

    /// Recursively initialize and update submodules of a checkout.
    pub fn submodule_update() -> Self {
        // Local submodule URLs are refused by default since git 2.38.1
        Self::new()
            .args([
                "-c",
                "protocol.file.allow=always",
                "submodule",
                "update",
                "--init",
                "--recursive",
                "--quiet",
            ])
            .with_timeout(Some(crate::constants::GIT_WORKTREE_TIMEOUT))
    }

    pub fn rev_parse(rev: &str) -> Self {
        Self::new().args(["rev-parse", "--verify", "--quiet", rev])
    }

    /// Succeeds only if `sha` names a commit present in the object database.
    pub fn object_exists(sha: &str) -> Self {
        Self::new().args(["cat-file", "-e"]).arg(format!("{sha}^{{commit}}"))
    }

    pub fn current_commit() -> Self {
        Self::new().args(["rev-parse", "HEAD"])
    }

    /// Prints the checked-out branch, or nothing on a detached HEAD.
    pub fn current_branch() -> Self {
        Self::new().args(["branch", "--show-current"])
    }
}
