//! Synchronous git helper for setting up fixture repositories in tests.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs git commands inside one repository directory.
pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    fn run_git_command(&self, args: &[&str], action: &str) -> Result<std::process::Output> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .output()
            .with_context(|| action.to_string())?;

        if !output.status.success() {
            bail!("{} failed: {}", action, String::from_utf8_lossy(&output.stderr));
        }

        Ok(output)
    }

    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// `git init` with `master` as the initial branch regardless of the host's
    /// `init.defaultBranch`.
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.repo_path)?;
        self.run_git_command(&["init", "--quiet"], "Failed to initialize git repository")?;
        self.run_git_command(
            &["symbolic-ref", "HEAD", "refs/heads/master"],
            "Failed to set initial branch",
        )?;
        Ok(())
    }

    pub fn config_user(&self) -> Result<()> {
        self.run_git_command(
            &["config", "user.email", "test@gitpin.example"],
            "Failed to configure git user email",
        )?;
        self.run_git_command(&["config", "user.name", "Test User"], "Failed to configure git user name")?;
        self.run_git_command(&["config", "commit.gpgsign", "false"], "Failed to disable signing")?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<()> {
        self.run_git_command(&["add", "."], "Failed to add files to git")?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run_git_command(&["commit", "--quiet", "-m", message], "Failed to create git commit")?;
        Ok(())
    }

    /// Stage everything and commit, returning the new HEAD.
    pub fn commit_all(&self, message: &str) -> Result<String> {
        self.add_all()?;
        self.commit(message)?;
        self.rev_parse_head()
    }

    pub fn tag(&self, tag_name: &str) -> Result<()> {
        self.run_git_command(&["tag", tag_name], &format!("Failed to create tag: {tag_name}"))?;
        Ok(())
    }

    pub fn checkout(&self, ref_name: &str) -> Result<()> {
        self.run_git_command(&["checkout", "--quiet", ref_name], &format!("Failed to checkout: {ref_name}"))?;
        Ok(())
    }

    pub fn create_branch(&self, branch_name: &str) -> Result<()> {
        self.run_git_command(
            &["checkout", "--quiet", "-b", branch_name],
            &format!("Failed to create branch: {branch_name}"),
        )?;
        Ok(())
    }

    /// `git reset --hard <target>`, used to simulate force-pushed history.
    pub fn reset_hard(&self, target: &str) -> Result<()> {
        self.run_git_command(&["reset", "--quiet", "--hard", target], &format!("Failed to reset to {target}"))?;
        Ok(())
    }

    /// Add `url` as a submodule at `path`.
    pub fn add_submodule(&self, url: &str, path: &str) -> Result<()> {
        self.run_git_command(
            &["-c", "protocol.file.allow=always", "submodule", "add", "--quiet", url, path],
            &format!("Failed to add submodule {url}"),
        )?;
        Ok(())
    }

    pub fn rev_parse_head(&self) -> Result<String> {
        self.rev_parse("HEAD")
    }

    pub fn rev_parse(&self, rev: &str) -> Result<String> {
        let output = self.run_git_command(&["rev-parse", rev], &format!("Failed to resolve {rev}"))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn get_current_branch(&self) -> Result<String> {
        let output = self
            .run_git_command(&["branch", "--show-current"], "Failed to get current branch name")?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Create a git repository at `path` holding one package with a
/// `package.toml`, and return the commit SHA.
pub fn create_package_repo(path: &Path, name: &str, version: &str) -> Result<String> {
    let git = TestGit::new(path);
    git.init()?;
    git.config_user()?;
    std::fs::write(
        path.join("package.toml"),
        format!("name = \"{name}\"\nversion = \"{version}\"\n"),
    )?;
    std::fs::create_dir_all(path.join("lib"))?;
    std::fs::write(path.join("lib").join(format!("{name}.txt")), format!("{name} {version}\n"))?;
    git.commit_all(&format!("Initial commit of {name} {version}"))
}
