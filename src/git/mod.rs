//! Git repository operations and URL handling.
//!
//! All git work is done by shelling out through [`GitCommand`]; this module adds
//! the repository-level operations gitpin needs ([`GitRepo`]) and the helpers
//! that decide how repositories are identified:
//!
//! - [`normalize_url`] folds the different spellings of one repository into a
//!   single identity (trailing slashes, `.git` suffixes on remotes, scheme and
//!   host case, `file://` versus plain paths, relative versus absolute paths);
//! - [`repo_slug`] and [`url_hash`] turn that identity into stable, readable
//!   cache directory names.
//!
//! Local repositories are first-class: a plain path or `file://` URL is cloned
//! exactly like a remote one, which is what the test-suite relies on.

pub mod command_builder;


use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};

use crate::core::GitpinError;
pub use command_builder::{GitCommand, GitCommandOutput};

/// A git repository on disk, bare or with a working tree.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_bare(&self) -> bool {
        self.path.join("HEAD").is_file() && self.path.join("objects").is_dir()
    }

    /// Clone `url` as a bare repository into `target`.
    pub async fn clone_bare(url: &str, target: &Path) -> Result<Self> {
        GitCommand::clone_bare(url, target).with_context(url).execute_success().await?;
        Ok(Self::new(target))
    }

    /// Update all branches and tags from `origin`.
    pub async fn fetch(&self) -> Result<()> {
        GitCommand::fetch()
            .current_dir(&self.path)
            .with_context(self.path.display().to_string())
            .execute_success()
            .await
    }

    /// Resolve `rev` to a full commit SHA, or `None` if it names nothing.
    pub async fn resolve_commit(&self, rev: &str) -> Result<Option<String>> {
        let output =
            GitCommand::rev_parse(&format!("{rev}^{{commit}}")).current_dir(&self.path).run().await?;
        if !output.success() {
            return Ok(None);
        }
        let sha = output.stdout.trim().to_string();
        Ok(is_full_sha(&sha).then_some(sha))
    }

    /// Whether the commit `sha` is present in the local object database.
    pub async fn has_commit(&self, sha: &str) -> Result<bool> {
        Ok(GitCommand::object_exists(sha).current_dir(&self.path).run().await?.success())
    }

    pub async fn current_commit(&self) -> Result<String> {
        GitCommand::current_commit().current_dir(&self.path).execute_stdout().await
    }

    /// The checked-out branch, `None` on a detached HEAD.
    pub async fn current_branch(&self) -> Result<Option<String>> {
        let branch = GitCommand::current_branch().current_dir(&self.path).execute_stdout().await?;
        Ok((!branch.is_empty()).then_some(branch))
    }

    /// Check out `sha` into a new detached worktree at `worktree_path`.
    pub async fn add_worktree(&self, worktree_path: &Path, sha: &str) -> Result<()> {
        GitCommand::worktree_add(worktree_path, sha)
            .current_dir(&self.path)
            .with_context(self.path.display().to_string())
            .execute_success()
            .await
    }

    /// Forget worktree registrations whose directories are gone.
    pub async fn prune_worktrees(&self) -> Result<()> {
        GitCommand::worktree_prune().current_dir(&self.path).execute_success().await
    }

    /// Recursively initialize submodules of this working tree.
    pub async fn update_submodules(&self) -> Result<()> {
        if !self.path.join(".gitmodules").exists() {
            return Ok(());
        }
        GitCommand::submodule_update()
            .current_dir(&self.path)
            .with_context(self.path.display().to_string())
            .execute_success()
            .await
    }
}

/// Whether the git executable can be found on `PATH`.
pub fn is_git_installed() -> bool {
    which::which(command_builder::git_program()).is_ok()
}

/// Fail with [`GitpinError::ToolMissing`] unless git is available.
pub fn ensure_git_available() -> Result<()> {
    if !is_git_installed() {
        return Err(GitpinError::ToolMissing.into());
    }
    Ok(())
}

/// A 40 character lowercase hexadecimal object id.
pub fn is_full_sha(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Whether `url` refers to a repository on the local filesystem.
pub fn is_local_url(url: &str) -> bool {
    let url = url.trim();
    if url.starts_with("file://") {
        return true;
    }
    if url.contains("://") {
        return false;
    }
    // scp-like syntax: [user@]host:path, but not a Windows drive letter
    if let Some(colon) = url.find(':') {
        let before = &url[..colon];
        let drive_letter = before.len() == 1 && before.chars().all(|c| c.is_ascii_alphabetic());
        if !drive_letter && !before.contains('/') && !before.contains('\\') {
            return false;
        }
    }
    true
}

/// Normalize a repository URL or path into its cache identity.
///
/// Relative local paths are resolved against `base_dir` (the manifest's
/// directory). Local paths are made absolute and, when they exist,
/// canonicalized. Remote URLs lose a trailing `.git` and have their scheme and
/// host lower-cased.
pub fn normalize_url(url: &str, base_dir: Option<&Path>) -> String {
    let trimmed = url.trim().trim_end_matches('/');

    if is_local_url(trimmed) {
        let raw = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        let expanded = shellexpand::tilde(raw).to_string();
        let mut path = PathBuf::from(expanded);
        if path.is_relative() {
            let base = base_dir
                .map(Path::to_path_buf)
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_default();
            path = base.join(path);
        }
        let path = lexical_normalize(&path);
        let path = path.canonicalize().unwrap_or(path);
        return path.display().to_string().trim_end_matches('/').to_string();
    }

    let without_suffix = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    match without_suffix.find("://") {
        Some(idx) => {
            let scheme = without_suffix[..idx].to_ascii_lowercase();
            let rest = &without_suffix[idx + 3..];
            let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
            // Only the host part of user@host:port is case-insensitive
            let authority = match authority.rsplit_once('@') {
                Some((user, host)) => format!("{user}@{}", host.to_ascii_lowercase()),
                None => authority.to_ascii_lowercase(),
            };
            format!("{scheme}://{authority}{path}")
        }
        None => match without_suffix.split_once(':') {
            Some((host, path)) => match host.rsplit_once('@') {
                Some((user, h)) => format!("{user}@{}:{path}", h.to_ascii_lowercase()),
                None => format!("{}:{path}", host.to_ascii_lowercase()),
            },
            None => without_suffix.to_string(),
        },
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Short, filesystem-safe name for a repository, taken from the last path
/// segment of its URL.
pub fn repo_slug(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches(['/', '\\']);
    let last = trimmed.rsplit(['/', '\\', ':']).next().unwrap_or(trimmed);
    let last = last.strip_suffix(".git").unwrap_or(last);
    let slug: String = last
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    if slug.is_empty() || slug.chars().all(|c| c == '.') { "repo".to_string() } else { slug }
}

/// First 12 hex digits of the SHA-256 of a normalized URL.
pub fn url_hash(normalized_url: &str) -> String {
    let digest = Sha256::digest(normalized_url.as_bytes());
    hex::encode(digest)[..12].to_string()
}

/// Remove `user:password@` from HTTP(S) URLs before they are displayed.
pub fn strip_auth_from_url(url: &str) -> String {
    for scheme in ["https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            let first_slash = rest.find('/').unwrap_or(rest.len());
            if let Some(at_pos) = rest[..first_slash].rfind('@') {
                return format!("{scheme}{}", &rest[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
