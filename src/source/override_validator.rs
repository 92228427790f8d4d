//! Validation of local overrides.
//!
//! A local override points a git source at a working directory the user is
//! editing. Before it is used in place of the cached checkout it has to pass,
//! in order:
//!
//! 1. the directory exists;
//! 2. the source declares a branch, unless `disable_local_branch_check` is set;
//! 3. the checked-out branch is the declared one (skipped when the check is
//!    disabled);
//! 4. on plain installs, the revision recorded in the lockfile exists in the
//!    override repository.
//!
//! A declared `ref` or `tag` that differs from the override's HEAD is only a
//! warning: the local checkout wins, and its HEAD is what gets locked.

use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::GitpinError;
use crate::git::GitRepo;
use crate::lockfile::LockEntry;
use crate::models::{GitReference, RepositorySpec, ResolveMode, ResolvedRevision};

/// Everything the validator looks at.
#[derive(Debug, Clone, Copy)]
pub struct OverrideContext<'a> {
    /// Package name used in messages.
    pub name: &'a str,
    pub spec: &'a RepositorySpec,
    pub path: &'a Path,
    pub lock_entry: Option<&'a LockEntry>,
    pub mode: ResolveMode,
    pub disable_branch_check: bool,
}

/// The override is checked out somewhere other than the declared revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRevisionMismatch {
    pub name: String,
    pub path: PathBuf,
    pub declared: String,
    /// Full SHA of the override's HEAD.
    pub actual: String,
}

impl fmt::Display for OverrideRevisionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Local override for {} at {} is checked out at {}, but the manifest specifies {}. Using the local checkout",
            self.name,
            self.path.display(),
            self.actual.get(..7).unwrap_or(&self.actual),
            self.declared
        )
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideCheck {
    /// The override's HEAD, to be locked.
    pub revision: ResolvedRevision,
    pub branch: Option<String>,
    pub revision_mismatch: Option<OverrideRevisionMismatch>,
}

/// Decide whether the override in `ctx` may be used.
pub async fn validate_override(ctx: &OverrideContext<'_>) -> Result<OverrideCheck> {
    let path_display = ctx.path.display().to_string();

    if !ctx.path.exists() {
        return Err(GitpinError::OverridePathMissing {
            name: ctx.name.to_string(),
            uri: ctx.spec.uri.clone(),
            path: path_display,
        }
        .into());
    }

    let declared_branch = ctx.spec.declared_branch();
    if declared_branch.is_none() && !ctx.disable_branch_check {
        return Err(GitpinError::OverrideBranchRequired {
            name: ctx.name.to_string(),
            uri: ctx.spec.uri.clone(),
            path: path_display,
        }
        .into());
    }

    let repo = GitRepo::new(ctx.path);
    let branch = repo.current_branch().await?;

    if let Some(expected) = declared_branch
        && !ctx.disable_branch_check
        && branch.as_deref() != Some(expected)
    {
        return Err(GitpinError::OverrideBranchMismatch {
            name: ctx.name.to_string(),
            uri: ctx.spec.uri.clone(),
            path: path_display,
            actual: branch.unwrap_or_else(|| "(detached HEAD)".to_string()),
            expected: expected.to_string(),
        }
        .into());
    }

    let head = repo.current_commit().await?;
    let revision = ResolvedRevision::new(&ctx.spec.normalized, &head)?;

    if ctx.mode == ResolveMode::Install
        && let Some(entry) = ctx.lock_entry
        && !repo.has_commit(&entry.revision).await?
    {
        return Err(GitpinError::LockedRevisionNotFound {
            uri: ctx.spec.uri.clone(),
            revision: entry.revision.clone(),
            location: format!("the local override at {path_display}"),
        }
        .into());
    }

    let revision_mismatch = match &ctx.spec.reference {
        GitReference::Rev(declared) | GitReference::Tag(declared) => {
            let points_at = repo.resolve_commit(declared).await?;
            (points_at.as_deref() != Some(revision.sha())).then(|| OverrideRevisionMismatch {
                name: ctx.name.to_string(),
                path: ctx.path.to_path_buf(),
                declared: declared.clone(),
                actual: revision.sha().to_string(),
            })
        }
        GitReference::Branch(_) | GitReference::Default => None,
    };

    if let Some(mismatch) = &revision_mismatch {
        tracing::debug!(target: "source", "{}", mismatch);
    }

    Ok(OverrideCheck {
        revision,
        branch,
        revision_mismatch,
    })
}
