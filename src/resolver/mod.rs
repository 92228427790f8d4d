//! Revision resolution.
//!
//! Turns a declared reference into a full commit SHA inside a cached bare
//! clone. The rules, in order:
//!
//! 1. A full 40 character SHA already present in the clone is returned as-is,
//!    without any network access.
//! 2. Otherwise the clone is fetched (at most once per run, see
//!    [`Cache::fetch`]) and the reference is looked up: branches under
//!    `refs/heads/`, tags under `refs/tags/`, anything else (abbreviated SHAs,
//!    `HEAD~1`, ref names) through `git rev-parse`.
//! 3. A reference that still names nothing is [`GitpinError::RevisionNotFound`].
//!
//! Because the fetch refspec force-updates branches, a branch that was
//! force-pushed resolves to its new tip after a fetch, and back again when the
//! force-push is reverted.


use anyhow::Result;

use crate::cache::{Cache, CloneHandle};
use crate::core::GitpinError;
use crate::models::{GitReference, ResolvedRevision};

/// A declared reference, as handed to the resolver.
pub type RefSpecifier = GitReference;

/// Resolves references against clones in one [`Cache`].
#[derive(Debug, Clone, Copy)]
pub struct RevisionResolver<'a> {
    cache: &'a Cache,
}

impl<'a> RevisionResolver<'a> {
    pub const fn new(cache: &'a Cache) -> Self {
        Self {
            cache,
        }
    }

    /// Resolve `reference` to a full commit in `handle`'s repository.
    pub async fn resolve(
        &self,
        handle: &CloneHandle,
        reference: &RefSpecifier,
    ) -> Result<ResolvedRevision> {
        if let Some(sha) = reference.pinned_sha()
            && self.cache.has_revision(handle, sha).await?
        {
            tracing::debug!(target: "resolver", "{} already has {}", handle.uri, sha);
            return ResolvedRevision::new(&handle.uri, sha);
        }

        self.cache.fetch(handle).await?;

        match lookup(handle, reference).await? {
            Some(sha) => {
                tracing::debug!(target: "resolver", "Resolved {} {} to {}", handle.uri, reference, sha);
                ResolvedRevision::new(&handle.uri, sha)
            }
            None => Err(GitpinError::RevisionNotFound {
                uri: handle.uri.clone(),
                specifier: reference.specifier().to_string(),
            }
            .into()),
        }
    }

    /// Make sure the locked commit `sha` is present, fetching once if it is not.
    pub async fn ensure_revision(&self, handle: &CloneHandle, sha: &str) -> Result<ResolvedRevision> {
        if !self.cache.has_revision(handle, sha).await? {
            tracing::debug!(target: "resolver", "{} lacks locked revision {}, fetching", handle.uri, sha);
            self.cache.fetch(handle).await?;
            if !self.cache.has_revision(handle, sha).await? {
                return Err(GitpinError::RevisionNotFound {
                    uri: handle.uri.clone(),
                    specifier: sha.to_string(),
                }
                .into());
            }
        }
        ResolvedRevision::new(&handle.uri, sha)
    }
}

async fn lookup(handle: &CloneHandle, reference: &GitReference) -> Result<Option<String>> {
    let repo = handle.repo();
    match reference {
        GitReference::Branch(branch) => repo.resolve_commit(&format!("refs/heads/{branch}")).await,
        GitReference::Tag(tag) => repo.resolve_commit(&format!("refs/tags/{tag}")).await,
        // Never let a revision be read as an option
        GitReference::Rev(rev) if rev.starts_with('-') => Ok(None),
        GitReference::Rev(rev) => repo.resolve_commit(rev).await,
        GitReference::Default => repo.resolve_commit("HEAD").await,
    }
}
