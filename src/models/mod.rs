//! Value types passed between the resolution components.
//!
//! - [`RepositorySpec`]: one declared git source, as the manifest states it
//! - [`GitReference`]: what to check out (branch, tag, revision or the remote HEAD)
//! - [`ResolvedRevision`]: a repository paired with a full commit SHA
//! - [`ResolveMode`]: whether a run may move existing pins

use anyhow::{Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::git::{is_full_sha, is_local_url, normalize_url};

/// Normalize the textual form of a ref specifier.
///
/// Surrounding whitespace and a leading `:` are dropped so that symbol-style
/// spellings (`:master`) and plain strings (`master`) name the same ref.
pub fn normalize_ref(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_prefix(':').unwrap_or(trimmed).trim().to_string()
}

/// What a git source asks to be checked out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GitReference {
    Branch(String),
    Tag(String),
    /// Any revision git understands: full or abbreviated SHA, `HEAD~1`, a ref name.
    Rev(String),
    /// The remote's default branch.
    #[default]
    Default,
}

impl GitReference {
    /// Build from the optional `branch`/`tag`/`ref` keys of a declaration.
    ///
    /// `tag` and `ref` exclude each other. Either one wins over `branch`, which
    /// then only names the branch the revision is expected on (see
    /// [`RepositorySpec::declared_branch`]).
    pub fn from_parts(
        branch: Option<&str>,
        tag: Option<&str>,
        rev: Option<&str>,
    ) -> Result<Self> {
        match (tag, rev) {
            (Some(_), Some(_)) => bail!("only one of `tag` or `ref` may be specified"),
            (Some(t), None) => Ok(Self::Tag(normalize_ref(t))),
            (None, Some(r)) => Ok(Self::Rev(normalize_ref(r))),
            (None, None) => Ok(branch.map_or(Self::Default, |b| Self::Branch(normalize_ref(b)))),
        }
    }

    /// Parse a bare revision string. Empty input and `HEAD` mean the remote's
    /// default branch; `:master` and `master` are the same revision.
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize_ref(raw);
        if normalized.is_empty() || normalized == "HEAD" {
            Self::Default
        } else {
            Self::Rev(normalized)
        }
    }

    /// The text handed to git when resolving.
    pub fn specifier(&self) -> &str {
        match self {
            Self::Branch(s) | Self::Tag(s) | Self::Rev(s) => s,
            Self::Default => "HEAD",
        }
    }

    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Branch(b) => Some(b),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Tag(t) => Some(t),
            _ => None,
        }
    }

    pub fn rev(&self) -> Option<&str> {
        match self {
            Self::Rev(r) => Some(r),
            _ => None,
        }
    }

    /// A revision that is already a full commit id.
    pub fn pinned_sha(&self) -> Option<&str> {
        self.rev().filter(|r| is_full_sha(r))
    }
}

impl fmt::Display for GitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.specifier())
    }
}

/// A declared git source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySpec {
    /// Display name, the first package declared from this source.
    pub name: String,
    /// URL or path exactly as declared.
    pub uri: String,
    /// Cache identity, see [`normalize_url`].
    pub normalized: String,
    pub reference: GitReference,
    /// Branch declared next to a `tag` or `ref`. Not resolved; it only feeds
    /// the local override checks and the lockfile.
    pub branch: Option<String>,
    pub submodules: bool,
    /// Local working directory standing in for the repository.
    pub override_path: Option<PathBuf>,
}

impl RepositorySpec {
    /// Relative local paths in `uri` are resolved against `base_dir`.
    pub fn new(name: impl Into<String>, uri: impl Into<String>, base_dir: Option<&Path>) -> Self {
        let uri = uri.into();
        let normalized = normalize_url(&uri, base_dir);
        Self {
            name: name.into(),
            uri,
            normalized,
            reference: GitReference::Default,
            branch: None,
            submodules: false,
            override_path: None,
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: GitReference) -> Self {
        self.reference = reference;
        self
    }

    /// Record the branch a `tag` or `ref` is expected to live on.
    #[must_use]
    pub fn with_branch(mut self, branch: Option<&str>) -> Self {
        self.branch = branch.map(normalize_ref).filter(|b| !b.is_empty());
        self
    }

    /// The branch the declaration names, whether it is resolved (a `branch`
    /// alone) or only accompanies a `tag` or `ref`.
    pub fn declared_branch(&self) -> Option<&str> {
        self.reference.branch().or(self.branch.as_deref())
    }

    #[must_use]
    pub const fn with_submodules(mut self, submodules: bool) -> Self {
        self.submodules = submodules;
        self
    }

    #[must_use]
    pub fn with_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    /// What git is asked to clone: the absolute path for local repositories,
    /// the declared URL otherwise.
    pub fn clone_url(&self) -> &str {
        if is_local_url(&self.uri) { &self.normalized } else { self.uri.trim() }
    }
}

/// A repository at one exact commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedRevision {
    uri: String,
    sha: String,
}

impl ResolvedRevision {
    /// Fails unless `sha` is a full 40 character hex object id.
    pub fn new(uri: impl Into<String>, sha: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        let sha = sha.into().trim().to_ascii_lowercase();
        if !is_full_sha(&sha) {
            bail!("'{sha}' is not a full commit SHA for {uri}");
        }
        Ok(Self {
            uri,
            sha,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn sha(&self) -> &str {
        &self.sha
    }

    /// Seven character abbreviation for messages.
    pub fn short(&self) -> &str {
        &self.sha[..7]
    }
}

impl fmt::Display for ResolvedRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.uri, self.short())
    }
}

/// Whether a run reproduces existing pins or re-resolves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    Install,
    Update,
}
