//! Timeouts, file names and limits used across gitpin.

use std::time::Duration;

/// Default timeout for a git invocation without a more specific limit.
pub const GIT_DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for `git clone --bare`.
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for `git fetch` on a cached clone.
pub const GIT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for `git worktree add` and submodule initialization.
pub const GIT_WORKTREE_TIMEOUT: Duration = Duration::from_secs(60);

/// Name of the project manifest.
pub const MANIFEST_FILE: &str = "gitpin.toml";

/// Name of the lockfile written next to the manifest.
pub const LOCKFILE_NAME: &str = "gitpin.lock";

/// Name of the package metadata file searched for inside checkouts.
pub const PACKAGE_METADATA_FILE: &str = "package.toml";

/// Marker written into an extension output directory after a successful build.
pub const EXTENSION_BUILT_MARKER: &str = ".built";

/// Lower bound for concurrent repository resolutions.
pub const MIN_PARALLELISM: usize = 4;

/// Environment variables that redirect git away from the repository named on
/// the command line. They are removed from every git child process.
pub const GIT_REDIRECT_ENV_VARS: &[&str] = &[
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_OBJECT_DIRECTORY",
    "GIT_ALTERNATE_OBJECT_DIRECTORIES",
    "GIT_COMMON_DIR",
    "GIT_NAMESPACE",
    "GIT_CEILING_DIRECTORIES",
    "GIT_PREFIX",
];
