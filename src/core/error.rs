//! Error handling for gitpin
//!
//! Two layers, mirroring how the errors are consumed:
//! - [`GitpinError`] is the strongly-typed taxonomy that library code returns and
//!   that callers match on (tests, the installer, the CLI).
//! - [`ErrorContext`] wraps an error with a remediation hint and optional details
//!   for terminal output. [`user_friendly_error`] builds one from any
//!   [`anyhow::Error`], walking the context chain to find the typed error.
//!
//! # Categories
//!
//! - **External tool**: [`GitpinError::ToolMissing`], [`GitpinError::ToolExecution`]
//! - **Resolution**: [`GitpinError::RevisionNotFound`], [`GitpinError::LockedRevisionNotFound`],
//!   [`GitpinError::PackageNotFoundInSource`]
//! - **Local overrides**: [`GitpinError::OverridePathMissing`],
//!   [`GitpinError::OverrideBranchRequired`], [`GitpinError::OverrideBranchMismatch`]
//! - **Post-checkout**: [`GitpinError::HookFailure`], [`GitpinError::ExtensionBuildFailure`]
//! - **Project files**: manifest, lockfile and configuration errors
//!
//! Every variant that concerns a repository carries its URI, and where it applies
//! the offending revision or ref specifier, so messages are actionable on their own.
//!
//! ```rust,no_run
//! use gitpin_cli::core::{GitpinError, user_friendly_error};
//!
//! let err = anyhow::Error::from(GitpinError::ToolMissing);
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Every failure gitpin reports to its callers.
#[derive(Error, Debug)]
pub enum GitpinError {
    /// The git executable could not be spawned.
    #[error(
        "You need to install git to be able to use packages from git repositories. For help installing git, please refer to GitHub's tutorial at https://help.github.com/articles/set-up-git"
    )]
    ToolMissing,

    /// A git invocation exited with a nonzero status. `stderr` is git's own
    /// diagnostic output, kept verbatim.
    #[error("Git error: command `git {command}` in directory {dir} has failed.\n{stderr}")]
    ToolExecution {
        command: String,
        dir: String,
        stderr: String,
    },

    /// A branch, tag or revision could not be resolved to a commit.
    #[error("Revision {specifier} does not exist in the repository {uri}. Maybe you misspelled it?")]
    RevisionNotFound { uri: String, specifier: String },

    /// The lockfile pins a commit that cannot be found where it is looked up.
    #[error(
        "The lockfile is pointing to revision {revision} of {uri}, but it does not exist in {location}"
    )]
    LockedRevisionNotFound {
        uri: String,
        revision: String,
        location: String,
    },

    #[error("Cannot use local override for {name} because {path} does not exist (overriding {uri})")]
    OverridePathMissing {
        name: String,
        uri: String,
        path: String,
    },

    #[error(
        "Cannot use local override for {name} at {path} because no branch is specified for {uri} in the manifest"
    )]
    OverrideBranchRequired {
        name: String,
        uri: String,
        path: String,
    },

    #[error(
        "Local override for {name} at {path} is using branch {actual} but the manifest specifies {expected} for {uri}"
    )]
    OverrideBranchMismatch {
        name: String,
        uri: String,
        path: String,
        actual: String,
        expected: String,
    },

    /// The requested package (or version) is absent at the resolved revision.
    #[error("{}", format_package_not_found(.name, .requirement.as_deref(), .uri, .revision, .available))]
    PackageNotFoundInSource {
        name: String,
        requirement: Option<String>,
        uri: String,
        revision: String,
        /// `name version` pairs found at the revision.
        available: Vec<(String, String)>,
    },

    /// An install hook returned an error; `package` is the full `name-version`.
    #[error("{phase} hook failed for {package}: {reason}")]
    HookFailure {
        phase: String,
        package: String,
        reason: String,
    },

    #[error("An error occurred while installing {name} ({version}), and the extension build failed.\n{output}")]
    ExtensionBuildFailure {
        name: String,
        version: String,
        output: String,
    },

    #[error("Manifest file gitpin.toml not found in current directory or any parent directory")]
    ManifestNotFound,

    #[error("Invalid manifest file syntax in {file}: {reason}")]
    ManifestParse { file: String, reason: String },

    #[error("Manifest validation failed: {reason}")]
    ManifestValidation { reason: String },

    #[error("Invalid lockfile syntax in {file}: {reason}")]
    LockfileParse { file: String, reason: String },

    /// `--frozen` was requested but the lockfile does not match the manifest.
    #[error("The lockfile is out of date: {reason}")]
    LockfileOutOfDate { reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Other { message: String },
}

fn format_package_not_found(
    name: &str,
    requirement: Option<&str>,
    uri: &str,
    revision: &str,
    available: &[(String, String)],
) -> String {
    let wanted = match requirement {
        Some(req) => format!("'{name}' ({req})"),
        None => format!("'{name}'"),
    };
    let short = revision.get(..7).unwrap_or(revision);
    let mut msg = format!("Could not find package {wanted} in {uri} (at {short}).");

    let versions: Vec<&str> =
        available.iter().filter(|(n, _)| n == name).map(|(_, v)| v.as_str()).collect();
    if !versions.is_empty() {
        msg.push_str(&format!("\nSource contains '{name}' at: {}", versions.join(", ")));
    } else if !available.is_empty() {
        let names: Vec<String> = available.iter().map(|(n, v)| format!("{n} ({v})")).collect();
        msg.push_str(&format!("\nSource contains: {}", names.join(", ")));
    } else {
        msg.push_str("\nSource does not contain any packages");
    }
    msg
}

impl GitpinError {
    /// Short, stable category label used in terminal output and logs.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::ToolMissing => "tool-missing",
            Self::ToolExecution { .. } => "tool-execution",
            Self::RevisionNotFound { .. } | Self::LockedRevisionNotFound { .. } => {
                "revision-not-found"
            }
            Self::OverridePathMissing { .. }
            | Self::OverrideBranchRequired { .. }
            | Self::OverrideBranchMismatch { .. } => "local-override",
            Self::PackageNotFoundInSource { .. } => "package-not-found",
            Self::HookFailure { .. } => "hook-failure",
            Self::ExtensionBuildFailure { .. } => "extension-build",
            Self::ManifestNotFound | Self::ManifestParse { .. } | Self::ManifestValidation { .. } => {
                "manifest"
            }
            Self::LockfileParse { .. } | Self::LockfileOutOfDate { .. } => "lockfile",
            Self::Config { .. } => "config",
            Self::Io(_) => "io",
            Self::Other { .. } => "other",
        }
    }
}

impl Clone for GitpinError {
    fn clone(&self) -> Self {
        match self {
            Self::ToolMissing => Self::ToolMissing,
            Self::ToolExecution {
                command,
                dir,
                stderr,
            } => Self::ToolExecution {
                command: command.clone(),
                dir: dir.clone(),
                stderr: stderr.clone(),
            },
            Self::RevisionNotFound {
                uri,
                specifier,
            } => Self::RevisionNotFound {
                uri: uri.clone(),
                specifier: specifier.clone(),
            },
            Self::LockedRevisionNotFound {
                uri,
                revision,
                location,
            } => Self::LockedRevisionNotFound {
                uri: uri.clone(),
                revision: revision.clone(),
                location: location.clone(),
            },
            Self::OverridePathMissing {
                name,
                uri,
                path,
            } => Self::OverridePathMissing {
                name: name.clone(),
                uri: uri.clone(),
                path: path.clone(),
            },
            Self::OverrideBranchRequired {
                name,
                uri,
                path,
            } => Self::OverrideBranchRequired {
                name: name.clone(),
                uri: uri.clone(),
                path: path.clone(),
            },
            Self::OverrideBranchMismatch {
                name,
                uri,
                path,
                actual,
                expected,
            } => Self::OverrideBranchMismatch {
                name: name.clone(),
                uri: uri.clone(),
                path: path.clone(),
                actual: actual.clone(),
                expected: expected.clone(),
            },
            Self::PackageNotFoundInSource {
                name,
                requirement,
                uri,
                revision,
                available,
            } => Self::PackageNotFoundInSource {
                name: name.clone(),
                requirement: requirement.clone(),
                uri: uri.clone(),
                revision: revision.clone(),
                available: available.clone(),
            },
            Self::HookFailure {
                phase,
                package,
                reason,
            } => Self::HookFailure {
                phase: phase.clone(),
                package: package.clone(),
                reason: reason.clone(),
            },
            Self::ExtensionBuildFailure {
                name,
                version,
                output,
            } => Self::ExtensionBuildFailure {
                name: name.clone(),
                version: version.clone(),
                output: output.clone(),
            },
            Self::ManifestNotFound => Self::ManifestNotFound,
            Self::ManifestParse {
                file,
                reason,
            } => Self::ManifestParse {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ManifestValidation {
                reason,
            } => Self::ManifestValidation {
                reason: reason.clone(),
            },
            Self::LockfileParse {
                file,
                reason,
            } => Self::LockfileParse {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::LockfileOutOfDate {
                reason,
            } => Self::LockfileOutOfDate {
                reason: reason.clone(),
            },
            Self::Config {
                message,
            } => Self::Config {
                message: message.clone(),
            },
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// An error prepared for display: the error itself plus optional details and a
/// suggestion for how to fix it.
#[derive(Debug)]
pub struct ErrorContext {
    pub error: GitpinError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: GitpinError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with colors.
    pub fn display(&self) {
        eprintln!(
            "{}{}: {}",
            "error".red().bold(),
            format!("[{}]", self.error.category()).red(),
            self.error
        );

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion attached.
///
/// The anyhow chain is walked so a [`GitpinError`] wrapped in `.context(...)`
/// is still recognized. Outer context messages are kept as details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(gitpin_error) = cause.downcast_ref::<GitpinError>() {
            let ctx = create_error_context(gitpin_error);
            // Context added on top of the typed error ends up in the details line
            let outer: Vec<String> = error
                .chain()
                .take_while(|c| c.downcast_ref::<GitpinError>().is_none())
                .map(ToString::to_string)
                .collect();
            if !outer.is_empty() && ctx.details.is_none() {
                return ctx.with_details(outer.join(": "));
            }
            return ctx;
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(GitpinError::Other {
                message: format!("{error:#}"),
            })
            .with_suggestion("Check the ownership and permissions of the cache and project directories");
        }
    }

    ErrorContext::new(GitpinError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: &GitpinError) -> ErrorContext {
    let ctx = ErrorContext::new(error.clone());
    match error {
        GitpinError::ToolMissing => ctx
            .with_suggestion("Install git from https://git-scm.com/ or your package manager (e.g., 'brew install git', 'apt install git')"),

        GitpinError::ToolExecution {
            command,
            ..
        } => ctx.with_suggestion(match command.split_whitespace().next().unwrap_or_default() {
            "clone" => "Check the repository URL and your network connection, and that you have access to the repository",
            "fetch" => "Check your network connection and repository access, then run the command again. The cache does not need to be cleaned",
            "worktree" => "The cached checkout may be damaged. Run 'gitpin cache clean' and install again",
            "submodule" => "Check that the submodule URLs in .gitmodules are reachable",
            _ => "Run the git command manually in the listed directory for more details",
        }),

        GitpinError::RevisionNotFound {
            ..
        } => ctx.with_suggestion(
            "Check the branch, tag or ref in gitpin.toml. Use 'git ls-remote <url>' to list what the remote has",
        ),

        GitpinError::LockedRevisionNotFound {
            ..
        } => ctx.with_suggestion(
            "Run 'gitpin update' to re-resolve the source, or make sure the local checkout contains the locked commit",
        ),

        GitpinError::OverridePathMissing {
            ..
        } => ctx.with_suggestion(
            "Fix the path in the [local] table of your gitpin config, or remove the override",
        ),

        GitpinError::OverrideBranchRequired {
            ..
        } => ctx.with_suggestion(
            "Add `branch = \"...\"` to the package in gitpin.toml, or set `disable_local_branch_check = true` in your gitpin config",
        ),

        GitpinError::OverrideBranchMismatch {
            expected,
            path,
            ..
        } => ctx.with_suggestion(format!("Run 'git checkout {expected}' in {path}")),

        GitpinError::PackageNotFoundInSource {
            name,
            available,
            ..
        } => match closest_name(name, available) {
            Some(candidate) => ctx.with_suggestion(format!("Did you mean '{candidate}'?")),
            None => ctx.with_suggestion(
                "Check the package name and version in gitpin.toml against what the repository provides",
            ),
        },

        GitpinError::HookFailure {
            ..
        } => ctx.with_suggestion(
            "Fix the hook command in gitpin.toml. The cached checkout was kept, so the next install does not fetch again",
        ),

        GitpinError::ExtensionBuildFailure {
            ..
        } => ctx
            .with_details("The package source is pinned by the lockfile and no other variant of it will be installed")
            .with_suggestion("Inspect the build output above and install the missing build tools"),

        GitpinError::ManifestNotFound => {
            ctx.with_suggestion("Create a gitpin.toml in your project directory or pass --manifest-path")
        }

        GitpinError::ManifestParse {
            ..
        }
        | GitpinError::ManifestValidation {
            ..
        } => ctx.with_suggestion("Check the syntax of gitpin.toml"),

        GitpinError::LockfileParse {
            ..
        } => ctx.with_suggestion("Delete gitpin.lock and run 'gitpin install' to regenerate it"),

        GitpinError::LockfileOutOfDate {
            ..
        } => ctx.with_suggestion("Run 'gitpin install' without --frozen and commit the updated gitpin.lock"),

        GitpinError::Config {
            ..
        }
        | GitpinError::Io(_)
        | GitpinError::Other {
            ..
        } => ctx,
    }
}

/// The available package name closest to a misspelled `name`.
fn closest_name<'a>(name: &str, available: &'a [(String, String)]) -> Option<&'a str> {
    available
        .iter()
        .map(|(candidate, _)| (candidate.as_str(), strsim::levenshtein(name, candidate)))
        .filter(|(candidate, distance)| *candidate != name && *distance <= 3)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}
