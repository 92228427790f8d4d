//! gitpin - git-backed source resolution and caching
//!
//! gitpin installs packages that live in git repositories. A project declares
//! its packages in `gitpin.toml`, each against a repository and optionally a
//! branch, tag or revision. gitpin resolves every repository to an exact
//! commit, records it in `gitpin.lock`, and keeps a bare clone plus one
//! checkout per commit in a cache shared by all projects of the user.
//!
//! # Architecture Overview
//!
//! - `gitpin.toml` declares packages and where they come from
//! - `gitpin.lock` records the commit every repository was resolved to
//! - Repositories are fetched with the system `git`; nothing else talks to the
//!   network
//! - A repository declared by several packages is cloned and fetched once
//! - A developer can point a repository at a local working directory (a local
//!   override) through the global config, without touching project files
//!
//! # Core Modules
//!
//! ## Git and cache
//! - [`git`] - subprocess wrapper around the system git, URL normalization
//! - [`cache`] - bare clones, per-commit checkouts and cross-process locks
//! - [`resolver`] - branch, tag and revision resolution to commits
//!
//! ## Sources
//! - [`source`] - source manager: override handling, clone and checkout
//! - [`metadata`] - package discovery inside checkouts, with an on-disk cache
//!
//! ## Project files
//! - [`manifest`] - `gitpin.toml`
//! - [`lockfile`] - `gitpin.lock`
//! - [`config`] - global configuration and local override bindings
//!
//! ## Installation
//! - [`installer`] - orchestrates one install or update
//! - [`hooks`] - install hooks and extension builds
//!
//! ## Supporting modules
//! - [`cli`] - command-line interface
//! - [`core`] - error taxonomy and user-facing error rendering
//! - [`models`] - repository specs, references and resolved revisions
//! - [`utils`] - atomic writes and progress output
//!
//! # Manifest Format (gitpin.toml)
//!
//! ```toml
//! [packages.rack]
//! git = "https://github.com/rack/rack.git"
//! branch = "main"
//!
//! [packages.rack-test]
//! git = "https://github.com/rack/rack.git"   # same repository, fetched once
//! branch = "main"
//!
//! [packages.sinatra]
//! git = "https://github.com/sinatra/sinatra.git"
//! tag = "v4.0.0"
//! version = "4.0.0"
//!
//! [packages.helpers]
//! path = "vendor/helpers"
//!
//! [hooks]
//! post-install = ["echo installed $GITPIN_PACKAGE_FULL_NAME"]
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! gitpin install              # install, honoring gitpin.lock
//! gitpin install --frozen     # fail instead of changing gitpin.lock
//! gitpin update               # move every repository to its latest commit
//! gitpin update rack          # only the repository providing rack
//! gitpin config set-local rack ~/src/rack
//! gitpin cache info
//! ```
//!
//! # Environment
//!
//! - `GITPIN_CACHE_DIR` - cache location (default `~/.gitpin/cache`)
//! - `GITPIN_CONFIG_PATH` - global config file (default `~/.gitpin/config.toml`)
//! - `RUST_LOG` - log filter, overriding `--verbose` and `--quiet`

// Git and cache
pub mod cache;
pub mod git;
pub mod resolver;

// Sources
pub mod metadata;
pub mod source;

// Project files
pub mod config;
pub mod lockfile;
pub mod manifest;

// Installation
pub mod hooks;
pub mod installer;

// Supporting modules
pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
