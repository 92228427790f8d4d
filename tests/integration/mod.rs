//! Integration test suite for gitpin
//!
//! These tests drive the `gitpin` binary against real git repositories created
//! in temporary directories. Each test gets its own cache and global config
//! through `GITPIN_CACHE_DIR` and `GITPIN_CONFIG_PATH`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **install**: first installs, reinstalls, lockfile stability, environment
//! - **frozen**: `install --frozen`
//! - **update**: re-resolution, force-pushed branches, selective updates
//! - **overrides**: local overrides and the branch check
//! - **submodules**: the `submodules` flag
//! - **concurrency**: parallel resolution and processes sharing a cache
//! - **hooks**: install hooks and extension builds
//! - **commands**: `cache` and `config`

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod commands;
mod concurrency;
mod frozen;
mod hooks;
mod install;
mod overrides;
mod submodules;
mod update;
