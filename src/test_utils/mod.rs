//! Helpers shared by unit tests and the integration suite.
//!
//! Compiled for `cfg(test)` and for the `test-utils` feature, which the crate's
//! dev-dependency on itself enables.

pub mod git_helper;

pub use git_helper::{TestGit, create_package_repo};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize tracing for a test run.
///
/// With `Some(level)` that level is used; otherwise logging is enabled only when
/// `RUST_LOG` is set. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=gitpin_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
