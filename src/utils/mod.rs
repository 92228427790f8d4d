//! Small shared helpers: atomic file writes and terminal progress.

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir};
pub use progress::Spinner;
