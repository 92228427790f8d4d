//! Core types shared across gitpin: the error taxonomy and its user-facing
//! rendering.

pub mod error;

pub use error::{ErrorContext, GitpinError, user_friendly_error};
