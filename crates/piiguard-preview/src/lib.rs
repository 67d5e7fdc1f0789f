//! Preview resources for piiguard
//!
//! This crate provides:
//! - An in-memory store that issues preview handles for binary content
//! - The original/redacted slot discipline (release before replace)
//! - Guaranteed release of every live handle when the store is dropped

pub mod store;

pub use store::{PreviewStats, PreviewStore};
