//! Core domain models and logic for piiguard
//!
//! This crate contains:
//! - The selected file and its media classification
//! - The analysis result model and defensive response parsing
//! - Preview handle types
//! - The upload cycle state machine
//! - Plain-text rendering of results

pub mod analysis;
pub mod error;
pub mod file;
pub mod handle;
pub mod machine;
pub mod render;

pub use analysis::{AnalysisResult, DetectedPii, RiskAssessment, RiskLevel, RiskStyle};
pub use error::{Error, Result};
pub use file::{ACCEPTED_EXTENSIONS, MediaKind, SelectedFile};
pub use handle::{PreviewHandle, PreviewSlot};
pub use machine::{Cycle, Effect, Event, Generation, OperationState};
