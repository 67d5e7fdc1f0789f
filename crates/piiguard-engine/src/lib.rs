mod orchestrator;

pub use orchestrator::{ANALYSIS_FAILED_MESSAGE, Completion, Notice, UploadOrchestrator};
