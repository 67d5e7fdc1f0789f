//! Upload cycle state machine.
//!
//! A pure transition function: no I/O, no handles, no clocks. The orchestrator
//! feeds events in and executes the effects that come out.

use serde::{Deserialize, Serialize};

use crate::file::MediaKind;
use crate::handle::PreviewSlot;

/// Monotonic stamp attached to every network call at issue time
pub type Generation = u64;

/// Phase of the current analysis cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Idle,
    FileSelected,
    Analyzing,
    /// Analysis result is already visible; waiting on the redacted image
    ImageRedacting,
    Done,
    Failed,
}

impl OperationState {
    /// Loading indicators are shown exactly in these states
    pub fn is_loading(self) -> bool {
        matches!(self, OperationState::Analyzing | OperationState::ImageRedacting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationState::Idle => "idle",
            OperationState::FileSelected => "file_selected",
            OperationState::Analyzing => "analyzing",
            OperationState::ImageRedacting => "image_redacting",
            OperationState::Done => "done",
            OperationState::Failed => "failed",
        }
    }
}

/// Inputs that drive the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// User picked a new file
    FileSelected { kind: MediaKind },
    /// User asked for the selected file to be analyzed
    AnalyzeRequested,
    AnalyzeSucceeded { generation: Generation },
    AnalyzeFailed { generation: Generation },
    RedactSucceeded { generation: Generation },
    RedactFailed { generation: Generation },
    /// Owner is going away
    Teardown,
}

/// Side effects produced by a transition, executed in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Wrap the selected file's bytes in a handle in the original slot
    InstallOriginalPreview,
    ReleasePreview(PreviewSlot),
    ClearResult,
    IssueAnalyze { generation: Generation },
    /// Make the parsed analysis result visible
    PublishResult,
    IssueRedact { generation: Generation },
    /// Wrap the redacted bytes in a handle and attach it to the result
    AttachRedactedPreview,
    NotifyFailure,
}

/// Snapshot of the cycle: phase, current generation and what kind of file is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub state: OperationState,
    pub generation: Generation,
    pub selection: Option<MediaKind>,
}

impl Default for Cycle {
    fn default() -> Self {
        Self {
            state: OperationState::Idle,
            generation: 0,
            selection: None,
        }
    }
}

impl Cycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a completion stamped with `generation` still belongs to this cycle
    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    pub fn transition(self, event: Event) -> (Cycle, Vec<Effect>) {
        use OperationState::*;

        match (self.state, event) {
            (_, Event::FileSelected { kind }) => {
                let effects = match kind {
                    MediaKind::Image => vec![Effect::InstallOriginalPreview],
                    MediaKind::Document => vec![Effect::ReleasePreview(PreviewSlot::Original)],
                };
                (
                    Cycle {
                        state: FileSelected,
                        generation: self.generation + 1,
                        selection: Some(kind),
                    },
                    effects,
                )
            }

            (FileSelected | Done | Failed, Event::AnalyzeRequested) if self.selection.is_some() => {
                let generation = self.generation + 1;
                (
                    Cycle {
                        state: Analyzing,
                        generation,
                        ..self
                    },
                    vec![
                        Effect::ClearResult,
                        Effect::ReleasePreview(PreviewSlot::Redacted),
                        Effect::IssueAnalyze { generation },
                    ],
                )
            }

            (Analyzing, Event::AnalyzeSucceeded { generation }) if self.is_current(generation) => {
                match self.selection {
                    Some(MediaKind::Image) => (
                        Cycle {
                            state: ImageRedacting,
                            ..self
                        },
                        vec![Effect::PublishResult, Effect::IssueRedact { generation }],
                    ),
                    _ => (
                        Cycle {
                            state: Done,
                            ..self
                        },
                        vec![Effect::PublishResult],
                    ),
                }
            }

            (Analyzing, Event::AnalyzeFailed { generation }) if self.is_current(generation) => (
                Cycle {
                    state: Failed,
                    ..self
                },
                vec![Effect::NotifyFailure],
            ),

            (ImageRedacting, Event::RedactSucceeded { generation })
                if self.is_current(generation) =>
            {
                (
                    Cycle {
                        state: Done,
                        ..self
                    },
                    vec![Effect::AttachRedactedPreview],
                )
            }

            // Partial failure: the result stays as published, nothing is surfaced
            (ImageRedacting, Event::RedactFailed { generation }) if self.is_current(generation) => (
                Cycle {
                    state: Done,
                    ..self
                },
                Vec::new(),
            ),

            (_, Event::Teardown) => (
                Cycle {
                    state: Idle,
                    generation: self.generation + 1,
                    selection: None,
                },
                vec![
                    Effect::ClearResult,
                    Effect::ReleasePreview(PreviewSlot::Redacted),
                    Effect::ReleasePreview(PreviewSlot::Original),
                ],
            ),

            // Stale completions, analyze while busy or without a file
            _ => (self, Vec::new()),
        }
    }
}
