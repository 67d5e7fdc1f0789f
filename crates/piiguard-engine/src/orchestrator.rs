//! Upload orchestrator.
//!
//! Owns the selected file, the preview slots and the in-flight calls, and
//! drives the cycle state machine. Calls are polled on the caller's task; no
//! work is spawned.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use piiguard_client::{AnalysisService, RedactedImage, ServiceError};
use piiguard_core::render::View;
use piiguard_core::{
    AnalysisResult, Cycle, Effect, Event, Generation, OperationState, PreviewHandle, PreviewSlot,
    SelectedFile,
};
use piiguard_preview::PreviewStore;
use tracing::{debug, error, info, warn};

/// Message shown to the user when an analysis cycle fails
pub const ANALYSIS_FAILED_MESSAGE: &str = "Error processing file. Please try again.";

/// User-visible failure notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub detail: String,
}

/// A finished network call, stamped with the generation it was issued under
#[derive(Debug)]
pub enum Completion {
    Analyzed {
        generation: Generation,
        outcome: Result<AnalysisResult, ServiceError>,
    },
    Redacted {
        generation: Generation,
        outcome: Result<RedactedImage, ServiceError>,
    },
}

impl Completion {
    pub fn generation(&self) -> Generation {
        match self {
            Completion::Analyzed { generation, .. } | Completion::Redacted { generation, .. } => {
                *generation
            }
        }
    }
}

/// Data an effect may consume while a transition is executed
enum Payload {
    None,
    Analysis(AnalysisResult),
    Redaction(RedactedImage),
    Failure(String),
}

impl Payload {
    fn take(&mut self) -> Payload {
        std::mem::replace(self, Payload::None)
    }
}

pub struct UploadOrchestrator {
    service: Arc<dyn AnalysisService>,
    request_timeout: Duration,
    cycle: Cycle,
    file: Option<SelectedFile>,
    result: Option<AnalysisResult>,
    notice: Option<Notice>,
    previews: PreviewStore,
    inflight: FuturesUnordered<BoxFuture<'static, Completion>>,
}

impl UploadOrchestrator {
    pub fn new(service: Arc<dyn AnalysisService>, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
            cycle: Cycle::new(),
            file: None,
            result: None,
            notice: None,
            previews: PreviewStore::new(),
            inflight: FuturesUnordered::new(),
        }
    }

    /// Replace the selected file. Calls issued for the previous file become stale.
    pub fn select_file(&mut self, file: SelectedFile) {
        let kind = file.kind();
        info!(file = file.name(), media_type = file.media_type(), "file selected");
        self.file = Some(file);
        self.dispatch(Event::FileSelected { kind }, Payload::None);
    }

    /// Begin analyzing the selected file. Returns false when nothing was started
    /// (no file selected, or a cycle is still running).
    pub fn start_analysis(&mut self) -> bool {
        let before = self.cycle.generation;
        self.dispatch(Event::AnalyzeRequested, Payload::None);
        self.cycle.state == OperationState::Analyzing && self.cycle.generation != before
    }

    /// Select, analyze and wait for every outstanding call
    pub async fn analyze(&mut self, file: SelectedFile) -> OperationState {
        self.select_file(file);
        self.start_analysis();
        self.settle().await;
        self.state()
    }

    /// Wait for the next in-flight call to finish. `None` when nothing is pending.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        if self.inflight.is_empty() {
            return None;
        }
        self.inflight.next().await
    }

    /// Apply a finished call, discarding it if a newer selection superseded it
    pub fn handle_completion(&mut self, completion: Completion) {
        let generation = completion.generation();
        if !self.cycle.is_current(generation) {
            debug!(
                generation,
                current = self.cycle.generation,
                "discarding stale response"
            );
            return;
        }

        match completion {
            Completion::Analyzed { outcome, .. } => match outcome {
                Ok(result) => {
                    if !result.pii_count_matches() {
                        debug!(
                            reported = result.risk_assessment.pii_count,
                            detected = result.detected_pii.len(),
                            "pii count disagrees with detections"
                        );
                    }
                    self.dispatch(
                        Event::AnalyzeSucceeded { generation },
                        Payload::Analysis(result),
                    )
                }
                Err(e) => self.dispatch(
                    Event::AnalyzeFailed { generation },
                    Payload::Failure(e.to_string()),
                ),
            },
            Completion::Redacted { outcome, .. } => match outcome {
                Ok(image) => self.dispatch(
                    Event::RedactSucceeded { generation },
                    Payload::Redaction(image),
                ),
                Err(e) => {
                    warn!(error = %e, "redacted image unavailable");
                    self.dispatch(Event::RedactFailed { generation }, Payload::None)
                }
            },
        }
    }

    /// Drive every in-flight call to completion
    pub async fn settle(&mut self) {
        while let Some(completion) = self.next_completion().await {
            self.handle_completion(completion);
        }
    }

    /// Drop pending calls and release every preview handle
    pub fn teardown(&mut self) {
        self.inflight = FuturesUnordered::new();
        self.dispatch(Event::Teardown, Payload::None);
        self.file = None;
        self.previews.release_all();
    }

    pub fn state(&self) -> OperationState {
        self.cycle.state
    }

    pub fn generation(&self) -> Generation {
        self.cycle.generation
    }

    pub fn is_loading(&self) -> bool {
        self.cycle.state.is_loading()
    }

    pub fn has_pending_calls(&self) -> bool {
        !self.inflight.is_empty()
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    pub fn original_preview(&self) -> Option<&PreviewHandle> {
        self.previews.slot(PreviewSlot::Original)
    }

    pub fn redacted_preview(&self) -> Option<&PreviewHandle> {
        self.previews.slot(PreviewSlot::Redacted)
    }

    /// Bytes behind the redacted-image handle attached to the current result
    pub fn redacted_image(&self) -> Option<&[u8]> {
        let handle = self.result.as_ref()?.redacted_image.as_ref()?;
        self.previews.content(handle)
    }

    pub fn view(&self) -> View<'_> {
        View {
            state: self.cycle.state,
            file_name: self.file.as_ref().map(|f| f.name()),
            result: self.result.as_ref(),
            original_preview: self.original_preview(),
        }
    }

    fn dispatch(&mut self, event: Event, mut payload: Payload) {
        let from = self.cycle;
        let (next, effects) = from.transition(event);

        if next == from && effects.is_empty() {
            debug!(state = from.state.as_str(), ?event, "event ignored");
            return;
        }

        info!(
            from = from.state.as_str(),
            to = next.state.as_str(),
            ?event,
            "upload state transition"
        );
        self.cycle = next;

        for effect in effects {
            self.execute(effect, &mut payload);
        }
    }

    fn execute(&mut self, effect: Effect, payload: &mut Payload) {
        debug!(?effect, "executing effect");
        match effect {
            Effect::InstallOriginalPreview => {
                if let Some(file) = &self.file {
                    self.previews.install(
                        PreviewSlot::Original,
                        file.shared_content(),
                        file.media_type(),
                    );
                }
            }
            Effect::ReleasePreview(slot) => {
                self.previews.clear(slot);
            }
            Effect::ClearResult => {
                self.result = None;
                self.notice = None;
            }
            Effect::IssueAnalyze { generation } => self.issue_analyze(generation),
            Effect::PublishResult => {
                if let Payload::Analysis(result) = payload.take() {
                    self.result = Some(result);
                }
            }
            Effect::IssueRedact { generation } => self.issue_redact(generation),
            Effect::AttachRedactedPreview => {
                let Payload::Redaction(image) = payload.take() else {
                    return;
                };
                let Some(result) = self.result.as_mut() else {
                    return;
                };
                let handle =
                    self.previews
                        .install(PreviewSlot::Redacted, image.content, &image.media_type);
                result.redacted_image = Some(handle);
            }
            Effect::NotifyFailure => {
                let detail = match payload.take() {
                    Payload::Failure(detail) => detail,
                    _ => String::new(),
                };
                error!(error = %detail, "analysis failed");
                self.notice = Some(Notice {
                    message: ANALYSIS_FAILED_MESSAGE.to_string(),
                    detail,
                });
            }
        }
    }

    fn issue_analyze(&mut self, generation: Generation) {
        let Some(file) = self.file.clone() else {
            return;
        };
        let service = Arc::clone(&self.service);
        let limit = self.request_timeout;

        debug!(generation, file = file.name(), "issuing analyze call");
        self.inflight.push(
            async move {
                let outcome = with_timeout(limit, service.analyze(&file)).await;
                Completion::Analyzed {
                    generation,
                    outcome,
                }
            }
            .boxed(),
        );
    }

    fn issue_redact(&mut self, generation: Generation) {
        let Some(file) = self.file.clone() else {
            return;
        };
        let service = Arc::clone(&self.service);
        let limit = self.request_timeout;

        debug!(generation, file = file.name(), "issuing redact-image call");
        self.inflight.push(
            async move {
                let outcome = with_timeout(limit, service.redact_image(&file)).await;
                Completion::Redacted {
                    generation,
                    outcome,
                }
            }
            .boxed(),
        );
    }
}

async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    match tokio::time::timeout(limit, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ServiceError::TimedOut(limit)),
    }
}
