use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use piiguard_client::{AnalysisService, RedactedImage, ServiceError};
use piiguard_core::{AnalysisResult, OperationState, PreviewSlot, RiskLevel, SelectedFile};
use piiguard_engine::{ANALYSIS_FAILED_MESSAGE, UploadOrchestrator};
use tokio::sync::oneshot;

/// How a scripted call answers
enum Reply<T> {
    Now(Result<T, ServiceError>),
    Later(oneshot::Receiver<Result<T, ServiceError>>),
    Never,
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T, ServiceError> {
        match self {
            Reply::Now(outcome) => outcome,
            Reply::Later(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ServiceError::MalformedResponse("gate dropped".into()))),
            Reply::Never => std::future::pending().await,
        }
    }
}

/// In-process service that answers per file name and records every call.
///
/// Replies are keyed by file name so the order in which pending calls get
/// polled does not matter.
#[derive(Default)]
struct ScriptedService {
    analyze: Mutex<HashMap<String, VecDeque<Reply<AnalysisResult>>>>,
    redact: Mutex<HashMap<String, VecDeque<Reply<RedactedImage>>>>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl ScriptedService {
    fn on_analyze(&self, file: &str, reply: Reply<AnalysisResult>) -> &Self {
        self.analyze
            .lock()
            .unwrap()
            .entry(file.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    fn on_redact(&self, file: &str, reply: Reply<RedactedImage>) -> &Self {
        self.redact
            .lock()
            .unwrap()
            .entry(file.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    fn calls(&self, endpoint: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, name)| name.clone())
            .collect()
    }
}

fn next_reply<T>(
    replies: &Mutex<HashMap<String, VecDeque<Reply<T>>>>,
    file: &SelectedFile,
) -> Reply<T> {
    replies
        .lock()
        .unwrap()
        .get_mut(file.name())
        .and_then(|queue| queue.pop_front())
        .unwrap_or(Reply::Never)
}

#[async_trait]
impl AnalysisService for ScriptedService {
    async fn analyze(&self, file: &SelectedFile) -> Result<AnalysisResult, ServiceError> {
        self.calls.lock().unwrap().push(("analyze", file.name().to_string()));
        let reply = next_reply(&self.analyze, file);
        reply.resolve().await
    }

    async fn redact_image(&self, file: &SelectedFile) -> Result<RedactedImage, ServiceError> {
        self.calls.lock().unwrap().push(("redact", file.name().to_string()));
        let reply = next_reply(&self.redact, file);
        reply.resolve().await
    }
}

fn orchestrator(service: &Arc<ScriptedService>) -> UploadOrchestrator {
    UploadOrchestrator::new(service.clone(), Duration::from_secs(5))
}

fn png(name: &str) -> SelectedFile {
    SelectedFile::from_bytes(name, vec![0x89, b'P', b'N', b'G']).unwrap()
}

fn pdf(name: &str) -> SelectedFile {
    SelectedFile::from_bytes(name, b"%PDF-1.4".to_vec()).unwrap()
}

fn high_risk() -> AnalysisResult {
    AnalysisResult::from_json(
        br#"{
            "risk_assessment": {"risk_level": "High", "pii_count": 1, "risk_score": 9.2},
            "detected_pii": [{"type": "EMAIL", "value": "a@b.com"}],
            "extracted_text": "mail a@b.com",
            "redacted_text": "mail [EMAIL]"
        }"#,
    )
    .unwrap()
}

fn text_only(text: &str) -> AnalysisResult {
    AnalysisResult {
        extracted_text: text.to_string(),
        ..Default::default()
    }
}

fn image(bytes: &[u8]) -> RedactedImage {
    RedactedImage {
        content: bytes.to_vec(),
        media_type: "image/png".to_string(),
    }
}

#[tokio::test]
async fn test_image_cycle_attaches_redacted_image() {
    let service = Arc::new(ScriptedService::default());
    service
        .on_analyze("photo.png", Reply::Now(Ok(high_risk())))
        .on_redact("photo.png", Reply::Now(Ok(image(b"BBBB"))));
    let mut orch = orchestrator(&service);

    let state = orch.analyze(png("photo.png")).await;

    assert_eq!(state, OperationState::Done);
    let result = orch.result().unwrap();
    assert_eq!(result.risk_assessment.risk_level, RiskLevel::High);
    assert_eq!(result.detected_pii[0].kind, "EMAIL");
    assert_eq!(orch.redacted_image(), Some(&b"BBBB"[..]));
    assert_eq!(
        result.redacted_image.as_ref(),
        orch.previews().slot(PreviewSlot::Redacted)
    );

    assert!(orch.original_preview().is_some());
    assert!(orch.redacted_preview().is_some());
    assert_eq!(orch.previews().live_count(), 2);
    assert!(orch.notice().is_none());
    assert_eq!(service.calls("redact"), vec!["photo.png"]);
}

#[tokio::test]
async fn test_document_cycle_never_redacts() {
    let service = Arc::new(ScriptedService::default());
    service.on_analyze("doc.pdf", Reply::Now(Ok(text_only("invoice"))));
    let mut orch = orchestrator(&service);

    let state = orch.analyze(pdf("doc.pdf")).await;

    assert_eq!(state, OperationState::Done);
    assert_eq!(orch.result().unwrap().extracted_text, "invoice");
    assert!(orch.result().unwrap().redacted_image.is_none());
    assert!(orch.original_preview().is_none());
    assert_eq!(orch.previews().live_count(), 0);
    assert!(service.calls("redact").is_empty());
}

#[tokio::test]
async fn test_analysis_failure_notifies_user() {
    let service = Arc::new(ScriptedService::default());
    service.on_analyze("doc.pdf", Reply::Now(Err(ServiceError::Status {
        status: 500,
        body: "Internal Server Error".to_string(),
    })));
    let mut orch = orchestrator(&service);

    let state = orch.analyze(pdf("doc.pdf")).await;

    assert_eq!(state, OperationState::Failed);
    assert!(orch.result().is_none());
    let notice = orch.notice().unwrap();
    assert_eq!(notice.message, ANALYSIS_FAILED_MESSAGE);
    assert!(notice.detail.contains("500"));
    assert!(service.calls("redact").is_empty());
}

#[tokio::test]
async fn test_redaction_failure_keeps_result() {
    let service = Arc::new(ScriptedService::default());
    service
        .on_analyze("photo.png", Reply::Now(Ok(high_risk())))
        .on_redact("photo.png", Reply::Now(Err(ServiceError::Status {
            status: 400,
            body: "Unsupported file type".to_string(),
        })));
    let mut orch = orchestrator(&service);

    let state = orch.analyze(png("photo.png")).await;

    assert_eq!(state, OperationState::Done);
    assert!(orch.result().is_some());
    assert!(orch.result().unwrap().redacted_image.is_none());
    assert!(orch.redacted_preview().is_none());
    assert!(orch.notice().is_none());
}

#[tokio::test]
async fn test_result_visible_while_redacting() {
    let service = Arc::new(ScriptedService::default());
    let (gate, rx) = oneshot::channel();
    service
        .on_analyze("photo.png", Reply::Now(Ok(high_risk())))
        .on_redact("photo.png", Reply::Later(rx));
    let mut orch = orchestrator(&service);

    orch.select_file(png("photo.png"));
    assert!(orch.start_analysis());
    assert!(orch.is_loading());

    let completion = orch.next_completion().await.unwrap();
    orch.handle_completion(completion);
    assert_eq!(orch.state(), OperationState::ImageRedacting);
    assert!(orch.is_loading());
    assert!(orch.result().is_some());

    gate.send(Ok(image(b"R"))).unwrap();
    orch.settle().await;
    assert_eq!(orch.state(), OperationState::Done);
    assert!(!orch.is_loading());
    assert_eq!(orch.redacted_image(), Some(&b"R"[..]));
}

#[tokio::test]
async fn test_late_analysis_from_previous_file_is_ignored() {
    let service = Arc::new(ScriptedService::default());
    let (old_gate, old_rx) = oneshot::channel();
    service
        .on_analyze("first.png", Reply::Later(old_rx))
        .on_analyze("second.pdf", Reply::Now(Ok(text_only("newest"))));
    let mut orch = orchestrator(&service);

    orch.select_file(png("first.png"));
    assert!(orch.start_analysis());

    orch.select_file(pdf("second.pdf"));
    assert_eq!(orch.state(), OperationState::FileSelected);
    assert!(orch.start_analysis());

    let completion = orch.next_completion().await.unwrap();
    orch.handle_completion(completion);
    assert_eq!(orch.state(), OperationState::Done);

    old_gate.send(Ok(text_only("stale"))).unwrap();
    orch.settle().await;

    assert_eq!(orch.state(), OperationState::Done);
    assert_eq!(orch.result().unwrap().extracted_text, "newest");
    assert!(service.calls("redact").is_empty());
    assert!(orch.original_preview().is_none());
}

#[tokio::test]
async fn test_late_failure_from_previous_file_is_ignored() {
    let service = Arc::new(ScriptedService::default());
    let (old_gate, old_rx) = oneshot::channel();
    service.on_analyze("first.pdf", Reply::Later(old_rx));
    let mut orch = orchestrator(&service);

    orch.select_file(pdf("first.pdf"));
    orch.start_analysis();
    orch.select_file(pdf("second.pdf"));

    old_gate
        .send(Err(ServiceError::MalformedResponse("late".into())))
        .unwrap();
    orch.settle().await;

    assert_eq!(orch.state(), OperationState::FileSelected);
    assert!(orch.notice().is_none());
}

#[tokio::test]
async fn test_late_redaction_after_reselect_is_ignored() {
    let service = Arc::new(ScriptedService::default());
    let (gate, rx) = oneshot::channel();
    service
        .on_analyze("first.png", Reply::Now(Ok(high_risk())))
        .on_redact("first.png", Reply::Later(rx));
    let mut orch = orchestrator(&service);

    orch.select_file(png("first.png"));
    orch.start_analysis();
    let completion = orch.next_completion().await.unwrap();
    orch.handle_completion(completion);
    assert_eq!(orch.state(), OperationState::ImageRedacting);

    orch.select_file(png("second.png"));
    gate.send(Ok(image(b"old"))).unwrap();
    orch.settle().await;

    assert_eq!(orch.state(), OperationState::FileSelected);
    assert!(orch.redacted_preview().is_none());
    assert!(orch.result().unwrap().redacted_image.is_none());
    // Only the second file's original preview is alive
    assert_eq!(orch.previews().live_count(), 1);
}

#[tokio::test]
async fn test_reselecting_images_replaces_original_preview() {
    let service = Arc::new(ScriptedService::default());
    let mut orch = orchestrator(&service);

    orch.select_file(png("a.png"));
    let first = orch.original_preview().cloned().unwrap();

    orch.select_file(png("b.png"));
    let second = orch.original_preview().cloned().unwrap();
    assert_ne!(first.id, second.id);
    assert!(!orch.previews().is_live(&first));
    assert!(orch.previews().is_live(&second));
    assert_eq!(orch.previews().live_count(), 1);

    orch.select_file(pdf("c.pdf"));
    assert!(orch.original_preview().is_none());

    let stats = orch.previews().stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.released, 2);
    assert_eq!(stats.live, 0);
}

#[tokio::test]
async fn test_reanalysis_releases_previous_redacted_image() {
    let service = Arc::new(ScriptedService::default());
    service
        .on_analyze("photo.png", Reply::Now(Ok(high_risk())))
        .on_redact("photo.png", Reply::Now(Ok(image(b"one"))))
        .on_analyze("photo.png", Reply::Never);
    let mut orch = orchestrator(&service);

    orch.analyze(png("photo.png")).await;
    let old = orch.redacted_preview().cloned().unwrap();

    assert!(orch.start_analysis());
    assert!(orch.result().is_none());
    assert!(!orch.previews().is_live(&old));
    assert!(orch.redacted_preview().is_none());
    assert_eq!(orch.previews().live_count(), 1);
}

#[tokio::test]
async fn test_analyze_without_file_does_nothing() {
    let service = Arc::new(ScriptedService::default());
    let mut orch = orchestrator(&service);

    assert!(!orch.start_analysis());
    assert_eq!(orch.state(), OperationState::Idle);
    assert!(!orch.has_pending_calls());
    assert!(service.calls("analyze").is_empty());
}

#[tokio::test]
async fn test_analyze_ignored_while_busy() {
    let service = Arc::new(ScriptedService::default());
    service.on_analyze("doc.pdf", Reply::Never);
    let mut orch = orchestrator(&service);

    orch.select_file(pdf("doc.pdf"));
    assert!(orch.start_analysis());
    assert!(!orch.start_analysis());
    assert_eq!(orch.state(), OperationState::Analyzing);
}

#[tokio::test]
async fn test_analysis_timeout_fails_cycle() {
    let service = Arc::new(ScriptedService::default());
    service.on_analyze("doc.pdf", Reply::Never);
    let mut orch = UploadOrchestrator::new(service.clone(), Duration::from_millis(50));

    let state = orch.analyze(pdf("doc.pdf")).await;

    assert_eq!(state, OperationState::Failed);
    assert!(orch.notice().unwrap().detail.contains("timed out"));
}

#[tokio::test]
async fn test_redaction_timeout_is_silent() {
    let service = Arc::new(ScriptedService::default());
    service
        .on_analyze("photo.png", Reply::Now(Ok(high_risk())))
        .on_redact("photo.png", Reply::Never);
    let mut orch = UploadOrchestrator::new(service.clone(), Duration::from_millis(50));

    let state = orch.analyze(png("photo.png")).await;

    assert_eq!(state, OperationState::Done);
    assert!(orch.result().is_some());
    assert!(orch.redacted_image().is_none());
    assert!(orch.notice().is_none());
}

#[tokio::test]
async fn test_missing_detections_default_to_empty() {
    let service = Arc::new(ScriptedService::default());
    let sparse = AnalysisResult::from_json(
        br#"{"risk_assessment": {"risk_level": "Low", "pii_count": 0, "risk_score": 0}}"#,
    )
    .unwrap();
    service.on_analyze("doc.pdf", Reply::Now(Ok(sparse)));
    let mut orch = orchestrator(&service);

    orch.analyze(pdf("doc.pdf")).await;

    let result = orch.result().unwrap();
    assert!(result.detected_pii.is_empty());
    assert!(result.extracted_text.is_empty());
}

#[tokio::test]
async fn test_teardown_releases_all_handles() {
    let service = Arc::new(ScriptedService::default());
    service
        .on_analyze("photo.png", Reply::Now(Ok(high_risk())))
        .on_redact("photo.png", Reply::Now(Ok(image(b"B"))));
    let mut orch = orchestrator(&service);

    orch.analyze(png("photo.png")).await;
    assert_eq!(orch.previews().live_count(), 2);

    orch.teardown();

    let stats = orch.previews().stats();
    assert_eq!(stats.live, 0);
    assert_eq!(stats.created, stats.released);
    assert_eq!(orch.state(), OperationState::Idle);
    assert!(orch.file().is_none());
    assert!(orch.result().is_none());
}
