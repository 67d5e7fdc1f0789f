//! Plain-text projection of the current analysis state.
//!
//! Stateless: everything here reads a snapshot and returns a string.

use std::fmt::Write;

use crate::analysis::AnalysisResult;
use crate::handle::PreviewHandle;
use crate::machine::OperationState;

const NO_EXTRACTED_TEXT: &str = "No text extracted";
const NO_REDACTED_TEXT: &str = "No text redacted";

/// Everything a presenter needs to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    pub state: OperationState,
    pub file_name: Option<&'a str>,
    pub result: Option<&'a AnalysisResult>,
    pub original_preview: Option<&'a PreviewHandle>,
}

pub fn render_view(view: &View<'_>) -> String {
    let mut out = String::new();

    if let Some(name) = view.file_name {
        let _ = writeln!(out, "Selected file: {}", name);
    }
    if let Some(handle) = view.original_preview {
        let _ = writeln!(out, "Original image: {}", handle.url());
    }
    if view.state.is_loading() {
        let _ = writeln!(out, "Processing document...");
    }
    if let Some(result) = view.result {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&render_result(result));
    }

    out
}

/// Render a finished analysis the way the results panel lays it out
pub fn render_result(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let risk = &result.risk_assessment;

    let _ = writeln!(out, "Analysis Results");
    let _ = writeln!(out);
    let _ = writeln!(out, "Risk Assessment");
    let _ = writeln!(
        out,
        "  [{}] {} Risk",
        risk.risk_level.style().as_str(),
        risk.risk_level
    );
    let _ = writeln!(
        out,
        "  Found {} PII items (Score: {})",
        risk.pii_count, risk.risk_score
    );

    if !result.detected_pii.is_empty() {
        let width = result
            .detected_pii
            .iter()
            .map(|p| p.kind.chars().count())
            .max()
            .unwrap_or(0)
            .max("Type".len());

        let _ = writeln!(out);
        let _ = writeln!(out, "Detected PII");
        let _ = writeln!(out, "  {:<width$}  Value", "Type");
        for pii in &result.detected_pii {
            let _ = writeln!(out, "  {:<width$}  {}", pii.kind, pii.value);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Extracted Text");
    let _ = writeln!(out, "{}", or_fallback(&result.extracted_text, NO_EXTRACTED_TEXT));
    let _ = writeln!(out);
    let _ = writeln!(out, "Redacted Text");
    let _ = writeln!(out, "{}", or_fallback(&result.redacted_text, NO_REDACTED_TEXT));

    if let Some(handle) = &result.redacted_image {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", render_redacted_image(handle));
    }

    out
}

/// One-line summary of a redacted-image handle
pub fn render_redacted_image(handle: &PreviewHandle) -> String {
    format!(
        "Redacted image: {} ({}, {} bytes)",
        handle.url(),
        handle.media_type,
        handle.size_bytes
    )
}

fn or_fallback<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.is_empty() { fallback } else { text }
}
