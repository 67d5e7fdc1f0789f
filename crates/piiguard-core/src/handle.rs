//! Preview handles: opaque references to binary content held by a preview store

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The two places a preview can live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewSlot {
    Original,
    Redacted,
}

impl PreviewSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewSlot::Original => "original",
            PreviewSlot::Redacted => "redacted",
        }
    }
}

/// Process-local reference to binary content.
///
/// A handle carries no bytes; the store that issued it owns the content
/// until the handle is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewHandle {
    pub id: Uuid,
    pub media_type: String,
    pub size_bytes: usize,
    pub digest: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

impl PreviewHandle {
    pub fn new(media_type: String, size_bytes: usize, digest: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            media_type,
            size_bytes,
            digest,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// URL-style name for the handle, stable for its lifetime
    pub fn url(&self) -> String {
        format!("blob:piiguard/{}", self.id)
    }
}
