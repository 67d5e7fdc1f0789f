//! The document chosen for analysis

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Extensions the analysis service accepts, lowercase and without the dot
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "pdf"];

/// Coarse classification of a selected file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Document,
}

/// A single selected document: payload, declared media type and display name.
///
/// The payload is shared so in-flight calls can hold it without copying.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    media_type: String,
    content: Arc<[u8]>,
}

impl SelectedFile {
    /// Build a file from already-validated parts
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        content: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            content: content.into(),
        }
    }

    /// Validate a named payload against the accepted types and guess its media type
    pub fn from_bytes(name: impl Into<String>, content: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let extension = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::UnsupportedFile(name));
        }
        if content.is_empty() {
            return Err(Error::EmptyFile(name));
        }

        let media_type = mime_guess::from_ext(&extension)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::new(name, media_type, content))
    }

    /// Read and validate a file from disk, rejecting anything over `max_bytes`
    pub async fn from_path(path: &Path, max_bytes: usize) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::UnsupportedFile(path.display().to_string()))?
            .to_string();

        let size = tokio::fs::metadata(path).await?.len() as usize;
        if size > max_bytes {
            return Err(Error::FileTooLarge {
                name,
                size,
                limit: max_bytes,
            });
        }

        let content = tokio::fs::read(path).await?;
        Self::from_bytes(name, content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn shared_content(&self) -> Arc<[u8]> {
        Arc::clone(&self.content)
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn kind(&self) -> MediaKind {
        if self.is_image() {
            MediaKind::Image
        } else {
            MediaKind::Document
        }
    }
}
