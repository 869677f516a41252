use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Largest document accepted by [`RawDocument::from_path`].
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// One uploaded PDF, held only for the duration of an ingestion call.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub name: Option<String>,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { name: None, bytes }
    }

    pub fn named(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: Some(name.into()),
            bytes,
        }
    }

    /// Reads a `.pdf` file from disk, rejecting other extensions and oversized files.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(IngestError::InvalidArgument(format!(
                "not a pdf file: {}",
                path.display()
            )));
        }

        let size = fs::metadata(path)?.len();
        if size > MAX_DOCUMENT_BYTES {
            return Err(IngestError::DocumentTooLarge {
                size,
                limit: MAX_DOCUMENT_BYTES,
            });
        }

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);

        Ok(Self {
            name,
            bytes: fs::read(path)?,
        })
    }

    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<upload>")
    }
}

/// A contiguous slice of extracted text. `offset` counts chars, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub offset: usize,
    pub text: String,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A stored record returned by a similarity search, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantChunk {
    pub content: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub relevant: Vec<RelevantChunk>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitPhase {
    Uninitialized,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub phase: InitPhase,
    pub vector_store: bool,
    pub llm: bool,
    pub embedding: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.vector_store && self.llm && self.embedding
    }
}
