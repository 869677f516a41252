use crate::chunking::{split_texts, ChunkingConfig};
use crate::context::RagContext;
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::{IngestError, RawDocument};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Extract, split, embed and store one document at a time.
pub struct IngestionPipeline {
    extractor: Box<dyn PdfExtractor>,
    chunking: ChunkingConfig,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new(LopdfExtractor)
    }
}

impl IngestionPipeline {
    pub fn new(extractor: impl PdfExtractor + 'static) -> Self {
        Self {
            extractor: Box::new(extractor),
            chunking: ChunkingConfig::default(),
        }
    }

    /// Returns the number of chunks stored.
    ///
    /// Storage is not transactional: if the backend fails midway, chunks
    /// written before the failure stay in the collection. Identical
    /// documents are stored again on every call.
    pub async fn ingest(
        &self,
        context: &RagContext,
        document: &RawDocument,
    ) -> Result<usize, IngestError> {
        let dependencies = context
            .ensure_ready()
            .await
            .map_err(IngestError::NotInitialized)?;

        let text = self.extractor.extract(&document.bytes)?;
        let chunks = split_texts(&text, &self.chunking)?;
        if chunks.is_empty() {
            warn!(document = document.display_name(), "no text chunks created");
            return Err(IngestError::NoChunks);
        }

        dependencies.store.add_texts(&chunks).await?;

        info!(
            document = document.display_name(),
            checksum = %document.checksum(),
            characters = text.chars().count(),
            chunk_count = chunks.len(),
            "stored document chunks"
        );
        Ok(chunks.len())
    }

    /// Ingests every PDF under `folder`, recording failures instead of stopping.
    pub async fn ingest_folder_best_effort(
        &self,
        context: &RagContext,
        folder: &Path,
    ) -> Result<IngestionReport, IngestError> {
        let files = discover_pdf_files(folder);

        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no pdf files found in {}",
                folder.display()
            )));
        }

        let mut report = IngestionReport::default();
        for path in files {
            let outcome = match RawDocument::from_path(&path) {
                Ok(document) => self.ingest(context, &document).await,
                Err(error) => Err(error),
            };

            match outcome {
                Ok(chunk_count) => report.ingested.push(IngestedPdf { path, chunk_count }),
                Err(error) => {
                    warn!(path = %path.display(), reason = %error, "skipped pdf");
                    report.skipped_files.push(SkippedPdf {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub struct IngestedPdf {
    pub path: PathBuf,
    pub chunk_count: usize,
}

pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Default)]
pub struct IngestionReport {
    pub ingested: Vec<IngestedPdf>,
    pub skipped_files: Vec<SkippedPdf>,
}

impl IngestionReport {
    pub fn chunk_count(&self) -> usize {
        self.ingested.iter().map(|file| file.chunk_count).sum()
    }
}
