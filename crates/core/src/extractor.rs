use crate::error::ExtractionError;
use lopdf::Document;
use std::fmt::Display;
use tracing::{debug, warn};

/// Result of extracting a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Text { number: u32, text: String },
    /// The page produced no text or failed to decode; it contributes nothing.
    Empty { number: u32 },
}

pub trait PdfExtractor: Send + Sync {
    /// Per-page outcomes in page order.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageOutcome>, ExtractionError>;

    /// All page texts joined in page order with no separator.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        join_pages(self.extract_pages(bytes)?)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageOutcome>, ExtractionError> {
        let document = Document::load_mem(bytes)
            .map_err(|error| ExtractionError::MalformedDocument(error.to_string()))?;

        if document.is_encrypted() {
            return Err(ExtractionError::MalformedDocument(
                "encrypted documents are not supported".to_string(),
            ));
        }

        let pages = document
            .get_pages()
            .into_keys()
            .map(|number| page_outcome(number, document.extract_text(&[number])))
            .collect();

        Ok(pages)
    }
}

/// Any non-empty page text is kept as is, whitespace included.
fn page_outcome<E: Display>(number: u32, extracted: Result<String, E>) -> PageOutcome {
    match extracted {
        Ok(text) if !text.is_empty() => PageOutcome::Text { number, text },
        Ok(_) => PageOutcome::Empty { number },
        Err(error) => {
            debug!(page = number, error = %error, "page yielded no text");
            PageOutcome::Empty { number }
        }
    }
}

pub fn join_pages(pages: Vec<PageOutcome>) -> Result<String, ExtractionError> {
    let mut text = String::new();
    let mut empty_pages = 0usize;

    for page in pages {
        match page {
            PageOutcome::Text { text: page_text, .. } => text.push_str(&page_text),
            PageOutcome::Empty { .. } => empty_pages += 1,
        }
    }

    if text.trim().is_empty() {
        warn!(empty_pages, "no text extracted from pdf");
        return Err(ExtractionError::ExtractionEmpty);
    }

    debug!(chars = text.chars().count(), empty_pages, "extracted pdf text");
    Ok(text)
}
