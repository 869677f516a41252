use crate::error::IngestError;
use crate::models::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Window parameters for [`split`]. Sizes are measured in chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub separator: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk_size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits `text` into overlapping windows of at most `chunk_size` chars.
///
/// A window ends right before the last separator that still leaves room for
/// progress past the overlap; without one it is cut at `chunk_size`. Each
/// following window starts `overlap` chars before the previous end, so
/// neighbours share exactly `overlap` chars.
pub fn split(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, IngestError> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    let separator: Vec<char> = config.separator.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let remaining = chars.len() - start;
        let end = if remaining <= config.chunk_size {
            chars.len()
        } else {
            let window_end = start + config.chunk_size;
            last_separator(&chars, &separator, start + config.overlap + 1, window_end)
                .unwrap_or(window_end)
        };

        chunks.push(Chunk {
            index: chunks.len(),
            offset: start,
            text: chars[start..end].iter().collect(),
        });

        if end == chars.len() {
            break;
        }
        start = end - config.overlap;
    }

    Ok(chunks)
}

/// Convenience wrapper returning only the chunk texts.
pub fn split_texts(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, IngestError> {
    Ok(split(text, config)?
        .into_iter()
        .map(|chunk| chunk.text)
        .collect())
}

/// Largest `p` in `lower..=upper` where `separator` begins.
fn last_separator(chars: &[char], separator: &[char], lower: usize, upper: usize) -> Option<usize> {
    if separator.is_empty() || lower > upper {
        return None;
    }

    (lower..=upper)
        .rev()
        .find(|&position| chars[position..].starts_with(separator))
}
