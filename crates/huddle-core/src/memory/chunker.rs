//! Word-window chunking of transcript text.

use huddle_types::error::MemoryError;

/// Default chunk length in words.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default number of words shared by consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Split `text` into overlapping windows of at most `chunk_size` words.
///
/// Words are whitespace-separated tokens. Text with no words yields no
/// chunks, and text that fits in one window is returned unchanged as a
/// single chunk. Otherwise consecutive windows share exactly `overlap`
/// words and the final window always ends on the last word.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, MemoryError> {
    if chunk_size == 0 {
        return Err(MemoryError::InvalidInput(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(MemoryError::InvalidInput(format!(
            "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }
    if words.len() <= chunk_size {
        return Ok(vec![text.to_string()]);
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::with_capacity(words.len().div_ceil(step));
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    Ok(chunks)
}

/// [`chunk_text`] with the default window (500 words, 100 overlap).
pub fn chunk_text_default(text: &str) -> Vec<String> {
    // The default window is always valid.
    chunk_text(text, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP).unwrap_or_default()
}
