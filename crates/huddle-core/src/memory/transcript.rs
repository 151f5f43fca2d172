//! Transcript ingestion: speaker cleanup, chunking, embedding and storage.

use huddle_types::error::MemoryError;
use huddle_types::memory::{BatchResult, UNKNOWN_SPEAKER, VectorDocument, VectorMetadata};

use super::chunker::chunk_text_default;
use super::provider::VectorStoreProvider;

/// Placeholder speaker labels that never name a real participant.
const PLACEHOLDER_SPEAKERS: &[&str] = &["unknown", "guest", "participant"];

/// A meeting transcript to ingest.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptInput<'a> {
    pub meeting_id: &'a str,
    /// Locator of the source transcript object.
    pub s3_key: &'a str,
    pub content: &'a str,
    /// Raw speaker labels as produced by diarization.
    pub speakers: &'a [String],
    pub user_id: Option<&'a str>,
}

/// Whether a diarization label looks like a person's name.
///
/// Rejects generic labels such as "Speaker 1" or "speaker B", the
/// placeholders unknown/guest/participant, and anything shorter than two
/// characters. Comparison is case-insensitive.
pub fn is_real_speaker(label: &str) -> bool {
    let label = label.trim();
    if label.chars().count() < 2 {
        return false;
    }
    let lower = label.to_lowercase();
    if PLACEHOLDER_SPEAKERS.contains(&lower.as_str()) {
        return false;
    }
    !is_generic_speaker_label(&lower)
}

fn is_generic_speaker_label(lower: &str) -> bool {
    let Some(rest) = lower.strip_prefix("speaker") else {
        return false;
    };
    let rest = rest.trim();
    if rest.is_empty() {
        return true;
    }
    rest.chars().all(|c| c.is_ascii_digit()) || (rest.len() == 1 && rest.chars().all(|c| c.is_ascii_alphabetic()))
}

/// Filter raw labels down to real, trimmed speaker names.
pub fn real_speakers(speakers: &[String]) -> Vec<String> {
    speakers
        .iter()
        .filter(|s| is_real_speaker(s))
        .map(|s| s.trim().to_string())
        .collect()
}

/// The sentence prepended to every chunk before embedding, or `None` when
/// there are no real speakers.
pub fn speaker_context(real: &[String]) -> Option<String> {
    if real.is_empty() {
        None
    } else {
        Some(format!("Meeting participants: {}. ", real.join(", ")))
    }
}

/// The speaker recorded in chunk metadata: the first real speaker, else
/// the first raw label, else "unknown".
pub fn primary_speaker(real: &[String], raw: &[String]) -> String {
    real.first()
        .or_else(|| raw.first())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string())
}

/// A chunk ready for embedding: the stored text and the (possibly
/// speaker-prefixed) text that is actually embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChunk {
    pub index: u32,
    pub text: String,
    pub embedding_input: String,
}

/// Chunk a transcript and attach the speaker context to each chunk.
pub fn prepare_chunks(input: &TranscriptInput<'_>) -> Vec<PreparedChunk> {
    let real = real_speakers(input.speakers);
    let context = speaker_context(&real);
    chunk_text_default(input.content)
        .into_iter()
        .zip(0u32..)
        .map(|(text, index)| PreparedChunk {
            index,
            embedding_input: match &context {
                Some(prefix) => format!("{prefix}{text}"),
                None => text.clone(),
            },
            text,
        })
        .collect()
}

/// Chunk, embed and store a transcript through `provider`.
///
/// Empty transcripts store nothing and report `0/0`. Embedding failures
/// abort the whole ingestion; storage failures are reported per chunk.
pub async fn ingest<P>(provider: &P, input: &TranscriptInput<'_>) -> Result<BatchResult, MemoryError>
where
    P: VectorStoreProvider + ?Sized,
{
    let chunks = prepare_chunks(input);
    if chunks.is_empty() {
        tracing::debug!(meeting_id = %input.meeting_id, "Transcript has no content, nothing to store");
        return Ok(BatchResult::default());
    }

    let inputs: Vec<String> = chunks.iter().map(|c| c.embedding_input.clone()).collect();
    let embeddings = provider.embedder().generate_embeddings(&inputs).await?;
    if embeddings.len() != chunks.len() {
        return Err(MemoryError::Embedding(format!(
            "expected {} embeddings, got {}",
            chunks.len(),
            embeddings.len()
        )));
    }

    let real = real_speakers(input.speakers);
    let speaker = primary_speaker(&real, input.speakers);
    let documents: Vec<VectorDocument> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, vector)| {
            let mut metadata = VectorMetadata::new(input.meeting_id, input.s3_key, chunk.index);
            metadata.speaker = Some(speaker.clone());
            metadata.text = Some(chunk.text);
            metadata.user_id = input.user_id.map(str::to_string);
            VectorDocument {
                id: VectorDocument::chunk_id(input.meeting_id, chunk.index),
                vector,
                metadata,
            }
        })
        .collect();

    let result = provider.store_batch(&documents).await;
    tracing::info!(
        provider = %provider.name(),
        meeting_id = %input.meeting_id,
        chunks = documents.len(),
        successful = result.successful,
        failed = result.failed,
        "Processed transcript"
    );
    Ok(result)
}
