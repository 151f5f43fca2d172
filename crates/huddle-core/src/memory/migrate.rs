//! Backend migration: JSONL export/import and cross-backend validation.
//!
//! Everything here goes through the provider contract, so any pair of
//! backends can be compared or copied.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use huddle_types::error::MemoryError;
use huddle_types::memory::{BatchResult, SearchOptions, VectorDocument, VectorMetadata};

use super::box_provider::BoxVectorStore;

/// Minimum average recall@k for a migration to pass.
pub const MIN_AVG_RECALL: f64 = 0.9;

/// Minimum average Spearman rank correlation for a migration to pass.
pub const MIN_AVG_CORRELATION: f64 = 0.8;

/// Queries used when the operator supplies none.
pub const DEFAULT_VALIDATION_QUERIES: &[&str] = &[
    "quarterly review",
    "project update",
    "customer meeting",
    "team standup",
    "product roadmap",
];

/// One line of an export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl From<&VectorDocument> for ExportRecord {
    fn from(document: &VectorDocument) -> Self {
        let metadata: BTreeMap<String, String> = document.metadata.to_storage_map();
        Self {
            id: document.id.clone(),
            vector: document.vector.clone(),
            metadata: serde_json::json!(metadata),
        }
    }
}

impl From<ExportRecord> for VectorDocument {
    fn from(record: ExportRecord) -> Self {
        VectorDocument {
            metadata: VectorMetadata::from_storage_value(&record.metadata),
            id: record.id,
            vector: record.vector,
        }
    }
}

/// Write every document of `provider` as JSONL, one [`ExportRecord`] per
/// line. Returns the number of records written.
pub async fn export_jsonl<W>(provider: &BoxVectorStore, writer: &mut W, page_size: usize) -> Result<usize, MemoryError>
where
    W: AsyncWrite + Unpin,
{
    let mut exported = 0;
    let mut page_token: Option<String> = None;
    loop {
        let page = provider
            .list_documents(None, page_token.as_deref(), page_size)
            .await?;
        for document in &page.documents {
            let mut line = serde_json::to_string(&ExportRecord::from(document))
                .map_err(|e| MemoryError::Deserialization(e.to_string()))?;
            line.push('\n');
            writer
                .write_all(line.as_bytes())
                .await
                .map_err(|e| MemoryError::Transport(format!("failed to write export: {e}")))?;
        }
        exported += page.documents.len();
        tracing::debug!(provider = %provider.name(), exported, "Exported page");

        match page.next_token {
            Some(token) if !page.documents.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    writer
        .flush()
        .await
        .map_err(|e| MemoryError::Transport(format!("failed to flush export: {e}")))?;
    tracing::info!(provider = %provider.name(), exported, "Export complete");
    Ok(exported)
}

/// Read JSONL records and store them through `provider` in batches of
/// `batch_size`.
///
/// Blank lines are skipped. Lines that do not parse are reported as
/// failures with id `line {n}` and do not stop the import.
pub async fn import_jsonl<R>(provider: &BoxVectorStore, reader: R, batch_size: usize) -> Result<BatchResult, MemoryError>
where
    R: AsyncBufRead + Unpin,
{
    let batch_size = batch_size.max(1);
    let mut result = BatchResult::default();
    let mut pending: Vec<VectorDocument> = Vec::with_capacity(batch_size);
    let mut lines = reader.lines();
    let mut line_number = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| MemoryError::Transport(format!("failed to read import: {e}")))?
    {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ExportRecord>(&line) {
            Ok(record) => pending.push(record.into()),
            Err(e) => result.record_failure(format!("line {line_number}"), e.to_string()),
        }
        if pending.len() >= batch_size {
            result.merge(provider.store_batch(&pending).await);
            pending.clear();
        }
    }
    if !pending.is_empty() {
        result.merge(provider.store_batch(&pending).await);
    }

    tracing::info!(
        provider = %provider.name(),
        successful = result.successful,
        failed = result.failed,
        "Import complete"
    );
    Ok(result)
}

/// Fraction of the baseline's top-`k` ids that also appear in the
/// candidate's top-`k`. An empty baseline counts as full recall.
pub fn recall_at_k(baseline: &[String], candidate: &[String], k: usize) -> f64 {
    let expected: HashSet<&String> = baseline.iter().take(k).collect();
    if expected.is_empty() {
        return 1.0;
    }
    let found: HashSet<&String> = candidate.iter().take(k).collect();
    expected.intersection(&found).count() as f64 / expected.len() as f64
}

/// Spearman rank correlation over the ids present in both rankings.
///
/// Returns 0.0 when fewer than two ids are shared.
pub fn rank_correlation(baseline: &[String], candidate: &[String]) -> f64 {
    let baseline_ranks: HashMap<&String, usize> = baseline.iter().zip(1..).collect();
    let candidate_ranks: HashMap<&String, usize> = candidate.iter().zip(1..).collect();

    let squared_diffs: Vec<f64> = baseline_ranks
        .iter()
        .filter_map(|(id, rank)| {
            candidate_ranks
                .get(id)
                .map(|other| (*rank as f64 - *other as f64).powi(2))
        })
        .collect();

    let n = squared_diffs.len() as f64;
    if squared_diffs.len() < 2 {
        return 0.0;
    }
    1.0 - (6.0 * squared_diffs.iter().sum::<f64>()) / (n * (n * n - 1.0))
}

/// Count a provider's vectors, falling back to paging through its
/// documents when the backend cannot count directly.
pub async fn count_vectors(provider: &BoxVectorStore) -> Result<u64, MemoryError> {
    match provider.get_vector_count().await {
        Err(MemoryError::Unsupported { .. }) => {}
        other => return other,
    }
    let mut count = 0u64;
    let mut page_token: Option<String> = None;
    loop {
        let page = provider.list_documents(None, page_token.as_deref(), 1000).await?;
        count += page.documents.len() as u64;
        match page.next_token {
            Some(token) if !page.documents.is_empty() => page_token = Some(token),
            _ => return Ok(count),
        }
    }
}

/// Vector counts on both sides. `None` when a side could not be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountComparison {
    pub source: Option<u64>,
    pub target: Option<u64>,
}

impl CountComparison {
    pub fn matches(&self) -> bool {
        matches!((self.source, self.target), (Some(a), Some(b)) if a == b)
    }
}

pub async fn compare_counts(source: &BoxVectorStore, target: &BoxVectorStore) -> CountComparison {
    CountComparison {
        source: try_count(source).await,
        target: try_count(target).await,
    }
}

async fn try_count(provider: &BoxVectorStore) -> Option<u64> {
    match count_vectors(provider).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(provider = %provider.name(), error = %e, "Could not count vectors");
            None
        }
    }
}

/// Outcome of comparing sampled documents' key metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleComparison {
    pub matches: usize,
    pub mismatches: usize,
    pub missing: usize,
    /// Ids that differ or are missing in the target.
    pub problems: Vec<String>,
}

impl SampleComparison {
    pub fn success(&self) -> bool {
        self.mismatches == 0 && self.missing == 0
    }
}

/// Take up to `sample_size` documents from `source` and check that each
/// exists in `target` with the same `meeting_id` and `s3_key`.
pub async fn compare_sample_metadata(
    source: &BoxVectorStore,
    target: &BoxVectorStore,
    sample_size: usize,
) -> Result<SampleComparison, MemoryError> {
    let page = source.list_documents(None, None, sample_size).await?;
    let mut comparison = SampleComparison::default();

    for document in page.documents.iter().take(sample_size) {
        match target.fetch(&document.id).await {
            Ok(Some(found))
                if found.metadata.meeting_id == document.metadata.meeting_id
                    && found.metadata.s3_key == document.metadata.s3_key =>
            {
                comparison.matches += 1;
            }
            Ok(Some(_)) => {
                tracing::warn!(id = %document.id, "Metadata mismatch");
                comparison.mismatches += 1;
                comparison.problems.push(document.id.clone());
            }
            Ok(None) => {
                comparison.missing += 1;
                comparison.problems.push(document.id.clone());
            }
            Err(e) => {
                tracing::warn!(id = %document.id, error = %e, "Could not fetch from target");
                comparison.missing += 1;
                comparison.problems.push(document.id.clone());
            }
        }
    }
    Ok(comparison)
}

/// Per-query search comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryComparison {
    pub query: String,
    pub recall: f64,
    pub correlation: f64,
    pub source_latency_ms: f64,
    pub target_latency_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchQualityReport {
    pub top_k: usize,
    pub queries: Vec<QueryComparison>,
    pub avg_recall: f64,
    pub avg_correlation: f64,
    pub avg_source_latency_ms: f64,
    pub avg_target_latency_ms: f64,
}

impl SearchQualityReport {
    pub fn success(&self) -> bool {
        self.avg_recall >= MIN_AVG_RECALL && self.avg_correlation >= MIN_AVG_CORRELATION
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Run each query against both stores with the same embedding (from the
/// source's embedder) and score the target's ranking against the source's.
pub async fn compare_search_quality(
    source: &BoxVectorStore,
    target: &BoxVectorStore,
    queries: &[String],
    top_k: usize,
) -> Result<SearchQualityReport, MemoryError> {
    let options = SearchOptions::top_k(top_k);
    let mut comparisons = Vec::with_capacity(queries.len());

    for query in queries {
        let embedding = source.embedder().generate_embedding(query).await?;

        let started = Instant::now();
        let baseline = source.search(&embedding, &options).await?;
        let source_latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let started = Instant::now();
        let candidate = target.search(&embedding, &options).await?;
        let target_latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let baseline: Vec<String> = baseline.into_iter().map(|r| r.id).collect();
        let candidate: Vec<String> = candidate.into_iter().map(|r| r.id).collect();
        let comparison = QueryComparison {
            query: query.clone(),
            recall: recall_at_k(&baseline, &candidate, top_k),
            correlation: rank_correlation(&baseline, &candidate),
            source_latency_ms,
            target_latency_ms,
        };
        tracing::debug!(
            query = %comparison.query,
            recall = comparison.recall,
            correlation = comparison.correlation,
            "Compared search results"
        );
        comparisons.push(comparison);
    }

    Ok(SearchQualityReport {
        top_k,
        avg_recall: mean(comparisons.iter().map(|c| c.recall)),
        avg_correlation: mean(comparisons.iter().map(|c| c.correlation)),
        avg_source_latency_ms: mean(comparisons.iter().map(|c| c.source_latency_ms)),
        avg_target_latency_ms: mean(comparisons.iter().map(|c| c.target_latency_ms)),
        queries: comparisons,
    })
}

/// Combined result of a migration validation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub counts: CountComparison,
    pub metadata: SampleComparison,
    pub search: Option<SearchQualityReport>,
}

impl ValidationReport {
    /// Whether it is safe to switch reads to the target.
    pub fn passed(&self) -> bool {
        self.counts.matches()
            && self.metadata.success()
            && self.search.as_ref().is_none_or(SearchQualityReport::success)
    }
}

/// Run every check. Search quality is skipped when `queries` is empty.
pub async fn validate_migration(
    source: &BoxVectorStore,
    target: &BoxVectorStore,
    sample_size: usize,
    queries: &[String],
    top_k: usize,
) -> Result<ValidationReport, MemoryError> {
    let counts = compare_counts(source, target).await;
    let metadata = compare_sample_metadata(source, target, sample_size).await?;
    let search = if queries.is_empty() {
        None
    } else {
        Some(compare_search_quality(source, target, queries, top_k).await?)
    };
    Ok(ValidationReport {
        counts,
        metadata,
        search,
    })
}
