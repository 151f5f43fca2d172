//! Collapse chunk-level search results into per-meeting results.

use std::collections::HashMap;

use huddle_types::memory::{MAX_MEETING_SNIPPETS, MeetingSearchResult, SearchResult};

/// Group chunk results by meeting.
///
/// A meeting's score is the best score among its chunks, its snippets are
/// the texts of its highest-scoring chunks (at most
/// [`MAX_MEETING_SNIPPETS`]) and the output is sorted best meeting first.
/// Results without a meeting id are dropped.
pub fn group_by_meeting(results: Vec<SearchResult>) -> Vec<MeetingSearchResult> {
    let mut groups: Vec<Vec<SearchResult>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for result in results {
        if result.metadata.meeting_id.is_empty() {
            continue;
        }
        match index.get(&result.metadata.meeting_id) {
            Some(&slot) => groups[slot].push(result),
            None => {
                index.insert(result.metadata.meeting_id.clone(), groups.len());
                groups.push(vec![result]);
            }
        }
    }

    let mut meetings: Vec<MeetingSearchResult> = groups
        .into_iter()
        .map(|mut chunks| {
            chunks.sort_by(|a, b| b.score.total_cmp(&a.score));
            let best = &chunks[0];
            MeetingSearchResult {
                meeting_id: best.metadata.meeting_id.clone(),
                s3_key: best.metadata.s3_key.clone(),
                score: best.score,
                matching_chunks: chunks.len(),
                snippets: chunks
                    .iter()
                    .filter_map(|chunk| chunk.metadata.text.clone())
                    .filter(|text| !text.is_empty())
                    .take(MAX_MEETING_SNIPPETS)
                    .collect(),
            }
        })
        .collect();

    meetings.sort_by(|a, b| b.score.total_cmp(&a.score));
    meetings
}
