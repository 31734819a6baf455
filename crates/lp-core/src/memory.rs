//! Semantic ranking over memory records.
//!
//! Pure scoring only; loading the candidate window and the recency
//! fallback live with the caller.

use crate::pet::MemoryRecord;

/// Cosine similarity. Returns 0.0 for empty, mismatched, or zero-norm
/// vectors rather than erroring on degenerate embeddings.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// A ranked memory with its similarity score.
#[derive(Clone, Debug)]
pub struct ScoredMemory {
    pub score: f32,
    pub record: MemoryRecord,
}

/// Rank `records` against a query embedding and keep the best `limit`.
///
/// Records without an embedding never match semantically. The selected
/// subset is re-sorted ascending by creation time so the caller can feed
/// it to a prompt in chronological order. Returns `None` when no record
/// carries a usable embedding, signalling the recency fallback.
pub fn rank_memories(
    records: &[MemoryRecord],
    query_embedding: &[f32],
    limit: usize,
) -> Option<Vec<ScoredMemory>> {
    let mut scored: Vec<ScoredMemory> = records
        .iter()
        .filter_map(|record| {
            let embedding = record.embedding.as_ref()?;
            Some(ScoredMemory {
                score: cosine_similarity(query_embedding, embedding),
                record: record.clone(),
            })
        })
        .collect();

    if scored.is_empty() {
        return None;
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored.sort_by_key(|m| m.record.created_at);
    Some(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::MemoryKind;
    use approx::assert_relative_eq;
    use uuid::Uuid;

    fn record(content: &str, embedding: Option<Vec<f32>>, created_at: u64) -> MemoryRecord {
        MemoryRecord {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            content: content.to_string(),
            embedding,
            kind: MemoryKind::TripLog,
            created_at,
        }
    }

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_scale_invariant() {
        let a = [0.3f32, 0.7, 0.2];
        let b = [0.6f32, 1.4, 0.4];
        assert_relative_eq!(cosine_similarity(&a, &b), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rank_picks_most_similar() {
        let records = vec![
            record("close", Some(vec![1.0, 0.1]), 10),
            record("far", Some(vec![0.0, 1.0]), 20),
            record("closest", Some(vec![1.0, 0.0]), 30),
        ];
        let ranked = rank_memories(&records, &[1.0, 0.0], 2).unwrap();
        let contents: Vec<&str> = ranked.iter().map(|m| m.record.content.as_str()).collect();
        // Top two by similarity, then chronological.
        assert_eq!(contents, ["close", "closest"]);
    }

    #[test]
    fn test_rank_skips_unscored_records() {
        let records = vec![
            record("no embedding", None, 10),
            record("scored", Some(vec![1.0, 0.0]), 20),
        ];
        let ranked = rank_memories(&records, &[1.0, 0.0], 5).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.content, "scored");
    }

    #[test]
    fn test_rank_none_without_usable_embeddings() {
        let records = vec![record("a", None, 1), record("b", None, 2)];
        assert!(rank_memories(&records, &[1.0], 5).is_none());
        assert!(rank_memories(&[], &[1.0], 5).is_none());
    }

    #[test]
    fn test_rank_result_is_chronological() {
        let records = vec![
            record("newest", Some(vec![1.0, 0.0]), 300),
            record("oldest", Some(vec![0.9, 0.1]), 100),
            record("middle", Some(vec![0.8, 0.2]), 200),
        ];
        let ranked = rank_memories(&records, &[1.0, 0.0], 3).unwrap();
        let times: Vec<u64> = ranked.iter().map(|m| m.record.created_at).collect();
        assert_eq!(times, [100, 200, 300]);
    }
}
