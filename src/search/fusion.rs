use std::collections::{HashMap, HashSet};

use crate::models::Document;

/// Knobs for weighted reciprocal rank fusion.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Rank-penalty constant `c`: discounts the importance of exact rank at
    /// high rank values.
    pub rank_penalty: f64,
    /// One weight per input list. A length mismatch falls back to equal
    /// weights of 1.0 rather than failing the call.
    pub weights: Vec<f64>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rank_penalty: 60.0,
            weights: vec![1.0, 1.0],
        }
    }
}

struct Entry {
    score: f64,
    doc: Document,
}

/// Weighted Reciprocal Rank Fusion over independently ranked document lists.
///
/// Each list is one retrieval method's output, rank 1 = most relevant. A
/// record at 1-based `rank` in a list with weight `w` contributes
/// `w / (rank + c)`. Contributions accumulate per *content string*, so two
/// store records with different ids but identical text merge into a single
/// result; the first record seen for a content is kept as its representative.
/// Fusion is rank-based on purpose: vector similarity and keyword relevance
/// scores are not numerically comparable, so the source scores are never read.
///
/// Returns at most `top_k` records sorted by accumulated score descending.
/// Ties keep accumulation (insertion) order, which makes the output
/// deterministic for identical inputs. Empty input yields an empty result.
pub fn weighted_reciprocal_rank(
    doc_lists: &[Vec<Document>],
    config: &FusionConfig,
    top_k: usize,
) -> Vec<Document> {
    if doc_lists.is_empty() {
        return Vec::new();
    }

    let equal_weights;
    let weights: &[f64] = if config.weights.len() == doc_lists.len() {
        &config.weights
    } else {
        tracing::warn!(
            lists = doc_lists.len(),
            weights = config.weights.len(),
            "fusion weight count does not match list count, using equal weights"
        );
        equal_weights = vec![1.0; doc_lists.len()];
        &equal_weights
    };

    // Insertion-ordered accumulator keyed by content string.
    let mut entries: Vec<Entry> = Vec::new();
    let mut by_content: HashMap<String, usize> = HashMap::new();

    for (doc_list, weight) in doc_lists.iter().zip(weights) {
        // Guards against duplicate ids from the same retrieval channel; this
        // is not cross-list fusion, which is handled by content keying below.
        let mut scored_ids: HashSet<&str> = HashSet::new();

        for (i, doc) in doc_list.iter().enumerate() {
            if doc.id.is_empty() {
                tracing::warn!(rank = i + 1, "skipping record with missing id");
                continue;
            }
            let Some(content) = doc.content.as_deref() else {
                tracing::warn!(id = %doc.id, "skipping record with null content");
                continue;
            };
            if !scored_ids.insert(doc.id.as_str()) {
                continue;
            }

            let rank = (i + 1) as f64;
            let contribution = weight / (rank + config.rank_penalty);

            match by_content.get(content) {
                Some(&idx) => entries[idx].score += contribution,
                None => {
                    by_content.insert(content.to_string(), entries.len());
                    entries.push(Entry {
                        score: contribution,
                        doc: doc.clone(),
                    });
                }
            }
        }
    }

    // Stable sort: equal scores keep insertion order.
    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    entries.truncate(top_k);
    entries.into_iter().map(|e| e.doc).collect()
}
