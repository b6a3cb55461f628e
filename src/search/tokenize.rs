use icu_segmenter::WordSegmenter;

/// Word-level query tokenizer for the sparse channel.
///
/// The corpus is Thai text, which has no whitespace word boundaries, so plain
/// splitting cannot produce terms that match the store's pre-tokenized
/// content field. ICU4X's auto word segmenter carries dictionary/LSTM models
/// for Southeast Asian scripts and falls back to rule-based segmentation for
/// everything else. Building the segmenter loads model data, so construct one
/// per process and share it.
pub struct QueryTokenizer {
    segmenter: WordSegmenter,
}

impl QueryTokenizer {
    pub fn new() -> Self {
        Self {
            segmenter: WordSegmenter::new_auto(),
        }
    }

    /// Segment `text` into discrete search terms.
    ///
    /// Whitespace and punctuation segments are discarded; a token survives
    /// only if it contains at least one alphanumeric character.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let breakpoints: Vec<usize> = self.segmenter.segment_str(text).collect();

        breakpoints
            .windows(2)
            .map(|w| &text[w[0]..w[1]])
            .filter(|segment| segment.chars().any(char::is_alphanumeric))
            .map(str::to_string)
            .collect()
    }
}

impl Default for QueryTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_splits_on_whitespace() {
        let tokenizer = QueryTokenizer::new();
        assert_eq!(tokenizer.tokenize("hello search world"), vec!["hello", "search", "world"]);
    }

    #[test]
    fn test_punctuation_and_whitespace_dropped() {
        let tokenizer = QueryTokenizer::new();
        let tokens = tokenizer.tokenize("points, rewards -- redeem!");
        assert_eq!(tokens, vec!["points", "rewards", "redeem"]);
    }

    #[test]
    fn test_thai_run_splits_without_spaces() {
        let tokenizer = QueryTokenizer::new();
        // "which stations" as a single unspaced Thai run
        let tokens = tokenizer.tokenize("สถานีไหนบ้าง");
        assert!(tokens.len() > 1, "expected word-level splits, got {tokens:?}");
        // Segmentation is lossless apart from dropped separators
        assert_eq!(tokens.concat(), "สถานีไหนบ้าง");
    }

    #[test]
    fn test_mixed_thai_english() {
        let tokenizer = QueryTokenizer::new();
        let tokens = tokenizer.tokenize("สมัคร Rabbit Rewards");
        assert!(tokens.contains(&"Rabbit".to_string()));
        assert!(tokens.contains(&"Rewards".to_string()));
        assert!(tokens.iter().any(|t| t.chars().any(|c| ('\u{0e00}'..='\u{0e7f}').contains(&c))));
    }

    #[test]
    fn test_empty_input() {
        let tokenizer = QueryTokenizer::new();
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("   ").is_empty());
    }

    // One segmenter is shared across request tasks; the sync provider
    // feature keeps its data payloads Arc-backed.
    #[test]
    fn test_tokenizer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryTokenizer>();
    }
}
