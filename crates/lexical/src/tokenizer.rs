/// Pluggable tokenization seam for the BM25 index.
///
/// Token behavior (casing, length filters, stemming) is caller-defined;
/// the index makes no assumptions beyond "same tokenizer for documents
/// and queries".
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Lowercases and splits on non-alphanumeric boundaries. No length filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTokenizer;

impl Tokenizer for DefaultTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_on_non_word_boundaries() {
        let tokens = DefaultTokenizer.tokenize("PostgreSQL is a database, isn't it?");
        assert_eq!(
            tokens,
            vec!["postgresql", "is", "a", "database", "isn", "t", "it"]
        );
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(DefaultTokenizer.tokenize("  \t\n ").is_empty());
    }
}
