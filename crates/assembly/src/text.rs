//! Text heuristics shared by the assembly pipeline: token estimation,
//! near-duplicate detection and budget-aware truncation.

use std::collections::HashSet;

/// Rough token count at the conventional 4-characters-per-token rate,
/// rounded up. Good enough for budgeting; never used for billing.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Lowercased words of at least two characters, punctuation stripped.
#[must_use]
pub fn normalized_word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of the normalized word sets of two texts.
///
/// Two texts with no usable words compare as identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let a = normalized_word_set(a);
    let b = normalized_word_set(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 1.0;
    }
    intersection as f32 / union as f32
}

/// Cut `text` down to at most `max_chars` characters, ending in `"..."`.
///
/// Prefers the last word boundary within the budget, but only when that
/// boundary sits past 80% of it; otherwise a mid-word cut loses less
/// content than backtracking would. Text already within budget is
/// returned unchanged.
#[must_use]
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    const ELLIPSIS: &str = "...";
    if max_chars <= ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }

    let budget = max_chars - ELLIPSIS.len();
    let prefix: String = text.chars().take(budget).collect();
    let cut = match prefix.rfind(' ') {
        Some(space) if space * 5 >= budget * 4 => space,
        _ => prefix.len(),
    };
    let mut truncated: String = prefix[..cut].trim_end().to_string();
    truncated.push_str(ELLIPSIS);
    truncated
}
