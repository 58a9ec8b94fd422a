//! Text utilities shared by the classifier, clusterer, and drafter:
//! tokenization, stop-word filtering, stable top-k keyword extraction,
//! dedup key normalization, and char-safe truncation.

/// Fixed stop-word list. Tokens on this list never become keywords.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "is",
    "are", "was", "were", "been", "be", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "this", "that", "these", "those", "i", "you", "he",
    "she", "it", "we", "they", "what", "which", "who", "when", "where", "why", "how", "all",
    "each", "just", "also", "very", "really", "there", "their", "them", "then", "than",
    "about", "into", "from", "your", "our", "my", "me", "us", "can", "cant", "dont", "not",
    "no", "yes", "get", "got", "some", "any", "much", "many", "more", "most", "other", "out",
    "over", "only", "even", "because", "while", "still",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Splits text into lowercase alphanumeric tokens, dropping stop words and
/// tokens of 3 characters or fewer.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3 && !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// The `n` most frequent tokens in `text`, most frequent first. Ties keep
/// first-encountered order: counting preserves insertion order and the sort
/// is stable.
pub fn top_keywords(text: &str, n: usize) -> Vec<String> {
    let mut order: Vec<(String, usize)> = Vec::new();
    for token in tokenize(text) {
        match order.iter_mut().find(|(w, _)| *w == token) {
            Some((_, count)) => *count += 1,
            None => order.push((token, 1)),
        }
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order.into_iter().take(n).map(|(w, _)| w).collect()
}

/// Number of chars the dedup key keeps.
const DEDUP_KEY_LEN: usize = 200;

/// Normalized content key for exact-match deduplication: lowercase, strip
/// punctuation, collapse whitespace, truncate to 200 chars.
pub fn dedup_key(content: &str) -> String {
    let stripped: String = content
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, DEDUP_KEY_LEN)
}

/// Truncates to at most `max` chars (not bytes) without ellipsis.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Truncates to `max` chars and appends "..." only when something was cut.
pub fn truncate_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    }
}

/// First sentence of `s`, split on `.`, `!`, or `?`. Falls back to the whole
/// string when no terminator is present.
pub fn first_sentence(s: &str) -> &str {
    s.split(['.', '!', '?'])
        .map(str::trim)
        .find(|part| !part.is_empty())
        .unwrap_or(s)
}
