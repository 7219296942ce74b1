use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use crate::core::model::FrequentWord;

pub const TOP_WORDS: usize = 10;
pub const MIN_RANKED_LEN: usize = 3;

/// Portuguese and English function words left out of the ranking.
pub const STOPWORDS: &[&str] = &[
    "o", "a", "os", "as", "um", "uma", "de", "do", "da", "dos", "das", "em", "no", "na", "nos",
    "nas", "por", "para", "com", "sem", "sob", "e", "ou", "mas", "se", "que", "qual", "quando",
    "onde", "como", "the", "an", "and", "or", "but", "if", "of", "at", "by", "for", "with",
    "about", "into", "through", "to", "from", "in", "on",
];

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphabetic() || (('\u{00C0}'..='\u{024F}').contains(&c) && c.is_alphabetic())
}

/// Lowercased runs of Latin letters, accents included.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text.nfc().collect();
    normalized
        .split(|c: char| !is_word_char(c))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

pub fn count_words(text: &str) -> usize {
    tokenize(text).len()
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Most frequent non-stopwords of at least [`MIN_RANKED_LEN`] letters.
/// Equal counts keep the order of first appearance.
pub fn frequent_words(text: &str, top_n: usize) -> Vec<FrequentWord> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for token in tokenize(text) {
        if token.chars().count() < MIN_RANKED_LEN || is_stopword(&token) {
            continue;
        }
        let count = counts.entry(token.clone()).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    let mut ranked: Vec<FrequentWord> = order
        .into_iter()
        .map(|word| {
            let count = counts[&word];
            FrequentWord { word, count }
        })
        .collect();
    // stable: ties stay in first-occurrence order
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(top_n);
    ranked
}
