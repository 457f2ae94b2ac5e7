//! Heuristic language-style feature extraction

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Sentence terminators, both full-width and ASCII
const SENTENCE_TERMINATORS: &[char] = &['。', '.', '!', '?', '！', '？'];

/// Punctuation marks tallied into the punctuation map
const TRACKED_PUNCTUATION: &str = "，。！？、；：,.!?;:";

/// Pictographic range counted as emoji
const EMOJI_RANGE: std::ops::RangeInclusive<u32> = 0x1F300..=0x1F9FF;

const VOCABULARY_SIZE: usize = 10;
const PHRASE_COUNT: usize = 5;
const MIN_WORD_CHARS: usize = 2;
const MIN_PHRASE_OCCURRENCES: usize = 2;

/// Casual requires average sentence length strictly below this
pub const CASUAL_MAX_SENTENCE_LENGTH: f64 = 10.0;
/// Casual requires emoji ratio (percent) strictly above this
pub const CASUAL_MIN_EMOJI_RATIO: f64 = 2.0;
/// Formal requires average sentence length strictly above this
pub const FORMAL_MIN_SENTENCE_LENGTH: f64 = 30.0;

/// Coarse tone bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Casual,
    Formal,
    #[default]
    Friendly,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Casual => "casual",
            Tone::Formal => "formal",
            Tone::Friendly => "friendly",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature bundle learned from one sender's messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleFeatures {
    /// Top words by frequency, most frequent first
    pub vocabulary: IndexMap<String, usize>,
    /// Average characters per sentence
    pub avg_sentence_length: f64,
    /// Emoji characters as a percentage of all characters
    pub emoji_ratio: f64,
    pub tone: Tone,
    pub punctuation: IndexMap<String, usize>,
    /// Recurring two-word phrases, most frequent first
    pub common_phrases: Vec<String>,
}

/// Classify tone from sentence length and emoji ratio.
///
/// Order matters: the casual test runs first, then formal, and everything
/// else is friendly. Both comparisons are strict.
pub fn classify_tone(avg_sentence_length: f64, emoji_ratio: f64) -> Tone {
    if avg_sentence_length < CASUAL_MAX_SENTENCE_LENGTH && emoji_ratio > CASUAL_MIN_EMOJI_RATIO {
        Tone::Casual
    } else if avg_sentence_length > FORMAL_MIN_SENTENCE_LENGTH {
        Tone::Formal
    } else {
        Tone::Friendly
    }
}

/// Extract a feature bundle from message texts, all authored by one sender
pub fn extract_features<S: AsRef<str>>(texts: &[S]) -> StyleFeatures {
    let mut features = StyleFeatures::default();

    let mut sentence_chars = 0usize;
    let mut sentence_count = 0usize;
    let mut total_chars = 0usize;
    let mut emoji_count = 0usize;
    let mut word_counts: IndexMap<String, usize> = IndexMap::new();
    let mut phrase_counts: IndexMap<String, usize> = IndexMap::new();

    for text in texts {
        let text = text.as_ref();

        for sentence in text.split(SENTENCE_TERMINATORS) {
            let sentence = sentence.trim();
            if !sentence.is_empty() {
                sentence_chars += sentence.chars().count();
                sentence_count += 1;
            }
        }

        for ch in text.chars() {
            total_chars += 1;
            if EMOJI_RANGE.contains(&(ch as u32)) {
                emoji_count += 1;
            }
            if TRACKED_PUNCTUATION.contains(ch) {
                *features.punctuation.entry(ch.to_string()).or_insert(0) += 1;
            }
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        for word in &words {
            if word.chars().count() >= MIN_WORD_CHARS {
                *word_counts.entry((*word).to_string()).or_insert(0) += 1;
            }
        }
        for pair in words.windows(2) {
            *phrase_counts.entry(pair.join(" ")).or_insert(0) += 1;
        }
    }

    if sentence_count > 0 {
        features.avg_sentence_length = sentence_chars as f64 / sentence_count as f64;
    }
    if total_chars > 0 {
        features.emoji_ratio = emoji_count as f64 / total_chars as f64 * 100.0;
    }

    features.vocabulary = top_n(word_counts, VOCABULARY_SIZE, 1).into_iter().collect();
    features.common_phrases = top_n(phrase_counts, PHRASE_COUNT, MIN_PHRASE_OCCURRENCES)
        .into_iter()
        .map(|(phrase, _)| phrase)
        .collect();
    features.tone = classify_tone(features.avg_sentence_length, features.emoji_ratio);

    features
}

/// Highest counts first; equal counts keep first-seen order
fn top_n<K: Hash + Eq>(counts: IndexMap<K, usize>, n: usize, min_count: usize) -> Vec<(K, usize)> {
    let mut entries: Vec<(K, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_count)
        .collect();
    // sort_by is stable, so insertion order survives among ties
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(n);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_boundaries_are_strict() {
        assert_eq!(classify_tone(10.0, 2.0), Tone::Friendly);
        assert_eq!(classify_tone(9.9, 2.1), Tone::Casual);
        assert_eq!(classify_tone(31.0, 0.0), Tone::Formal);
        assert_eq!(classify_tone(30.0, 0.0), Tone::Friendly);
        assert_eq!(classify_tone(15.0, 0.0), Tone::Friendly);
    }

    #[test]
    fn test_casual_wins_over_formal_check_order() {
        // Short sentences with many emoji are casual regardless of anything else
        assert_eq!(classify_tone(3.0, 50.0), Tone::Casual);
    }

    #[test]
    fn test_sentence_length_ignores_empty_segments() {
        let features = extract_features(&["abcd. efgh!", "ij??"]);
        // segments: "abcd", "efgh", "ij"
        assert!((features.avg_sentence_length - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_width_terminators_split_sentences() {
        let features = extract_features(&["你好。今天天气很好！"]);
        // "你好" (2) and "今天天气很好" (6)
        assert!((features.avg_sentence_length - 4.0).abs() < 1e-9);
        assert_eq!(features.punctuation.get("。"), Some(&1));
        assert_eq!(features.punctuation.get("！"), Some(&1));
    }

    #[test]
    fn test_emoji_ratio_is_percentage() {
        // 1 emoji out of 10 chars
        let features = extract_features(&["ok ok ok \u{1F600}"]);
        assert!((features.emoji_ratio - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_vocabulary_skips_short_tokens_and_keeps_top_ten() {
        let text = "a b c aa bb cc dd ee ff gg hh ii jj kk aa aa bb";
        let features = extract_features(&[text]);

        assert_eq!(features.vocabulary.len(), 10);
        assert!(!features.vocabulary.contains_key("a"));

        let ordered: Vec<&str> = features.vocabulary.keys().map(|k| k.as_str()).collect();
        assert_eq!(ordered[0], "aa");
        assert_eq!(ordered[1], "bb");
        // ties resolved by first appearance
        assert_eq!(&ordered[2..], &["cc", "dd", "ee", "ff", "gg", "hh", "ii", "jj"]);
    }

    #[test]
    fn test_common_phrases_need_two_occurrences() {
        let features = extract_features(&["see you later", "see you soon", "once only"]);
        assert_eq!(features.common_phrases, vec!["see you".to_string()]);
    }

    #[test]
    fn test_empty_input_yields_defaults() {
        let features = extract_features::<&str>(&[]);
        assert_eq!(features, StyleFeatures::default());
        assert_eq!(features.tone, Tone::Friendly);
    }

    #[test]
    fn test_tone_serializes_lowercase() {
        let json = serde_json::to_string(&Tone::Casual).unwrap();
        assert_eq!(json, "\"casual\"");
    }
}
