//! Dictionary-based word tokenizer for Thai text.
//!
//! Thai is written without spaces between words, so segmentation is done by
//! maximal matching against the [`Dictionary`]:
//!
//! 1. Thai runs are cut into character clusters, a consonant together with
//!    its vowel marks and tone marks. A word may only start or end on a
//!    cluster boundary.
//! 2. Non-Thai runs (numbers, times, Latin words, whitespace, punctuation) are
//!    split by regex into indivisible tokens.
//! 3. A shortest-path search over those boundaries picks the segmentation with
//!    the fewest characters left outside dictionary words, then the fewest
//!    tokens. Adjacent unknown clusters are merged back into one token.
//!
//! Concatenating the returned tokens always reproduces the input exactly.

use fancy_regex::Regex;
use once_cell::sync::Lazy;

use crate::dictionary::Dictionary;

/// One indivisible non-Thai token, anchored at the start of the haystack.
/// Times (`5:30`) win over bare numbers; decimals and grouped numbers
/// (`3.14`, `1,000`) stay whole.
static RE_NON_THAI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[0-9]{1,2}:[0-9]{2}(?![0-9])|[0-9]+(?:[,.][0-9]+)*|[๐-๙]+(?:[,.][๐-๙]+)*|[-a-zA-Z]+|[^\S\r\n]+|\r?\n|\r)",
    )
    .unwrap()
});

/// Thai letters, vowels and marks (digits excluded).
pub fn is_thai_letter(c: char) -> bool {
    ('\u{0E01}'..='\u{0E4F}').contains(&c)
}

/// Vowels and marks that attach to the preceding consonant.
fn is_non_starter(c: char) -> bool {
    matches!(c, '\u{0E30}'..='\u{0E3A}' | '\u{0E45}' | '\u{0E47}'..='\u{0E4E}')
}

/// Leading vowels เ แ โ ใ ไ, written before the consonant they belong to.
fn is_leading_vowel(c: char) -> bool {
    matches!(c, '\u{0E40}'..='\u{0E44}')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Known,
    Unknown,
}

/// Word tokenizer bound to one segmentation dictionary.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    dictionary: Dictionary,
}

impl Tokenizer {
    pub fn new(dictionary: Dictionary) -> Self {
        Self { dictionary }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Split `text` into words, numerals, whitespace runs and punctuation.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        if n == 0 {
            return Vec::new();
        }

        // boundary[i]: a token may start/end at char i.
        // fixed_end[i]: end of the non-Thai token starting at i.
        // cluster_end[i]: end of the Thai cluster starting at i.
        let mut boundary = vec![false; n + 1];
        let mut fixed_end: Vec<Option<usize>> = vec![None; n];
        let mut cluster_end: Vec<Option<usize>> = vec![None; n];
        boundary[0] = true;
        boundary[n] = true;

        let mut i = 0;
        while i < n {
            let thai = is_thai_letter(chars[i]);
            let mut j = i + 1;
            while j < n && is_thai_letter(chars[j]) == thai {
                j += 1;
            }
            if thai {
                mark_clusters(&chars[i..j], i, &mut boundary, &mut cluster_end);
            } else {
                mark_non_thai(&chars[i..j], i, &mut boundary, &mut fixed_end);
            }
            i = j;
        }

        // best[i] = (chars outside dictionary words, token count)
        let mut best: Vec<Option<(usize, usize)>> = vec![None; n + 1];
        let mut back: Vec<(usize, Edge)> = vec![(0, Edge::Known); n + 1];
        best[0] = Some((0, 0));

        for i in 0..n {
            let Some((unknown, count)) = best[i] else { continue };
            if !boundary[i] {
                continue;
            }
            let mut relax = |j: usize, cost: (usize, usize), edge: Edge| {
                if best[j].map_or(true, |b| cost < b) {
                    best[j] = Some(cost);
                    back[j] = (i, edge);
                }
            };
            for len in self.dictionary.common_prefix_lengths(&chars[i..]) {
                if boundary[i + len] {
                    relax(i + len, (unknown, count + 1), Edge::Known);
                }
            }
            if let Some(j) = fixed_end[i] {
                relax(j, (unknown, count + 1), Edge::Known);
            }
            if let Some(j) = cluster_end[i] {
                relax(j, (unknown + (j - i), count + 1), Edge::Unknown);
            }
        }

        if best[n].is_none() {
            return vec![text.to_string()];
        }

        let mut spans = Vec::new();
        let mut end = n;
        while end > 0 {
            let (start, edge) = back[end];
            spans.push((start, end, edge));
            end = start;
        }
        spans.reverse();

        let mut tokens: Vec<String> = Vec::with_capacity(spans.len());
        let mut prev_unknown = false;
        for (start, end, edge) in spans {
            let piece: String = chars[start..end].iter().collect();
            let unknown = edge == Edge::Unknown;
            match tokens.last_mut() {
                Some(last) if unknown && prev_unknown => last.push_str(&piece),
                _ => tokens.push(piece),
            }
            prev_unknown = unknown;
        }
        tokens
    }
}

fn mark_clusters(run: &[char], offset: usize, boundary: &mut [bool], cluster_end: &mut [Option<usize>]) {
    let mut starts = vec![0];
    for k in 1..run.len() {
        if !is_non_starter(run[k]) && !is_leading_vowel(run[k - 1]) {
            starts.push(k);
        }
    }
    starts.push(run.len());
    for pair in starts.windows(2) {
        boundary[offset + pair[0]] = true;
        boundary[offset + pair[1]] = true;
        cluster_end[offset + pair[0]] = Some(offset + pair[1]);
    }
}

fn mark_non_thai(run: &[char], offset: usize, boundary: &mut [bool], fixed_end: &mut [Option<usize>]) {
    let text: String = run.iter().collect();
    let mut byte_pos = 0;
    let mut char_pos = 0;
    while char_pos < run.len() {
        let len = match RE_NON_THAI.find(&text[byte_pos..]) {
            Ok(Some(m)) if !m.as_str().is_empty() => m.as_str().chars().count(),
            _ => 1,
        };
        let piece_bytes: usize = run[char_pos..char_pos + len].iter().map(|c| c.len_utf8()).sum();
        boundary[offset + char_pos] = true;
        fixed_end[offset + char_pos] = Some(offset + char_pos + len);
        char_pos += len;
        byte_pos += piece_bytes;
        boundary[offset + char_pos] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Vocabulary;

    fn tokenizer(words: &[&str]) -> Tokenizer {
        let vocab: Vocabulary = words.iter().map(|w| w.to_string()).collect();
        Tokenizer::new(Dictionary::from_vocabulary(&vocab).unwrap())
    }

    #[test]
    fn test_empty() {
        assert!(tokenizer(&[]).tokenize("").is_empty());
    }

    #[test]
    fn test_dictionary_words() {
        let t = tokenizer(&["สวัสดี", "ครับ"]);
        assert_eq!(t.tokenize("สวัสดีครับ"), vec!["สวัสดี", "ครับ"]);
    }

    #[test]
    fn test_longest_match_wins() {
        let t = tokenizer(&["รถ", "ไฟ", "ฟ้า", "รถไฟ", "รถไฟฟ้า", "มา"]);
        assert_eq!(t.tokenize("รถไฟฟ้ามา"), vec!["รถไฟฟ้า", "มา"]);
    }

    #[test]
    fn test_unknown_clusters_merge() {
        let t = tokenizer(&["ครับ"]);
        let out = t.tokenize("กขคครับ");
        assert_eq!(out, vec!["กขค", "ครับ"]);
    }

    #[test]
    fn test_numbers_and_times_stay_whole() {
        let t = tokenizer(&["เวลา"]);
        assert_eq!(t.tokenize("เวลา 5:30"), vec!["เวลา", " ", "5:30"]);
        assert_eq!(t.tokenize("3.14"), vec!["3.14"]);
        assert_eq!(t.tokenize("1,000"), vec!["1,000"]);
        assert_eq!(t.tokenize("๒๕๖๗"), vec!["๒๕๖๗"]);
    }

    #[test]
    fn test_abbreviation_with_period() {
        let t = tokenizer(&["น."]);
        assert_eq!(t.tokenize("10.30 น."), vec!["10.30", " ", "น."]);
    }

    #[test]
    fn test_latin_and_punctuation() {
        let t = tokenizer(&["สถานี"]);
        assert_eq!(t.tokenize("BTS สถานี!"), vec!["BTS", " ", "สถานี", "!"]);
    }

    #[test]
    fn test_lossless() {
        let t = tokenizer(&["สถานี", "หมอชิต", "รถไฟฟ้า"]);
        let input = "รถไฟฟ้า BTS สถานีหมอชิต เวลา 18:45 น.\nขอบคุณ";
        assert_eq!(t.tokenize(input).concat(), input);
    }

    #[test]
    fn test_words_do_not_split_clusters() {
        // "กา" is a word but "ก" alone must not be cut away from its vowel
        let t = tokenizer(&["ก"]);
        let out = t.tokenize("กา");
        assert_eq!(out, vec!["กา"]);
    }
}
