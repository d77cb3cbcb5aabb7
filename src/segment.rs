//! Segment planning: cut input text into independently speakable pieces.
//!
//! Each segment is synthesised on its own, so a cut must never land inside a
//! date reading or between a number and the Thai word it belongs to. Chunks
//! that are still too long after whitespace splitting are repacked word by
//! word with the dictionary tokenizer.

use crate::{
    preprocess::{protect_adjacency, rewrite_dates, Span},
    tokenize::Tokenizer,
};

/// Chunks longer than this (in chars) are repacked.
pub const SPLIT_THRESHOLD: usize = 120;

/// Character budget used when repacking an over-long chunk.
pub const PACK_MAX_CHARS: usize = 150;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into ordered, non-empty, trimmed segments.
///
/// Lines and whitespace separate segments; dates and number/Thai pairs stay
/// together; anything over [`SPLIT_THRESHOLD`] chars is repacked into chunks
/// of at most [`PACK_MAX_CHARS`].
pub fn intelligent_split(text: &str, tokenizer: &Tokenizer) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let spans = protect_adjacency(rewrite_dates(text));

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for span in &spans {
        match span {
            Span::Plain(plain) => {
                for c in plain.chars() {
                    if c.is_whitespace() {
                        flush(&mut current, &mut chunks);
                    } else {
                        current.push(c);
                    }
                }
            }
            Span::Protected(words) => current.push_str(&words.join(" ")),
            Span::Break => flush(&mut current, &mut chunks),
        }
    }
    flush(&mut current, &mut chunks);

    let mut segments = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if char_len(&chunk) > SPLIT_THRESHOLD {
            segments.extend(split_long_sentence(&chunk, PACK_MAX_CHARS, tokenizer));
        } else {
            segments.push(chunk);
        }
    }
    segments
}

fn flush(current: &mut String, chunks: &mut Vec<String>) {
    let chunk = current.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
    current.clear();
}

/// Greedily pack the tokens of `text` into chunks of at most `max_length`
/// chars, left to right.
///
/// Tokens are concatenated as-is (whitespace runs are tokens too). A single
/// token longer than `max_length` becomes its own chunk.
pub fn split_long_sentence(text: &str, max_length: usize, tokenizer: &Tokenizer) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_length {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for token in tokenizer.tokenize(text) {
        let token_len = char_len(&token);
        if current_len + token_len <= max_length {
            current.push_str(&token);
            current_len += token_len;
        } else {
            push_chunk(&current, &mut chunks);
            current = token;
            current_len = token_len;
        }
    }
    push_chunk(&current, &mut chunks);
    chunks
}

fn push_chunk(chunk: &str, chunks: &mut Vec<String>) {
    let chunk = chunk.trim();
    if !chunk.is_empty() {
        chunks.push(chunk.to_string());
    }
}
