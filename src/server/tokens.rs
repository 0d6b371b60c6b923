//! Simulated token streams
//!
//! Stand-ins for a language model producing output: the input text is cut
//! into randomly sized chunks and released one at a time with a fixed pause
//! after each chunk.

use futures::Stream;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

use crate::config::SimulationConfig;

/// Random value in `min..=max`, seeded from `RandomState`
fn random_in(min: usize, max: usize) -> usize {
    if max <= min {
        return min;
    }
    let random = RandomState::new().build_hasher().finish() as usize;
    min + random % (max - min + 1)
}

/// Split `text` into runs of characters whose lengths come from `next_len`
///
/// Chunks never split a character. `next_len` is clamped to at least one.
pub fn char_chunks(text: &str, mut next_len: impl FnMut() -> usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + next_len().max(1)).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start = end;
    }
    chunks
}

/// Group whitespace-delimited tokens into chunks whose sizes come from `next_len`
///
/// Each token keeps the whitespace that follows it, so concatenating the
/// chunks gives back the input text.
pub fn token_chunks(text: &str, mut next_len: impl FnMut() -> usize) -> Vec<String> {
    let tokens = split_tokens(text);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < tokens.len() {
        let end = (start + next_len().max(1)).min(tokens.len());
        chunks.push(tokens[start..end].concat());
        start = end;
    }
    chunks
}

/// Split into tokens, each carrying its trailing whitespace
fn split_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = false;
    let mut has_word = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_space = true;
            continue;
        }
        // leading whitespace stays with the first token
        if in_space && has_word {
            tokens.push(&text[start..i]);
            start = i;
        }
        in_space = false;
        has_word = true;
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Release `chunks` one at a time, pausing `delay` after each
pub fn paced(chunks: Vec<String>, delay: Duration) -> impl Stream<Item = String> + Send + 'static {
    async_stream::stream! {
        for chunk in chunks {
            yield chunk;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Character-chunked stream of `text`
pub fn simulated_token_stream(
    text: &str,
    sim: &SimulationConfig,
) -> impl Stream<Item = String> + Send + 'static {
    let (min, max) = (sim.char_chunk_min, sim.char_chunk_max);
    let chunks = char_chunks(text, || random_in(min, max));
    tracing::debug!("Simulating {} character chunk(s)", chunks.len());
    paced(chunks, sim.char_delay())
}

/// Token-chunked stream of `text`
pub fn simulated_tokenizer_stream(
    text: &str,
    sim: &SimulationConfig,
) -> impl Stream<Item = String> + Send + 'static {
    let (min, max) = (sim.token_chunk_min, sim.token_chunk_max);
    let chunks = token_chunks(text, || random_in(min, max));
    tracing::debug!("Simulating {} token chunk(s)", chunks.len());
    paced(chunks, sim.token_delay())
}
