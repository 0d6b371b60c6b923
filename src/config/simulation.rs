//! Simulated token stream pacing

use serde::Deserialize;
use std::time::Duration;

/// Chunk sizes and delays of the simulated token endpoints
///
/// Ranges are inclusive. The character stream cuts the text into runs of
/// `char_chunk_min..=char_chunk_max` characters; the tokenizer stream groups
/// `token_chunk_min..=token_chunk_max` whitespace-delimited tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub char_chunk_min: usize,
    pub char_chunk_max: usize,
    pub char_delay_ms: u64,
    pub token_chunk_min: usize,
    pub token_chunk_max: usize,
    pub token_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            char_chunk_min: 5,
            char_chunk_max: 15,
            char_delay_ms: 50,
            token_chunk_min: 5,
            token_chunk_max: 20,
            token_delay_ms: 300,
        }
    }
}

/// Simulation settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileSimulation {
    pub char_chunk_min: Option<usize>,
    pub char_chunk_max: Option<usize>,
    pub char_delay_ms: Option<u64>,
    pub token_chunk_min: Option<usize>,
    pub token_chunk_max: Option<usize>,
    pub token_delay_ms: Option<u64>,
}

impl SimulationConfig {
    /// Resolve the section, noting values that had to be replaced
    ///
    /// Zero-sized minimums are raised to one and inverted ranges collapse to
    /// their minimum, so every chunk makes progress.
    pub fn from_file(file: Option<FileSimulation>, warnings: &mut Vec<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let (char_chunk_min, char_chunk_max) = chunk_range(
            "char_chunk",
            file.char_chunk_min.unwrap_or(defaults.char_chunk_min),
            file.char_chunk_max.unwrap_or(defaults.char_chunk_max),
            warnings,
        );
        let (token_chunk_min, token_chunk_max) = chunk_range(
            "token_chunk",
            file.token_chunk_min.unwrap_or(defaults.token_chunk_min),
            file.token_chunk_max.unwrap_or(defaults.token_chunk_max),
            warnings,
        );

        Self {
            char_chunk_min,
            char_chunk_max,
            char_delay_ms: file.char_delay_ms.unwrap_or(defaults.char_delay_ms),
            token_chunk_min,
            token_chunk_max,
            token_delay_ms: file.token_delay_ms.unwrap_or(defaults.token_delay_ms),
        }
    }

    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }

    pub fn token_delay(&self) -> Duration {
        Duration::from_millis(self.token_delay_ms)
    }
}

/// Clamp one `<name>_min..=<name>_max` pair into a usable range
fn chunk_range(name: &str, min: usize, max: usize, warnings: &mut Vec<String>) -> (usize, usize) {
    let lo = min.max(1);
    if lo != min {
        warnings.push(format!("[simulation] {}_min must be at least 1, using 1", name));
    }
    let hi = max.max(lo);
    if hi != max {
        warnings.push(format!(
            "[simulation] {name}_max ({max}) is below {name}_min, using {lo}"
        ));
    }
    (lo, hi)
}
