//! Content accumulation for incremental display
//!
//! A stream session owns one append-only buffer. Fragments are pulled from a
//! [`FragmentSource`] one at a time, appended in source order, and the whole
//! buffer is handed to the increment callback before the next pull. Pulling
//! is the only point where the loop waits; pacing, cancellation and timeouts
//! belong to the source.
//!
//! ```text
//!   source ──next()──▶ Fragment ──into_text──▶ buffer += text ──▶ on_increment(buffer)
//!      ▲                                                               │
//!      └───────────────────────────── pull again ◀─────────────────────┘
//! ```

mod sources;
mod utf8;

pub use sources::http_fragments;
pub use utf8::{InvalidUtf8, Utf8Decoder};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;

use crate::error::{Error, Result};

/// A string produced on demand
pub type DeferredText = Box<dyn FnOnce() -> String + Send>;

/// Pull-based sequence of fragments; single use
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// Number of bytes of an invalid fragment quoted in errors
const OFFENDING_PREVIEW_BYTES: usize = 16;

/// One incremental piece of text
pub enum Fragment {
    Text(String),
    /// Raw bytes; must be complete UTF-8
    Bytes(Bytes),
    /// Resolved right before it is appended
    Deferred(DeferredText),
}

impl Fragment {
    /// Resolve the fragment to text, or describe why it can't be
    pub fn into_text(self) -> std::result::Result<String, String> {
        match self {
            Fragment::Text(text) => Ok(text),
            Fragment::Deferred(produce) => Ok(produce()),
            Fragment::Bytes(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => Ok(text.to_string()),
                Err(_) => Err(describe_bytes(&bytes)),
            },
        }
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Fragment::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Fragment::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::Text(text)
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::Text(text.to_string())
    }
}

impl From<Bytes> for Fragment {
    fn from(bytes: Bytes) -> Self {
        Fragment::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Fragment {
    fn from(bytes: Vec<u8>) -> Self {
        Fragment::Bytes(Bytes::from(bytes))
    }
}

/// Where a stream's content comes from
pub enum FragmentSource {
    /// Whole content, shown in a single update
    Whole(String),
    /// Whole content produced on demand; resolved before the first update
    Deferred(DeferredText),
    /// Lazily pulled fragments
    Sequence(FragmentStream),
}

impl FragmentSource {
    pub fn whole(text: impl Into<String>) -> Self {
        FragmentSource::Whole(text.into())
    }

    pub fn deferred(produce: impl FnOnce() -> String + Send + 'static) -> Self {
        FragmentSource::Deferred(Box::new(produce))
    }

    /// Finite in-memory sequence
    pub fn from_iter<I, T>(fragments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        T: Into<Fragment>,
    {
        let fragments = fragments.into_iter().map(|f| Ok(f.into()));
        FragmentSource::Sequence(Box::pin(futures::stream::iter(fragments)))
    }

    /// Any stream of fragments
    pub fn from_stream<S>(fragments: S) -> Self
    where
        S: Stream<Item = Result<Fragment>> + Send + 'static,
    {
        FragmentSource::Sequence(Box::pin(fragments))
    }

    /// Whether the source can deliver more than one update
    pub fn is_multi_fragment(&self) -> bool {
        matches!(self, FragmentSource::Sequence(_))
    }
}

impl fmt::Debug for FragmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentSource::Whole(text) => f.debug_tuple("Whole").field(text).finish(),
            FragmentSource::Deferred(_) => f.write_str("Deferred(..)"),
            FragmentSource::Sequence(_) => f.write_str("Sequence(..)"),
        }
    }
}

/// Append-only text buffer of one stream session
#[derive(Debug, Default)]
pub struct Accumulator {
    buffer: String,
    fragments: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment; returns false (and changes nothing) for empty text
    pub fn push(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.buffer.push_str(text);
        self.fragments += 1;
        true
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of non-empty fragments appended so far
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn into_inner(self) -> String {
        self.buffer
    }
}

/// Drive `source` to exhaustion, reporting every increment
///
/// `on_increment` receives the full buffer each time and must finish handing
/// it off before the next fragment is pulled. Any error it returns ends the
/// stream. Returns the final buffer.
pub async fn drive<F>(source: FragmentSource, mut on_increment: F) -> Result<String>
where
    F: FnMut(&str) -> Result<()>,
{
    match source {
        FragmentSource::Whole(text) => {
            on_increment(&text)?;
            Ok(text)
        }
        FragmentSource::Deferred(produce) => {
            let text = produce();
            on_increment(&text)?;
            Ok(text)
        }
        FragmentSource::Sequence(mut fragments) => {
            let mut acc = Accumulator::new();
            while let Some(next) = fragments.next().await {
                let text = next?.into_text().map_err(|offending| {
                    tracing::warn!(
                        "Stream stopped after {} fragment(s): {}",
                        acc.fragments(),
                        offending
                    );
                    Error::InvalidFragment {
                        offending,
                        accumulated: acc.as_str().to_string(),
                    }
                })?;
                if !acc.push(&text) {
                    continue;
                }
                on_increment(acc.as_str())?;
            }
            tracing::trace!(
                "Stream exhausted: {} fragment(s), {} bytes",
                acc.fragments(),
                acc.len()
            );
            Ok(acc.into_inner())
        }
    }
}

fn describe_bytes(bytes: &[u8]) -> String {
    let shown = &bytes[..bytes.len().min(OFFENDING_PREVIEW_BYTES)];
    let hex: Vec<String> = shown.iter().map(|b| format!("{:02x}", b)).collect();
    let more = if bytes.len() > shown.len() { ", .." } else { "" };
    format!("bytes [{}{}] (not valid UTF-8)", hex.join(", "), more)
}
