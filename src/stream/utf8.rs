//! Incremental UTF-8 decoding across chunk boundaries
//!
//! Network chunks split text wherever they like, including in the middle of
//! a multi-byte character. The decoder hands back every complete character
//! and holds an incomplete trailing sequence until the next chunk.

/// An invalid byte sequence found while decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUtf8 {
    /// Text decoded before the invalid sequence
    pub decoded: String,
    /// The invalid sequence and everything after it in the chunk
    pub invalid: Vec<u8>,
}

/// Stateful UTF-8 decoder for chunked byte streams
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk
    ///
    /// Returns the decodable text (possibly empty). After an invalid
    /// sequence the decoder is drained and callers should stop decoding.
    pub fn push(&mut self, chunk: &[u8]) -> Result<String, InvalidUtf8> {
        self.pending.extend_from_slice(chunk);

        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                Ok(text)
            }
            Err(e) if e.error_len().is_some() => {
                let mut pending = std::mem::take(&mut self.pending);
                let invalid = pending.split_off(e.valid_up_to());
                Err(InvalidUtf8 {
                    decoded: String::from_utf8_lossy(&pending).into_owned(),
                    invalid,
                })
            }
            Err(e) => {
                // Valid prefix followed by an incomplete character
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                Ok(text)
            }
        }
    }

    /// Bytes still waiting for the rest of their character
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// End of input; leftover bytes are an incomplete character
    pub fn finish(self) -> Result<(), Vec<u8>> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(self.pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_multibyte_character() {
        // "日" = e6 97 a5
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.push(b"ab\xe6\x97").unwrap(), "ab");
        assert_eq!(decoder.pending(), 2);
        assert_eq!(decoder.push(b"\xa5c").unwrap(), "日c");
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_character_split_over_three_chunks() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.push(b"\xe6").unwrap(), "");
        assert_eq!(decoder.push(b"\x97").unwrap(), "");
        assert_eq!(decoder.push(b"\xa5").unwrap(), "日");
    }

    #[test]
    fn test_invalid_sequence_is_reported() {
        let mut decoder = Utf8Decoder::new();
        let err = decoder.push(b"ok\xffmore").unwrap_err();
        assert_eq!(err.decoded, "ok");
        assert_eq!(err.invalid, b"\xffmore".to_vec());
    }

    #[test]
    fn test_truncated_input_fails_on_finish() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.push(b"x\xe6").unwrap(), "x");
        assert_eq!(decoder.finish().unwrap_err(), vec![0xe6]);
    }
}
