//! Fragment sources backed by channels and remote byte streams
//!
//! Push-based transports (sockets, relays) are bridged into the same
//! pull-based interface the accumulator consumes: received fragments are
//! buffered in a channel and pulled from it one at a time.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{Fragment, FragmentSource, Utf8Decoder};
use crate::error::{Error, Result};

impl FragmentSource {
    /// Fragments pushed into a channel by another task
    ///
    /// The stream ends when every sender has been dropped.
    pub fn from_channel(rx: mpsc::Receiver<Fragment>) -> Self {
        FragmentSource::from_stream(ReceiverStream::new(rx).map(Ok))
    }

    /// Raw byte chunks, decoded as UTF-8 across chunk boundaries
    ///
    /// Undecodable bytes surface as a [`Fragment::Bytes`] so the accumulator
    /// reports them like any other unsupported fragment. Transport errors end
    /// the stream with [`Error::Transport`].
    pub fn from_byte_stream<S, B, E>(chunks: S) -> Self
    where
        S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Display + Send + 'static,
    {
        let fragments = async_stream::stream! {
            let mut decoder = Utf8Decoder::new();
            let mut failed = false;
            futures::pin_mut!(chunks);

            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(chunk) => match decoder.push(chunk.as_ref()) {
                        Ok(text) => {
                            if !text.is_empty() {
                                yield Ok(Fragment::Text(text));
                            }
                        }
                        Err(bad) => {
                            if !bad.decoded.is_empty() {
                                yield Ok(Fragment::Text(bad.decoded));
                            }
                            yield Ok(Fragment::Bytes(Bytes::from(bad.invalid)));
                            failed = true;
                            break;
                        }
                    },
                    Err(e) => {
                        yield Err(Error::Transport(e.to_string()));
                        failed = true;
                        break;
                    }
                }
            }

            if !failed {
                if let Err(rest) = decoder.finish() {
                    yield Ok(Fragment::Bytes(Bytes::from(rest)));
                }
            }
        };
        FragmentSource::from_stream(fragments)
    }
}

/// Open a streaming GET request and expose its body as fragments
///
/// Used to consume the simulated token endpoints (or any server that streams
/// a plain-text body).
pub async fn http_fragments(client: &reqwest::Client, url: &str) -> Result<FragmentSource> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::Transport(e.to_string()))?;

    tracing::debug!("Streaming fragments from {} ({})", url, response.status());
    Ok(FragmentSource::from_byte_stream(response.bytes_stream()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::drive;

    async fn collect(source: FragmentSource) -> (Result<String>, Vec<String>) {
        let mut seen = Vec::new();
        let result = drive(source, |buffer| {
            seen.push(buffer.to_string());
            Ok(())
        })
        .await;
        (result, seen)
    }

    #[tokio::test]
    async fn test_channel_source_preserves_push_order() {
        let (tx, rx) = mpsc::channel(8);
        let producer = tokio::spawn(async move {
            for part in ["Th", "e q", "uick"] {
                tx.send(Fragment::from(part)).await.unwrap();
            }
        });

        let (result, seen) = collect(FragmentSource::from_channel(rx)).await;
        producer.await.unwrap();
        assert_eq!(result.unwrap(), "The quick");
        assert_eq!(seen, vec!["Th", "The q", "The quick"]);
    }

    #[tokio::test]
    async fn test_byte_stream_rejoins_split_characters() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(b"caf\xc3".to_vec()),
            Ok(b"\xa9 ".to_vec()),
            Ok("日本".as_bytes().to_vec()),
        ];
        let (result, seen) =
            collect(FragmentSource::from_byte_stream(futures::stream::iter(chunks))).await;
        assert_eq!(result.unwrap(), "café 日本");
        assert_eq!(seen, vec!["caf", "café ", "café 日本"]);
    }

    #[tokio::test]
    async fn test_byte_stream_invalid_bytes_keep_decoded_prefix() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> =
            vec![Ok(b"He".to_vec()), Ok(b"llo\xff".to_vec())];
        let (result, seen) =
            collect(FragmentSource::from_byte_stream(futures::stream::iter(chunks))).await;
        let err = result.unwrap_err();
        assert_eq!(err.partial_content(), Some("Hello"));
        assert_eq!(seen, vec!["He", "Hello"]);
    }

    #[tokio::test]
    async fn test_byte_stream_truncated_character_is_invalid() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> = vec![Ok(b"ok\xe6".to_vec())];
        let (result, _) =
            collect(FragmentSource::from_byte_stream(futures::stream::iter(chunks))).await;
        assert!(matches!(result, Err(Error::InvalidFragment { .. })));
    }

    #[tokio::test]
    async fn test_byte_stream_transport_error() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> =
            vec![Ok(b"abc".to_vec()), Err("reset by peer".to_string())];
        let (result, _) =
            collect(FragmentSource::from_byte_stream(futures::stream::iter(chunks))).await;
        assert!(matches!(result, Err(Error::Transport(ref m)) if m == "reset by peer"));
    }
}
