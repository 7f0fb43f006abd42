//! Server-Sent Events decoding
//!
//! Splits a byte stream into lines and yields the payload of every `data:`
//! line. Bytes may arrive split anywhere, including inside a UTF-8 sequence.

use std::fmt::Display;
use std::pin::Pin;

use futures::Stream;
use futures_util::StreamExt;

use crate::error::LlmError;

/// Marker some endpoints send as the final data line
const DONE_MARKER: &str = "[DONE]";

/// Accumulates bytes and hands out complete lines
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator
    fn next_line(&mut self) -> Option<String> {
        let pos = self.bytes.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line);
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Whatever is left once the stream has closed
    fn take_rest(&mut self) -> Option<String> {
        if self.bytes.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.bytes);
        Some(String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string())
    }
}

/// Payload of a `data:` line, or None for comments, other fields and blanks
fn data_payload(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data))
}

/// Turn a raw SSE byte stream into its `data:` payloads.
///
/// A transport error ends the stream after being yielded once.
pub fn data_events<S, B, E>(bytes: S) -> Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer = LineBuffer::default();

        'read: while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    buffer.extend(chunk.as_ref());
                    while let Some(line) = buffer.next_line() {
                        if let Some(data) = data_payload(&line) {
                            if data == DONE_MARKER {
                                break 'read;
                            }
                            if !data.is_empty() {
                                yield Ok(data.to_string());
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(LlmError::Stream(e.to_string()));
                    break 'read;
                }
            }
        }

        if let Some(line) = buffer.take_rest() {
            if let Some(data) = data_payload(&line) {
                if !data.is_empty() && data != DONE_MARKER {
                    yield Ok(data.to_string());
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect(chunks: Vec<Result<Vec<u8>, String>>) -> Vec<Result<String, String>> {
        data_events(stream::iter(chunks))
            .map(|r| r.map_err(|e| e.to_string()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_splits_data_lines() {
        let events = collect(vec![Ok(b"data: one\n\ndata: two\n\n".to_vec())]).await;
        assert_eq!(events, vec![Ok("one".to_string()), Ok("two".to_string())]);
    }

    #[tokio::test]
    async fn test_reassembles_lines_across_chunks() {
        let events = collect(vec![
            Ok(b"da".to_vec()),
            Ok(b"ta: {\"a\":".to_vec()),
            Ok(b"1}\r\n\r\n".to_vec()),
        ])
        .await;
        assert_eq!(events, vec![Ok("{\"a\":1}".to_string())]);
    }

    #[tokio::test]
    async fn test_split_utf8_sequence() {
        let text = "data: héllo\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let events = collect(vec![Ok(text[..split].to_vec()), Ok(text[split..].to_vec())]).await;
        assert_eq!(events, vec![Ok("héllo".to_string())]);
    }

    #[tokio::test]
    async fn test_ignores_comments_and_other_fields() {
        let events = collect(vec![Ok(b": keep-alive\nevent: message\nid: 3\ndata:x\n".to_vec())]).await;
        assert_eq!(events, vec![Ok("x".to_string())]);
    }

    #[tokio::test]
    async fn test_done_marker_ends_stream() {
        let events = collect(vec![Ok(b"data: a\ndata: [DONE]\ndata: b\n".to_vec())]).await;
        assert_eq!(events, vec![Ok("a".to_string())]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let events = collect(vec![Ok(b"data: a\ndata: b".to_vec())]).await;
        assert_eq!(events, vec![Ok("a".to_string()), Ok("b".to_string())]);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let events = collect(vec![
            Ok(b"data: a\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: b\n".to_vec()),
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Ok("a".to_string()));
        assert!(events[1].as_ref().unwrap_err().contains("connection reset"));
    }
}
