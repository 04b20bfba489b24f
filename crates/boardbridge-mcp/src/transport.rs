//! Message framing over stdio.
//!
//! Output is newline-delimited JSON. Input accepts both newline-delimited
//! JSON and `Content-Length` framed messages:
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! {"jsonrpc": "2.0", "id": 1, "method": "...", "params": {...}}
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{McpError, Result};

/// Reads one JSON message at a time from a byte stream.
pub struct MessageReader<R> {
    reader: R,
    line: String,
}

impl<R: AsyncBufRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    /// Read the next message body.
    ///
    /// Returns `Ok(None)` at end of stream. A malformed header is a
    /// [`McpError::Protocol`]; the offending header has been consumed, so the
    /// caller may keep reading.
    pub async fn next_message(&mut self) -> Result<Option<String>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Ok(None);
            }

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let Some(length) = content_length(trimmed) else {
                return Ok(Some(trimmed.to_string()));
            };
            let length = length?;
            self.skip_headers().await?;

            let mut body = vec![0u8; length];
            self.reader.read_exact(&mut body).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    McpError::protocol(format!(
                        "stream ended inside a {length}-byte message body"
                    ))
                } else {
                    McpError::Io(e)
                }
            })?;

            let body = String::from_utf8(body)
                .map_err(|e| McpError::protocol(format!("invalid UTF-8 in message: {e}")))?;
            tracing::trace!(content_length = length, "received framed message");
            return Ok(Some(body));
        }
    }

    /// Consume the remaining headers up to the blank separator line.
    async fn skip_headers(&mut self) -> Result<()> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Err(McpError::protocol("stream ended inside message headers"));
            }
            if self.line.trim().is_empty() {
                return Ok(());
            }
        }
    }
}

/// `Some` when the line is a `Content-Length` header.
fn content_length(line: &str) -> Option<Result<usize>> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    Some(
        value
            .trim()
            .parse()
            .map_err(|e| McpError::protocol(format!("invalid Content-Length: {e}"))),
    )
}

/// Write one message followed by a newline, then flush.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all(input: &str) -> Vec<Result<Option<String>>> {
        let mut reader = MessageReader::new(input.as_bytes());
        let mut out = Vec::new();
        loop {
            let next = reader.next_message().await;
            let done = matches!(next, Ok(None));
            out.push(next);
            if done {
                return out;
            }
        }
    }

    #[tokio::test]
    async fn test_newline_delimited() {
        let mut reader = MessageReader::new("{\"a\":1}\n\n  {\"b\":2}\r\n".as_bytes());
        assert_eq!(
            reader.next_message().await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(
            reader.next_message().await.unwrap().as_deref(),
            Some("{\"b\":2}")
        );
        assert!(reader.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_content_length_framing() {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        let input = format!(
            "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n{}{{\"next\":true}}\n",
            body.len(),
            body
        );
        let mut reader = MessageReader::new(input.as_bytes());
        assert_eq!(reader.next_message().await.unwrap().as_deref(), Some(body));
        assert_eq!(
            reader.next_message().await.unwrap().as_deref(),
            Some("{\"next\":true}")
        );
    }

    #[tokio::test]
    async fn test_header_name_case_insensitive() {
        let input = "content-length: 2\r\n\r\n{}";
        let mut reader = MessageReader::new(input.as_bytes());
        assert_eq!(reader.next_message().await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_invalid_length_recovers() {
        let results = read_all("Content-Length: lots\n{\"ok\":1}\n").await;
        assert!(matches!(results[0], Err(McpError::Protocol(_))));
        // only the bad header line was consumed
        assert_eq!(results[1].as_ref().unwrap().as_deref(), Some("{\"ok\":1}"));
    }

    #[tokio::test]
    async fn test_truncated_body() {
        let results = read_all("Content-Length: 50\r\n\r\n{\"short\":1}").await;
        assert!(matches!(results[0], Err(McpError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_write_message_appends_newline() {
        let mut out = Vec::new();
        write_message(&mut out, "{\"id\":1}").await.unwrap();
        assert_eq!(out, b"{\"id\":1}\n");
    }
}
