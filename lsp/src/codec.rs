//! JSON-RPC framing codec for LSP communication.
//!
//! LSP uses `Content-Length: N\r\n\r\n{json}` framing over stdin/stdout.
//! This module provides [`FrameReader`] and [`FrameWriter`] for async
//! reading and writing of framed JSON-RPC messages.
//!
//! The reader is deliberately strict: every header line must end in CRLF,
//! only `Content-Length` and `Content-Type` are accepted, and the length
//! must be plain decimal. A conformance harness should notice a sloppy
//! server, not paper over it.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{FrameError, HeaderError};

/// Maximum frame size (4 MiB) to prevent unbounded memory allocation.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Longest accepted header line, CRLF included.
pub const MAX_HEADER_LINE_BYTES: usize = 1024;

const CONTENT_LENGTH: &str = "Content-Length";
const CONTENT_TYPE: &str = "Content-Type";

/// Reads JSON-RPC frames from an async reader.
///
/// Parses `Content-Length` headers and reads exactly that many bytes,
/// then deserializes the body as JSON.
pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next JSON-RPC frame.
    ///
    /// Returns `Ok(None)` on EOF before any header byte (the peer went away).
    /// Returns `Err` on malformed headers, truncated bodies, or bodies that
    /// are not JSON.
    pub async fn read_frame(&mut self) -> Result<Option<serde_json::Value>, FrameError> {
        let content_length = match self.read_headers().await? {
            Some(len) => len,
            None => return Ok(None), // EOF
        };

        if content_length > MAX_FRAME_BYTES {
            return Err(HeaderError::FrameTooLarge(content_length).into());
        }

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await?;

        let value = serde_json::from_slice(&body)?;
        Ok(Some(value))
    }

    /// Parse headers until the empty line separator.
    ///
    /// Returns the `Content-Length` value, or `None` on EOF.
    async fn read_headers(&mut self) -> Result<Option<usize>, FrameError> {
        let mut content_length: Option<usize> = None;
        let mut line = Vec::new();
        let mut saw_any_header_bytes = false;

        loop {
            line.clear();
            let bytes_read = (&mut self.reader)
                .take(MAX_HEADER_LINE_BYTES as u64 + 1)
                .read_until(b'\n', &mut line)
                .await?;
            if line.len() > MAX_HEADER_LINE_BYTES {
                return Err(HeaderError::LineTooLong.into());
            }

            if bytes_read == 0 {
                // EOF is only a clean shutdown before the first header byte.
                if !saw_any_header_bytes {
                    return Ok(None);
                }
                return Err(HeaderError::UnexpectedEof.into());
            }
            saw_any_header_bytes = true;

            let Some(content) = line.strip_suffix(b"\r\n") else {
                return Err(HeaderError::MissingCrLf.into());
            };
            if content.is_empty() {
                break;
            }

            let text = String::from_utf8_lossy(content);
            content_length = parse_header_line(&text)?.or(content_length);
        }

        match content_length {
            Some(len) => Ok(Some(len)),
            None => Err(HeaderError::MissingContentLength.into()),
        }
    }
}

/// Parse one header line (CRLF already stripped).
///
/// Returns the length for `Content-Length`, `None` for the ignored
/// `Content-Type`, and an error for anything else.
fn parse_header_line(line: &str) -> Result<Option<usize>, HeaderError> {
    let Some((name, value)) = line.split_once(':') else {
        return Err(HeaderError::UnknownHeader(line.to_string()));
    };
    let value = value.trim();

    if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HeaderError::InvalidContentLength(value.to_string()));
        }
        return value
            .parse()
            .map(Some)
            .map_err(|_| HeaderError::InvalidContentLength(value.to_string()));
    }
    if name.eq_ignore_ascii_case(CONTENT_TYPE) {
        return Ok(None);
    }
    Err(HeaderError::UnknownHeader(name.to_string()))
}

/// Writes JSON-RPC frames to an async writer.
///
/// Serializes JSON and prepends the `Content-Length` header.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a JSON-RPC frame with `Content-Length` header.
    pub async fn write_frame(&mut self, msg: &serde_json::Value) -> Result<(), FrameError> {
        let body = serde_json::to_string(msg)?;
        let header = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len());

        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(body.as_bytes()).await?;
        self.writer.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_one(input: &[u8]) -> Result<Option<serde_json::Value>, FrameError> {
        FrameReader::new(input).read_frame().await
    }

    fn assert_header_error(result: Result<Option<serde_json::Value>, FrameError>) -> HeaderError {
        match result {
            Err(FrameError::MalformedHeader(header)) => header,
            other => panic!("expected MalformedHeader, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let msg = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/publishDiagnostics",
            "params": { "uri": "file:///test.sol", "diagnostics": [] }
        });

        let mut buf = Vec::new();
        let mut writer = FrameWriter::new(&mut buf);
        writer.write_frame(&msg).await.unwrap();

        let mut reader = FrameReader::new(buf.as_slice());
        let result = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(result, msg);
    }

    #[tokio::test]
    async fn test_multiple_frames() {
        let msg1 = serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": null});
        let msg2 = serde_json::json!({"jsonrpc": "2.0", "method": "initialized"});

        let mut buf = Vec::new();
        let mut writer = FrameWriter::new(&mut buf);
        writer.write_frame(&msg1).await.unwrap();
        writer.write_frame(&msg2).await.unwrap();

        let mut reader = FrameReader::new(buf.as_slice());
        assert_eq!(reader.read_frame().await.unwrap().unwrap(), msg1);
        assert_eq!(reader.read_frame().await.unwrap().unwrap(), msg2);
        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eof_returns_none() {
        assert!(read_one(b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_content_length() {
        let header = assert_header_error(read_one(b"Content-Type: application/json\r\n\r\n{}").await);
        assert!(matches!(header, HeaderError::MissingContentLength));
    }

    #[tokio::test]
    async fn test_eof_mid_headers_is_error() {
        // EOF after a complete header line must not look like a clean shutdown.
        let header = assert_header_error(read_one(b"Content-Length: 10\r\n").await);
        assert!(matches!(header, HeaderError::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_header_without_crlf() {
        let header = assert_header_error(read_one(b"Content-Length: 2\n\r\n{}").await);
        assert!(matches!(header, HeaderError::MissingCrLf));
    }

    #[tokio::test]
    async fn test_truncated_header_line_at_eof() {
        let header = assert_header_error(read_one(b"Content-Len").await);
        assert!(matches!(header, HeaderError::MissingCrLf));
    }

    #[tokio::test]
    async fn test_unknown_header_rejected() {
        let header =
            assert_header_error(read_one(b"X-Trace: yes\r\nContent-Length: 2\r\n\r\n{}").await);
        assert!(matches!(header, HeaderError::UnknownHeader(name) if name == "X-Trace"));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let frame = format!("Content-Length: {}\r\n\r\n", MAX_FRAME_BYTES + 1);
        let header = assert_header_error(read_one(frame.as_bytes()).await);
        assert!(matches!(header, HeaderError::FrameTooLarge(_)));
    }

    #[tokio::test]
    async fn test_endless_header_line_rejected() {
        let mut reader = FrameReader::new(tokio::io::repeat(b'a'));
        let header = assert_header_error(reader.read_frame().await);
        assert!(matches!(header, HeaderError::LineTooLong));
    }

    #[tokio::test]
    async fn test_header_line_at_limit_accepted() {
        let padding = MAX_HEADER_LINE_BYTES - "Content-Length: 2\r\n".len();
        let frame = format!("Content-Length: {}2\r\n\r\n{{}}", "0".repeat(padding));
        let result = read_one(frame.as_bytes()).await.unwrap().unwrap();
        assert_eq!(result, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_case_insensitive_content_length() {
        let body = r#"{"jsonrpc":"2.0","id":1}"#;
        let frame = format!("content-length: {}\r\n\r\n{body}", body.len());

        let result = read_one(frame.as_bytes()).await.unwrap().unwrap();
        assert_eq!(result["id"], 1);
    }

    #[tokio::test]
    async fn test_content_type_is_ignored() {
        let body = r#"{"jsonrpc":"2.0","id":1}"#;
        let frame = format!(
            "Content-Type: application/vscode-jsonrpc; charset=utf-8\r\nContent-Length: {}\r\n\r\n{body}",
            body.len(),
        );

        let result = read_one(frame.as_bytes()).await.unwrap().unwrap();
        assert_eq!(result["id"], 1);
    }

    #[tokio::test]
    async fn test_eof_mid_body() {
        // Content-Length says 100, but only 5 bytes follow
        let result = read_one(b"Content-Length: 100\r\n\r\nhello").await;
        assert!(matches!(result, Err(FrameError::Io(_))));
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let body = b"not valid json!!!";
        let mut buf = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        buf.extend_from_slice(body);

        let result = read_one(&buf).await;
        assert!(matches!(result, Err(FrameError::Decode(_))));
    }

    #[tokio::test]
    async fn test_multibyte_utf8_content_length_counts_bytes() {
        // "é" is 2 bytes in UTF-8, so {"k":"é"} is 10 bytes.
        let body = r#"{"k":"é"}"#;
        assert_eq!(body.len(), 10);
        let frame = format!("Content-Length: {}\r\n\r\n{body}", body.len());

        let result = read_one(frame.as_bytes()).await.unwrap().unwrap();
        assert_eq!(result["k"], "é");
    }

    #[tokio::test]
    async fn test_invalid_content_length_value() {
        let header = assert_header_error(read_one(b"Content-Length: not_a_number\r\n\r\n").await);
        assert!(matches!(header, HeaderError::InvalidContentLength(v) if v == "not_a_number"));
    }

    #[tokio::test]
    async fn test_signed_content_length_rejected() {
        let header = assert_header_error(read_one(b"Content-Length: +2\r\n\r\n{}").await);
        assert!(matches!(header, HeaderError::InvalidContentLength(_)));
    }

    #[tokio::test]
    async fn test_empty_content_length_rejected() {
        let header = assert_header_error(read_one(b"Content-Length: \r\n\r\n{}").await);
        assert!(matches!(header, HeaderError::InvalidContentLength(_)));
    }

    #[tokio::test]
    async fn test_write_content_length_is_byte_count() {
        let msg = serde_json::json!({"k": "é"});
        let mut buf = Vec::new();
        let mut writer = FrameWriter::new(&mut buf);
        writer.write_frame(&msg).await.unwrap();

        let output = String::from_utf8(buf).unwrap();
        let body = serde_json::to_string(&msg).unwrap();
        assert_eq!(output, format!("Content-Length: {}\r\n\r\n{body}", body.len()));
    }
}
