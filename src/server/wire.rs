//! Message framing on the stdio byte stream.
//!
//! Two encodings are accepted: LSP-style `Content-Length` framing and one JSON
//! document per line. The encoding is detected from the first message and used
//! for every message on the connection, including replies.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::protocol::JsonRpcResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMode {
    /// `Content-Length: N\r\n\r\n<N bytes>`
    Framed,
    /// `<json>\n`
    Line,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing Content-Length header")]
    MissingContentLength,

    #[error("invalid Content-Length value {0:?}")]
    InvalidContentLength(String),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reads successive request payloads from a buffered byte stream.
///
/// Lines are handled as raw bytes; payloads that are not valid UTF-8 are still
/// delivered so the dispatcher can answer them with a parse error.
pub struct MessageReader<R> {
    reader: R,
    mode: Option<WireMode>,
    line: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            mode: None,
            line: Vec::new(),
        }
    }

    /// The connection's encoding, once the first message has been seen.
    pub fn mode(&self) -> Option<WireMode> {
        self.mode
    }

    /// Next raw payload, or `None` on a clean end of stream between messages.
    pub async fn next_message(&mut self) -> Result<Option<Vec<u8>>, WireError> {
        let Some(first) = self.next_non_blank_line().await? else {
            return Ok(None);
        };

        let mode = *self.mode.get_or_insert_with(|| {
            if is_content_length_line(&first) {
                WireMode::Framed
            } else {
                WireMode::Line
            }
        });

        match mode {
            WireMode::Line => Ok(Some(first)),
            WireMode::Framed => {
                let length = self.read_frame_headers(&first).await?;
                let mut body = vec![0u8; length];
                self.reader.read_exact(&mut body).await?;
                Ok(Some(body))
            }
        }
    }

    /// Skip blank lines; return the next line with surrounding ASCII whitespace removed.
    async fn next_non_blank_line(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line).await? == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim_ascii();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_vec()));
            }
        }
    }

    /// Consume header lines up to the blank separator and return the body length.
    async fn read_frame_headers(&mut self, first: &[u8]) -> Result<usize, WireError> {
        let mut length = parse_content_length(first)?;
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line).await? == 0 {
                return Err(WireError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "unexpected eof while reading frame headers",
                )));
            }
            let header = self.line.trim_ascii_end();
            if header.is_empty() {
                break;
            }
            if let Some(v) = parse_content_length(header)? {
                length = Some(v);
            }
        }
        length.ok_or(WireError::MissingContentLength)
    }
}

/// Write one response in the connection's encoding and flush.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    mode: WireMode,
    response: &JsonRpcResponse,
) -> Result<(), WireError> {
    let body = serde_json::to_vec(response)?;
    match mode {
        WireMode::Framed => {
            writer
                .write_all(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes())
                .await?;
            writer.write_all(&body).await?;
        }
        WireMode::Line => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

fn is_content_length_line(line: &[u8]) -> bool {
    line.len() >= 15 && line[..15].eq_ignore_ascii_case(b"content-length:")
}

/// `Ok(None)` for other headers; an error when a Content-Length value does not parse.
fn parse_content_length(line: &[u8]) -> Result<Option<usize>, WireError> {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return Ok(None);
    };
    let (name, value) = (&line[..colon], &line[colon + 1..]);
    if !name.trim_ascii().eq_ignore_ascii_case(b"content-length") {
        return Ok(None);
    }
    let value = String::from_utf8_lossy(value.trim_ascii());
    value
        .parse::<usize>()
        .map(Some)
        .map_err(|_| WireError::InvalidContentLength(value.into_owned()))
}
