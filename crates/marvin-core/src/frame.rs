//! Line-oriented wire frames
//!
//! Each token travels as `0:"<json string>"\n`. JSON string escaping keeps
//! raw newlines out of the payload, so a reader can split the byte stream on
//! `\n` regardless of how the transport segments it.

use crate::error::{Error, Result};

/// Literal tag that opens every frame
pub const FRAME_TAG: &str = "0:";

/// Encode one token into a frame. The payload carries the token plus the
/// separating space that `split(' ')` removed.
pub fn encode_frame(token: &str) -> Result<String> {
    let payload = serde_json::to_string(&format!("{token} ")).map_err(Error::Encode)?;
    let mut frame = String::with_capacity(FRAME_TAG.len() + payload.len() + 1);
    frame.push_str(FRAME_TAG);
    frame.push_str(&payload);
    frame.push('\n');
    Ok(frame)
}

/// Decode one frame line (without its newline) back to the payload text.
///
/// Anything before the first tag is discarded.
pub fn decode_line(line: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(line).map_err(|e| Error::malformed(e.to_string(), line))?;
    let start = text
        .find(FRAME_TAG)
        .ok_or_else(|| Error::malformed("missing frame tag", line))?;
    let payload = &text[start + FRAME_TAG.len()..];
    serde_json::from_str::<String>(payload).map_err(|e| Error::malformed(e.to_string(), line))
}

/// Incremental decoder for a frame stream that arrives in arbitrary pieces
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return one result per completed line.
    ///
    /// Bytes after the last newline stay buffered until the next call.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<String>> {
        self.buffer.extend_from_slice(bytes);

        let mut decoded = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + offset;
            let line = &self.buffer[consumed..end];
            if !line.is_empty() {
                decoded.push(decode_line(line));
            }
            consumed = end + 1;
        }
        self.buffer.drain(..consumed);
        decoded
    }

    /// Bytes received after the last complete frame
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}
