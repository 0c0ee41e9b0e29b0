//! Client side of a reply stream: frame decoding plus directive parsing.

use tracing::{debug, warn};

use crate::frame::FrameDecoder;
use crate::markers::{ChunkUpdate, MarkerParser, Resolution};

/// Consumes one assistant reply. Chunks must be fed in arrival order.
#[derive(Debug, Default)]
pub struct StreamConsumer {
    decoder: FrameDecoder,
    parser: MarkerParser,
    frames: usize,
    malformed: usize,
}

/// Final state of a consumed reply
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Reply text as streamed, directives included
    pub text: String,
    pub display_text: String,
    pub resolved: Vec<Resolution>,
    pub frames: usize,
    pub malformed: usize,
    /// False when the stream stopped abruptly
    pub complete: bool,
}

impl StreamConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw transport bytes; returns one update per decoded frame.
    ///
    /// Malformed frames are logged and skipped.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ChunkUpdate> {
        let mut updates = Vec::new();
        for decoded in self.decoder.push(bytes) {
            match decoded {
                Ok(token) => {
                    self.frames += 1;
                    updates.push(self.parser.on_chunk(&token));
                }
                Err(e) => {
                    self.malformed += 1;
                    warn!(error = %e, "skipping frame");
                }
            }
        }
        updates
    }

    pub fn parser(&self) -> &MarkerParser {
        &self.parser
    }

    /// The transport closed normally. A trailing partial frame still marks
    /// the reply incomplete.
    pub fn finish(self) -> TurnOutcome {
        let complete = !self.decoder.has_pending();
        if !complete {
            debug!(pending = self.decoder.pending().len(), "stream ended inside a frame");
        }
        self.into_outcome(complete)
    }

    /// The transport failed mid-stream.
    pub fn abort(self) -> TurnOutcome {
        self.into_outcome(false)
    }

    fn into_outcome(self, complete: bool) -> TurnOutcome {
        let full = self.parser.full_text();
        let text = full.strip_suffix(' ').unwrap_or(full).to_string();
        TurnOutcome {
            text,
            display_text: self.parser.display_text(),
            resolved: self.parser.resolved().to_vec(),
            frames: self.frames,
            malformed: self.malformed,
            complete,
        }
    }
}
