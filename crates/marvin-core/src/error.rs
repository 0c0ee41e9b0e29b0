//! Error types shared by the producer, the frame codec and the consumer.

use std::path::PathBuf;

/// Result alias used across the core library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The conversation handed to the producer cannot be answered
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A wire frame could not be decoded; the consumer skips it
    #[error("malformed frame: {reason}")]
    MalformedFrame {
        reason: String,
        /// Raw line as received, without the trailing newline
        line: String,
    },

    /// The receiving side went away while a reply was still streaming
    #[error("transport closed after {frames_sent} frames")]
    TransportClosed { frames_sent: usize },

    /// A token could not be encoded into a frame
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid JSON: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine config directory")]
    NoConfigDir,
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>, line: &[u8]) -> Self {
        Error::MalformedFrame {
            reason: reason.into(),
            line: String::from_utf8_lossy(line).into_owned(),
        }
    }
}
