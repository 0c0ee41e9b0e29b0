pub mod artifact;
pub mod chart;
pub mod config;
pub mod consumer;
pub mod error;
pub mod frame;
pub mod markers;
pub mod producer;
pub mod reply;
pub mod state;
pub mod topic;

// Re-export main types for convenience
pub use artifact::ArtifactReport;
pub use chart::{ChartDescriptor, ChartKind, PieSlice};
pub use config::Config;
pub use consumer::{StreamConsumer, TurnOutcome};
pub use error::{Error, Result};
pub use frame::{decode_line, encode_frame, FrameDecoder, FRAME_TAG};
pub use markers::{ChunkUpdate, Directive, DirectiveKind, DirectiveMarker, MarkerParser, Resolution};
pub use producer::{FrameResult, ReplyStream, StreamOutcome, StreamProducer};
pub use state::{ChatMessage, ChatRequest, ChatRole, Conversation, SessionSummary};
pub use topic::Topic;
