//! Paced reply streaming
//!
//! The producer turns a conversation into a sequence of wire frames and feeds
//! them into a bounded channel, sleeping between frames to model token
//! generation latency. The sleep is an async suspension point, and it races
//! against the channel closing so a departed client stops the stream within
//! one pacing interval.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::encode_frame;
use crate::reply::{select_reply, tokenize};
use crate::state::ChatMessage;
use crate::topic::Topic;

/// Default delay between two frames
pub const DEFAULT_PACING: Duration = Duration::from_millis(50);

/// Frames buffered between the producer task and the transport
const CHANNEL_CAPACITY: usize = 16;

/// Item type carried by a reply stream
pub type FrameResult = Result<String>;

type Encoder = fn(&str) -> Result<String>;

#[derive(Debug, Clone, Copy)]
pub struct StreamProducer {
    pacing: Duration,
}

impl Default for StreamProducer {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

impl StreamProducer {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Choose the reply for a conversation without emitting anything yet.
    ///
    /// Fails before the first byte, so callers can still report a proper error.
    pub fn prepare(&self, conversation: &[ChatMessage]) -> Result<ReplyStream> {
        let last = conversation.last().ok_or_else(|| {
            Error::InvalidInput("conversation must contain at least one message".to_string())
        })?;

        let (topic, reply) = select_reply(&last.content);
        debug!(topic = topic.as_str(), "selected canned reply");

        Ok(ReplyStream {
            topic,
            reply,
            pacing: self.pacing,
            encode: encode_frame,
        })
    }

    /// Validate, then spawn the paced emission and hand back its receiving end.
    pub fn produce(&self, conversation: &[ChatMessage]) -> Result<mpsc::Receiver<FrameResult>> {
        Ok(self.prepare(conversation)?.spawn())
    }
}

/// How a reply stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { frames: usize },
    Cancelled { frames_sent: usize },
    Failed { frames_sent: usize },
}

/// A selected reply, ready to be emitted
#[derive(Debug, Clone)]
pub struct ReplyStream {
    topic: Topic,
    reply: &'static str,
    pacing: Duration,
    encode: Encoder,
}

impl ReplyStream {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn reply(&self) -> &'static str {
        self.reply
    }

    #[cfg(test)]
    fn with_encoder(mut self, encode: Encoder) -> Self {
        self.encode = encode;
        self
    }

    /// Run the emission on the tokio runtime.
    pub fn spawn(self) -> mpsc::Receiver<FrameResult> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            self.pump(tx).await;
        });
        rx
    }

    /// Emit every frame into `tx`, pacing between frames.
    pub async fn pump(self, tx: mpsc::Sender<FrameResult>) -> StreamOutcome {
        let total = tokenize(self.reply).count();
        let mut sent = 0;

        for (i, token) in tokenize(self.reply).enumerate() {
            let frame = match (self.encode)(token) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, frames_sent = sent, "aborting reply stream");
                    let _ = tx.send(Err(e)).await;
                    return StreamOutcome::Failed { frames_sent: sent };
                }
            };

            if tx.send(Ok(frame)).await.is_err() {
                return self.cancelled(sent);
            }
            sent += 1;
            debug!(frame = sent, of = total, "sent frame");

            if i + 1 < total {
                tokio::select! {
                    _ = tx.closed() => return self.cancelled(sent),
                    _ = tokio::time::sleep(self.pacing) => {}
                }
            }
        }

        info!(topic = self.topic.as_str(), frames = sent, "reply stream completed");
        StreamOutcome::Completed { frames: sent }
    }

    fn cancelled(&self, frames_sent: usize) -> StreamOutcome {
        let closed = Error::TransportClosed { frames_sent };
        info!(topic = self.topic.as_str(), "{closed}, stopping");
        StreamOutcome::Cancelled { frames_sent }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameDecoder;

    fn conversation(text: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(text)]
    }

    async fn collect(mut rx: mpsc::Receiver<FrameResult>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame.unwrap());
        }
        frames
    }

    #[test]
    fn test_empty_conversation_is_rejected() {
        let producer = StreamProducer::default();
        assert!(matches!(producer.prepare(&[]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_only_last_message_selects() {
        let producer = StreamProducer::default();
        let history = vec![
            ChatMessage::user("Why did revenue fall?"),
            ChatMessage::assistant("..."),
            ChatMessage::user("and the marketing campaign?"),
        ];
        assert_eq!(producer.prepare(&history).unwrap().topic(), Topic::Campaign);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_reproduce_reply() {
        let producer = StreamProducer::default();
        let stream = producer.prepare(&conversation("Why did revenue fall?")).unwrap();
        let reply = stream.reply();

        let frames = collect(stream.spawn()).await;
        assert_eq!(frames.len(), reply.split(' ').count());

        let mut decoder = FrameDecoder::new();
        let text: String = frames
            .iter()
            .flat_map(|f| decoder.push(f.as_bytes()))
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(text.strip_suffix(' ').unwrap(), reply);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_frames() {
        let producer = StreamProducer::new(Duration::from_millis(50));
        let stream = producer.prepare(&conversation("hello")).unwrap();
        let tokens = stream.reply().split(' ').count() as u32;

        let start = tokio::time::Instant::now();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (outcome, frames) = tokio::join!(stream.pump(tx), collect(rx));

        assert_eq!(outcome, StreamOutcome::Completed { frames: frames.len() });
        let expected = Duration::from_millis(50) * (tokens - 1);
        assert!(start.elapsed() >= expected);
        assert!(start.elapsed() < expected + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_receiver_drops() {
        let producer = StreamProducer::new(Duration::from_millis(50));
        let stream = producer.prepare(&conversation("hello")).unwrap();
        let (tx, mut rx) = mpsc::channel(1);

        let pump = tokio::spawn(stream.pump(tx));
        rx.recv().await.unwrap().unwrap();
        rx.recv().await.unwrap().unwrap();
        let dropped_at = tokio::time::Instant::now();
        drop(rx);

        let outcome = pump.await.unwrap();
        assert!(matches!(outcome, StreamOutcome::Cancelled { frames_sent } if frames_sent <= 3));
        assert!(dropped_at.elapsed() <= Duration::from_millis(50));
    }

    fn refuse_second_token(token: &str) -> Result<String> {
        if token == "Marvin," {
            return Err(Error::Encode(serde_json::from_str::<String>("nope").unwrap_err()));
        }
        encode_frame(token)
    }

    #[tokio::test(start_paused = true)]
    async fn test_encode_failure_ends_stream_with_error() {
        let stream = StreamProducer::default()
            .prepare(&conversation("hello"))
            .unwrap()
            .with_encoder(refuse_second_token);
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

        let outcome = stream.pump(tx).await;
        assert_eq!(outcome, StreamOutcome::Failed { frames_sent: 1 });

        assert_eq!(rx.recv().await.unwrap().unwrap(), "0:\"I'm \"\n");
        assert!(matches!(rx.recv().await, Some(Err(Error::Encode(_)))));
        assert!(rx.recv().await.is_none());
    }
}
