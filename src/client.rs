use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use marvin_core::{ArtifactReport, ChatMessage, ChunkUpdate, MarkerParser, StreamConsumer, TurnOutcome};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Serialize)]
struct ChatBody<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send the conversation and consume the streamed reply.
    ///
    /// `on_update` runs once per decoded frame, in order. A transport failure
    /// after the reply started yields an incomplete outcome rather than an error.
    pub async fn stream_reply<F>(&self, messages: &[ChatMessage], mut on_update: F) -> Result<TurnOutcome>
    where
        F: FnMut(&ChunkUpdate, &MarkerParser),
    {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatBody { messages })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(anyhow!(
                "Chat request failed with status {}: {}. Make sure the server is running with: marvin serve",
                status,
                message
            ));
        }

        let mut consumer = StreamConsumer::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for update in consumer.feed(&bytes) {
                        on_update(&update, consumer.parser());
                    }
                }
                Err(e) => {
                    warn!(error = %e, "reply stream interrupted");
                    return Ok(consumer.abort());
                }
            }
        }

        Ok(consumer.finish())
    }

    pub async fn artifact(&self, id: &str) -> Result<ArtifactReport> {
        // Artifact ids are opaque, so they go in as an escaped path segment
        let mut url = reqwest::Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Invalid server URL: {}", self.base_url))?
            .pop_if_empty()
            .extend(["api", "artifacts", id]);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to load artifact {}: {}", id, response.status()));
        }

        Ok(response.json().await?)
    }
}
