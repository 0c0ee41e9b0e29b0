//! UI-agnostic conversation state
//!
//! Chat history lives in an explicit [`Conversation`] owned by whichever
//! front end drives the session; nothing here is process-global.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SUMMARY_CHARS: usize = 30;

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A message as it arrives over the wire, before its content is known to be text
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Request body of the chat endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<IncomingMessage>,
}

impl ChatRequest {
    /// Convert into a conversation the producer can answer.
    ///
    /// Only the final message must carry text content; earlier messages with
    /// structured content are kept as their JSON rendering.
    pub fn into_conversation(self) -> Result<Vec<ChatMessage>> {
        let last = self.messages.len().checked_sub(1).ok_or_else(|| {
            Error::InvalidInput("conversation must contain at least one message".to_string())
        })?;

        self.messages
            .into_iter()
            .enumerate()
            .map(|(i, msg)| {
                let content = match msg.content {
                    serde_json::Value::String(text) => text,
                    _ if i == last => {
                        return Err(Error::InvalidInput(
                            "last message content must be text".to_string(),
                        ))
                    }
                    other => other.to_string(),
                };
                Ok(ChatMessage {
                    role: msg.role,
                    content,
                })
            })
            .collect()
    }
}

/// Short description of a session for a history sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub title: String,
    pub last_message: String,
}

/// One chat session: the ordered, append-only message history
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Summary built from the first user message and the latest assistant reply.
    ///
    /// `None` until the assistant has answered at least once.
    pub fn summary(&self) -> Option<SessionSummary> {
        let first_user = self.messages.iter().find(|m| m.role == ChatRole::User)?;
        let last_reply = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Assistant)?;

        Some(SessionSummary {
            title: abbreviate(&first_user.content),
            last_message: abbreviate(&last_reply.content),
        })
    }
}

fn abbreviate(text: &str) -> String {
    let head: String = text.chars().take(SUMMARY_CHARS).collect();
    format!("{head}...")
}
