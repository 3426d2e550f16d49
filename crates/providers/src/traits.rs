use serde::{Deserialize, Serialize};
use serde_json::Value;

use la_domain::error::Result;
use la_domain::message::{ContentBlock, Message};
use la_domain::stream::{BoxStream, StreamEvent, Usage};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The provider-facing projection of a tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Model identifier (e.g. `"claude-sonnet-4-5"`).
    pub model: String,
    /// Maximum tokens for this model call.
    pub max_tokens: u32,
    /// System text, sent out-of-band from the message log.
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<WireTool>,
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Ordered content blocks: text fragments and tool-use blocks with
    /// provider-assigned ids.
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
    pub stop_reason: Option<String>,
}

impl ChatResponse {
    /// The concatenated text content of the response.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every LLM adapter must implement.
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send a chat completion request and wait for the full response.
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse>;

    /// Send a chat completion request and return a stream of events.
    ///
    /// The default implementation degrades to a buffered call: one text
    /// delta for the whole response, then the terminal marker.
    async fn chat_stream(
        &self,
        req: ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let response = self.chat(req).await?;
        let text = response.text();
        let message = Message::assistant_blocks(response.content.clone());
        let usage = response.usage;
        let stream = async_stream::stream! {
            if !text.is_empty() {
                yield Ok(StreamEvent::TextDelta { text });
            }
            yield Ok(StreamEvent::Done { message, usage });
        };
        Ok(Box::pin(stream))
    }

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;
}
