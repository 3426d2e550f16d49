//! Scripted in-process provider for tests.
//!
//! Pops pre-programmed responses in order; a call past the end of the
//! script is an error, which keeps tests honest about how many model
//! calls a scenario makes.

use parking_lot::Mutex;

use la_domain::error::{Error, Result};
use la_domain::message::ContentBlock;
use la_domain::stream::Usage;

use crate::traits::{ChatRequest, ChatResponse, ModelProvider};

pub struct ScriptedProvider {
    script: Mutex<Vec<ChatResponse>>,
    /// Requests seen so far, for assertions on system text and tools.
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        let mut script = responses;
        script.reverse();
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Build a response of content blocks with the given usage.
    pub fn response(content: Vec<ContentBlock>, usage: Usage) -> ChatResponse {
        ChatResponse {
            content,
            usage,
            stop_reason: None,
        }
    }

    /// A plain-text terminal response.
    pub fn text_response(text: &str, usage: Usage) -> ChatResponse {
        Self::response(vec![ContentBlock::text(text)], usage)
    }

    /// A response carrying a single tool use.
    pub fn tool_use_response(
        id: &str,
        name: &str,
        input: serde_json::Value,
        usage: Usage,
    ) -> ChatResponse {
        Self::response(
            vec![ContentBlock::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            }],
            usage,
        )
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait::async_trait]
impl ModelProvider for ScriptedProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().push(req);
        self.script.lock().pop().ok_or_else(|| Error::Provider {
            provider: "scripted".into(),
            message: "script exhausted".into(),
        })
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pops_in_order_then_errors() {
        let provider = ScriptedProvider::new(vec![
            ScriptedProvider::text_response("one", Usage::default()),
            ScriptedProvider::text_response("two", Usage::default()),
        ]);

        let a = provider.chat(ChatRequest::default()).await.unwrap();
        assert_eq!(a.text(), "one");
        let b = provider.chat(ChatRequest::default()).await.unwrap();
        assert_eq!(b.text(), "two");
        assert!(provider.chat(ChatRequest::default()).await.is_err());
    }

    #[tokio::test]
    async fn default_chat_stream_yields_delta_then_done() {
        use futures_util::StreamExt;
        use la_domain::stream::StreamEvent;

        let provider = ScriptedProvider::new(vec![ScriptedProvider::text_response(
            "hello",
            Usage {
                input_tokens: 3,
                output_tokens: 1,
            },
        )]);
        let mut stream = provider.chat_stream(ChatRequest::default()).await.unwrap();

        match stream.next().await.unwrap().unwrap() {
            StreamEvent::TextDelta { text } => assert_eq!(text, "hello"),
            other => panic!("expected delta, got {other:?}"),
        }
        match stream.next().await.unwrap().unwrap() {
            StreamEvent::Done { message, usage } => {
                assert_eq!(message.extract_all_text(), "hello");
                assert_eq!(usage.input_tokens, 3);
            }
            other => panic!("expected done, got {other:?}"),
        }
    }
}
