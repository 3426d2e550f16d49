use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::message::Message;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events emitted during LLM streaming.
///
/// The contract is deliberately small: every event is either a text delta
/// or the terminal marker carrying the fully-assembled message. Folding
/// the deltas must reproduce the text blocks of the final message, so
/// accumulation is deterministic regardless of chunking.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    TextDelta { text: String },
    Done { message: Message, usage: Usage },
}

/// Token usage for a model call; accumulates across turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn add(&mut self, other: Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_accumulates() {
        let mut total = Usage::default();
        total.add(Usage {
            input_tokens: 100,
            output_tokens: 20,
        });
        total.add(Usage {
            input_tokens: 250,
            output_tokens: 41,
        });
        assert_eq!(total.input_tokens, 350);
        assert_eq!(total.output_tokens, 61);
    }

    #[test]
    fn usage_saturates_instead_of_overflowing() {
        let mut total = Usage {
            input_tokens: u32::MAX - 1,
            output_tokens: 0,
        };
        total.add(Usage {
            input_tokens: 10,
            output_tokens: 0,
        });
        assert_eq!(total.input_tokens, u32::MAX);
    }
}
