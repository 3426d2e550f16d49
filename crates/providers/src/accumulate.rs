//! Deterministic stream accumulation.
//!
//! Folds a [`StreamEvent`] stream into the final `(Message, Usage)` pair,
//! invoking a caller-supplied callback for every text delta. The terminal
//! marker carries the fully-assembled message, so accumulation does not
//! depend on how the provider chunked the text.

use futures_util::StreamExt;

use la_domain::error::{Error, Result};
use la_domain::message::Message;
use la_domain::stream::{BoxStream, StreamEvent, Usage};

/// Drain a stream to completion.
///
/// Returns the terminal message and usage. Events after the terminal
/// marker are ignored. A stream that ends without a terminal marker is a
/// provider bug and yields an error.
pub async fn accumulate(
    mut stream: BoxStream<'static, Result<StreamEvent>>,
    mut on_delta: impl FnMut(&str),
) -> Result<(Message, Usage)> {
    let mut buffered = String::new();

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::TextDelta { text } => {
                on_delta(&text);
                buffered.push_str(&text);
            }
            StreamEvent::Done { message, usage } => {
                let final_text = message.extract_all_text();
                if !buffered.is_empty() && buffered != final_text {
                    tracing::warn!(
                        streamed = buffered.len(),
                        terminal = final_text.len(),
                        "streamed deltas disagree with terminal message; using terminal"
                    );
                }
                return Ok((message, usage));
            }
        }
    }

    Err(Error::Provider {
        provider: "stream".into(),
        message: "stream ended without terminal marker".into(),
    })
}
