//! Offline mock chat provider.
//!
//! Used as the fallback when no API key is configured, and by the relay's
//! orchestration tests, where a scripted sequence of replies (or failures)
//! makes multi-round behavior deterministic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use vibelink_core::protocol::{PromptContext, Usage};

use crate::{ChatMessage, ChatProvider, ChatResult, DeltaSender, LlmError};

const DEFAULT_RESPONSE: &str = r#"Here is a Strudel snippet:
```javascript
samples('github:yaxu/clean-breaks')
s("amen/4").fit().chop(16).cut(1)
.sometimesBy(.5, ply("2"))
.sometimesBy(.25, mul(speed("-1")))
```
"#;

const CHUNK_CHARS: usize = 12;

/// One scripted turn of the mock provider.
#[derive(Debug, Clone)]
pub enum MockTurn {
    /// Stream this reply in small chunks.
    Reply(String),
    /// Fail the whole invocation with this message.
    Fail(String),
}

/// Scriptable offline chat provider.
///
/// With an empty script every call streams the canned Strudel snippet.
/// Scripted turns are consumed front to back; when the script runs out the
/// canned snippet is used again.
pub struct MockProvider {
    script: Mutex<VecDeque<MockTurn>>,
    calls: AtomicUsize,
    usage: Option<Usage>,
    chunk_delay: Duration,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// A mock that streams the canned snippet on every call.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            usage: None,
            chunk_delay: Duration::from_millis(10),
        }
    }

    /// A mock that plays back the given turns in order.
    pub fn with_script(turns: impl IntoIterator<Item = MockTurn>) -> Self {
        Self {
            script: Mutex::new(turns.into_iter().collect()),
            calls: AtomicUsize::new(0),
            usage: None,
            chunk_delay: Duration::ZERO,
        }
    }

    /// Report this usage on every successful call.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Number of chat invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_turn(&self) -> MockTurn {
        self.script
            .lock()
            .expect("mock script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| MockTurn::Reply(DEFAULT_RESPONSE.to_string()))
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    fn default_model(&self) -> &str {
        "mock-strudel-1"
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        deltas: DeltaSender,
        _context: Option<&PromptContext>,
    ) -> Result<ChatResult, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = match self.next_turn() {
            MockTurn::Reply(text) => text,
            MockTurn::Fail(message) => return Err(LlmError::Stream(message)),
        };

        // Simulate streaming in small chunks
        let chars: Vec<char> = reply.chars().collect();
        for chunk in chars.chunks(CHUNK_CHARS) {
            if !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
            let _ = deltas.send(chunk.iter().collect());
        }

        Ok(ChatResult { usage: self.usage })
    }
}
