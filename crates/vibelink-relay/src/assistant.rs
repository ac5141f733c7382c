//! Assistant query orchestrator.
//!
//! Each query runs through an explicit phase machine:
//!
//! ```text
//! Received -> StreamingFirst -> Validating -> Finalized
//!                                   \-> Correcting -> StreamingCorrection -> Finalized
//! ```
//!
//! The correction phase is reachable only from `Validating`, which runs
//! exactly once, so the one-retry rule is structural rather than a counter
//! convention. Provider failures are converted into a visible error delta;
//! the machine always reaches `Finalized` and emits exactly one terminal
//! frame.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::mpsc;

use vibelink_core::protocol::{PromptContext, ResponseMetadata, ServerMessage, Usage};
use vibelink_core::validation::validate_pattern;
use vibelink_llm::{ChatMessage, ChatProvider, ChatResult};

use crate::registry::SessionRegistry;

/// Status delta broadcast before the correction round.
const REFINING_NOTICE: &str = "\n\n---\n*Detected issues, refining...*\n\n";

// Fenced ```javascript / ```js / bare ``` blocks in the streamed response.
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:javascript|js)?\s*\n(.*?)```").expect("valid regex"));

/// Phases of one assistant query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueryPhase {
    Received,
    StreamingFirst,
    Validating,
    Correcting,
    StreamingCorrection,
    Finalized,
}

/// Run a single assistant query to its terminal frame.
///
/// Deltas and the terminal frame go to every connected client; the query
/// keeps running even if the requester disconnects mid-stream. This function
/// never returns an error - every failure path ends in a broadcast.
pub async fn run_query(
    provider: Arc<dyn ChatProvider>,
    registry: Arc<SessionRegistry>,
    text: String,
    model: Option<String>,
    context: Option<PromptContext>,
) {
    // Fold the top-level model override into the context the providers see
    let mut context = context.unwrap_or_default();
    if model.is_some() {
        context.model = model;
    }

    log::info!("[assistant] query: {text:?}");

    let mut phase = QueryPhase::Received;
    let mut first_response = String::new();
    let mut errors: Vec<String> = Vec::new();
    let mut usage_total = Usage::default();

    loop {
        phase = match phase {
            QueryPhase::Received => QueryPhase::StreamingFirst,

            QueryPhase::StreamingFirst => {
                let messages = vec![ChatMessage::user(text.clone())];
                let (full, result) =
                    stream_round(provider.as_ref(), &registry, &messages, &context).await;
                first_response = full;
                if let Some(usage) = result.usage {
                    usage_total += usage;
                }
                QueryPhase::Validating
            }

            QueryPhase::Validating => {
                errors = collect_code_errors(&first_response);
                if errors.is_empty() {
                    QueryPhase::Finalized
                } else {
                    log::info!("[assistant] self-correction triggered: {errors:?}");
                    QueryPhase::Correcting
                }
            }

            QueryPhase::Correcting => {
                registry.broadcast(&ServerMessage::assistant_delta(REFINING_NOTICE));
                QueryPhase::StreamingCorrection
            }

            QueryPhase::StreamingCorrection => {
                let messages = vec![
                    ChatMessage::user(text.clone()),
                    ChatMessage::assistant(first_response.clone()),
                    ChatMessage::user(correction_prompt(&errors)),
                ];
                // Single retry: the correction's output is not re-validated
                let (_, result) =
                    stream_round(provider.as_ref(), &registry, &messages, &context).await;
                if let Some(usage) = result.usage {
                    usage_total += usage;
                }
                QueryPhase::Finalized
            }

            QueryPhase::Finalized => break,
        };
        log::debug!("[assistant] phase -> {phase:?}");
    }

    let model = context
        .model
        .unwrap_or_else(|| provider.default_model().to_string());
    registry.broadcast(&ServerMessage::assistant_done(ResponseMetadata {
        provider: provider.name().to_string(),
        model,
        usage: usage_total,
    }));
}

/// One streaming chat round: broadcast every delta as it arrives and return
/// the accumulated response plus the chat result.
///
/// The forwarder task is drained before anything else is broadcast, so all
/// of this round's deltas precede whatever frame the caller emits next.
async fn stream_round(
    provider: &dyn ChatProvider,
    registry: &Arc<SessionRegistry>,
    messages: &[ChatMessage],
    context: &PromptContext,
) -> (String, ChatResult) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let forward_registry = registry.clone();
    let forward = tokio::spawn(async move {
        let mut full = String::new();
        while let Some(delta) = rx.recv().await {
            full.push_str(&delta);
            forward_registry.broadcast(&ServerMessage::assistant_delta(delta));
        }
        full
    });

    let outcome = provider.chat(messages, tx, Some(context)).await;
    // The provider dropped its sender; the forwarder finishes once drained
    let full = forward.await.unwrap_or_default();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            log::error!("[assistant] chat failed: {e}");
            registry.broadcast(&ServerMessage::assistant_delta(format!("\n\n*Error: {e}*")));
            ChatResult::default()
        }
    };

    (full, result)
}

/// Extract fenced code blocks and merge validation errors across them.
fn collect_code_errors(response: &str) -> Vec<String> {
    let mut errors = Vec::new();
    for caps in CODE_FENCE.captures_iter(response) {
        let result = validate_pattern(&caps[1]);
        for error in result.errors {
            if !errors.contains(&error) {
                errors.push(error);
            }
        }
    }
    errors
}

fn correction_prompt(errors: &[String]) -> String {
    format!(
        "The code you provided has the following issues:\n{}\n\nPlease provide a corrected version using only valid Strudel JavaScript syntax.",
        errors.join("\n")
    )
}
