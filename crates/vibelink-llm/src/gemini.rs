//! Google Generative Language API provider.
//!
//! Streams completions over the `streamGenerateContent?alt=sse` endpoint.
//! Each SSE `data:` line carries a JSON chunk with candidate text parts;
//! the final chunks carry `usageMetadata`.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;

use vibelink_core::protocol::{PromptContext, Usage};

use crate::{build_prompt, ChatMessage, ChatProvider, ChatResult, DeltaSender, LlmError, Role};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model when neither the provider nor the query specifies one.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Streaming chat provider backed by the Gemini API.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// Create a provider with the given API key and default model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn request_body(&self, messages: &[ChatMessage], context: Option<&PromptContext>) -> serde_json::Value {
        let parts = build_prompt(messages, context);

        let mut contents: Vec<serde_json::Value> = parts
            .history
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "model",
                    // Gemini has no system role in `contents`
                    Role::User | Role::System => "user",
                };
                json!({ "role": role, "parts": [{ "text": m.content }] })
            })
            .collect();
        contents.push(json!({
            "role": "user",
            "parts": [{ "text": parts.last_user_message }]
        }));

        json!({
            "systemInstruction": { "parts": [{ "text": parts.system_instruction }] },
            "contents": contents,
        })
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Google"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        deltas: DeltaSender,
        context: Option<&PromptContext>,
    ) -> Result<ChatResult, LlmError> {
        let model = context
            .and_then(|c| c.model.as_deref())
            .unwrap_or(&self.model);
        let url = format!("{API_BASE}/{model}:streamGenerateContent?alt=sse");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(messages, context))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut usage: Option<Usage> = None;
        let mut buffer = String::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // SSE events are newline-delimited; keep any partial line buffered
            while let Some(pos) = buffer.find('\n') {
                let line: String = buffer.drain(..=pos).collect();
                let line = line.trim();
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() || data == "[DONE]" {
                    continue;
                }
                match serde_json::from_str::<StreamChunk>(data) {
                    Ok(event) => {
                        let text = event.candidate_text();
                        if !text.is_empty() {
                            // Receiver gone: keep draining for usage metadata
                            let _ = deltas.send(text);
                        }
                        if let Some(meta) = event.usage_metadata {
                            usage = Some(meta.into());
                        }
                    }
                    Err(e) => {
                        log::debug!("[gemini] skipping undecodable stream chunk: {e}");
                    }
                }
            }
        }

        Ok(ChatResult { usage })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

impl StreamChunk {
    fn candidate_text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

impl From<UsageMetadata> for Usage {
    fn from(meta: UsageMetadata) -> Self {
        Usage {
            input_tokens: meta.prompt_token_count,
            output_tokens: meta.candidates_token_count,
            total_tokens: meta.total_token_count,
            cost_estimate: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_chunk_text_extraction() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"s(\"bd\")"}]}}]}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        assert_eq!(chunk.candidate_text(), "s(\"bd\")");
        assert!(chunk.usage_metadata.is_none());
    }

    #[test]
    fn test_usage_metadata_mapping() {
        let data = r#"{"candidates":[],"usageMetadata":{"promptTokenCount":7,"candidatesTokenCount":11,"totalTokenCount":18}}"#;
        let chunk: StreamChunk = serde_json::from_str(data).unwrap();
        let usage: Usage = chunk.usage_metadata.unwrap().into();
        assert_eq!(usage.input_tokens, 7);
        assert_eq!(usage.output_tokens, 11);
        assert_eq!(usage.total_tokens, 18);
    }

    #[test]
    fn test_empty_candidates_yield_empty_text() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"candidates":[{}]}"#).unwrap();
        assert!(chunk.candidate_text().is_empty());
    }

    #[test]
    fn test_request_body_maps_roles() {
        let provider = GeminiProvider::new("key", DEFAULT_MODEL);
        let messages = vec![
            ChatMessage::user("make a beat"),
            ChatMessage::assistant("```javascript\ns(\"bd\")\n```"),
            ChatMessage::user("faster"),
        ];
        let body = provider.request_body(&messages, None);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "faster");
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Strudel Assistant"));
    }
}
