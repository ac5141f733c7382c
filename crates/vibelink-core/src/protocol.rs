//! Wire protocol types.
//!
//! Messages are JSON objects with a `type` discriminator, exchanged as text
//! frames over a persistent WebSocket connection. The enums here mirror the
//! editor client's protocol package, so field names keep their camelCase
//! spelling on the wire.

use serde::{Deserialize, Serialize};

use crate::state::TransportState;

/// Messages sent from an editor client to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Start the transport.
    #[serde(rename = "transport:play")]
    Play,
    /// Stop the transport and rewind.
    #[serde(rename = "transport:stop")]
    Stop,
    /// Set the tempo in BPM.
    #[serde(rename = "transport:tempo")]
    Tempo { payload: f64 },
    /// Ask the assistant a question.
    #[serde(rename = "assistant:query")]
    Query {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<PromptContext>,
    },
}

/// Messages sent from the relay to every connected client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Transport snapshot, sent on every clock tick and once on connect.
    #[serde(rename = "transport:state")]
    TransportState { payload: TransportState },
    /// Incremental assistant output. One or more `done: false` frames are
    /// followed by exactly one terminal `done: true` frame with metadata.
    #[serde(rename = "assistant:response")]
    AssistantResponse {
        text: String,
        done: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<ResponseMetadata>,
    },
}

impl ServerMessage {
    /// A transport snapshot frame.
    pub fn transport_state(payload: TransportState) -> Self {
        Self::TransportState { payload }
    }

    /// An incremental (`done: false`) assistant frame.
    pub fn assistant_delta(text: impl Into<String>) -> Self {
        Self::AssistantResponse {
            text: text.into(),
            done: false,
            metadata: None,
        }
    }

    /// The terminal (`done: true`) assistant frame.
    pub fn assistant_done(metadata: ResponseMetadata) -> Self {
        Self::AssistantResponse {
            text: String::new(),
            done: true,
            metadata: Some(metadata),
        }
    }
}

/// Metadata attached to the terminal assistant frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub provider: String,
    pub model: String,
    pub usage: Usage,
}

/// Token usage reported by the chat backend.
///
/// All counters default to zero when the backend reports nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost_estimate: f64,
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
        self.total_tokens += rhs.total_tokens;
        self.cost_estimate += rhs.cost_estimate;
    }
}

/// Ephemeral editing context supplied with an assistant query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    /// Selected code in the editor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    /// The line under the cursor when there is no selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_line: Option<String>,
    /// 1-based line number for `selection`/`current_line`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Per-query model override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Live audio analysis from the editor, if available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_features: Option<AudioFeatures>,
}

/// Real-time audio features measured in the editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFeatures {
    #[serde(default)]
    pub is_playing: bool,
    /// Bass band level on a 0-255 scale.
    #[serde(default)]
    pub bass: f64,
    /// Qualitative brightness label computed upstream (dark/balanced/bright).
    #[serde(default)]
    pub brightness: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_round_trip() {
        let raw = r#"{"type":"transport:tempo","payload":128.5}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(msg, ClientMessage::Tempo { payload } if (payload - 128.5).abs() < 1e-9));
    }

    #[test]
    fn test_play_stop_have_no_payload() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"transport:play"}"#).unwrap(),
            ClientMessage::Play
        ));
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"transport:stop"}"#).unwrap(),
            ClientMessage::Stop
        ));
    }

    #[test]
    fn test_query_with_context() {
        let raw = r#"{"type":"assistant:query","text":"make a beat","context":{"currentLine":"s(\"bd\")","line":3}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::Query {
                text,
                model,
                context,
            } => {
                assert_eq!(text, "make a beat");
                assert!(model.is_none());
                let ctx = context.unwrap();
                assert_eq!(ctx.current_line.as_deref(), Some("s(\"bd\")"));
                assert_eq!(ctx.line, Some(3));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"plan:apply"}"#).is_err());
    }

    #[test]
    fn test_transport_state_frame_shape() {
        let frame = ServerMessage::transport_state(TransportState::default());
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""type":"transport:state""#));
        assert!(json.contains(r#""tempo":120.0"#));
    }

    #[test]
    fn test_delta_frame_skips_metadata() {
        let json = serde_json::to_string(&ServerMessage::assistant_delta("hi")).unwrap();
        assert!(!json.contains("metadata"));
        assert!(json.contains(r#""done":false"#));
    }

    #[test]
    fn test_done_frame_carries_camel_case_usage() {
        let frame = ServerMessage::assistant_done(ResponseMetadata {
            provider: "Google".into(),
            model: "gemini-3-flash-preview".into(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
                total_tokens: 30,
                cost_estimate: 0.0,
            },
        });
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""inputTokens":10"#));
        assert!(json.contains(r#""text":"""#));
        assert!(json.contains(r#""done":true"#));
    }

    #[test]
    fn test_usage_sums() {
        let mut total = Usage::default();
        total += Usage {
            input_tokens: 1,
            output_tokens: 2,
            total_tokens: 3,
            cost_estimate: 0.5,
        };
        total += Usage {
            input_tokens: 10,
            output_tokens: 20,
            total_tokens: 30,
            cost_estimate: 0.25,
        };
        assert_eq!(total.input_tokens, 11);
        assert_eq!(total.total_tokens, 33);
        assert!((total.cost_estimate - 0.75).abs() < 1e-9);
    }
}
