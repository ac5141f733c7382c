//! WebSocket connection handling and inbound message dispatch.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use vibelink_core::protocol::{ClientMessage, ServerMessage};

use crate::{assistant, AppState};

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection for its lifetime.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let registration = state.registry.register();
    let client_id = registration.id;
    let mut frames = registration.frames;

    // Catch-up: the new client (and only it) gets the current snapshot
    let snapshot = ServerMessage::transport_state(state.transport.snapshot());
    if let Ok(text) = serde_json::to_string(&snapshot) {
        if sender.send(Message::Text(text.into())).await.is_err() {
            state.registry.unregister(client_id);
            return;
        }
    }

    // Forward broadcast frames to this client until it goes away
    let send_task = tokio::spawn(async move {
        loop {
            match frames.recv().await {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Transient backpressure degrades silently
                    log::warn!("[ws] client {client_id} lagging, skipped {skipped} frames");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Inbound loop
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => dispatch(&state, &text),
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    state.registry.unregister(client_id);
    send_task.abort();
}

/// Parse and act on one inbound payload.
///
/// Malformed payloads are logged and dropped; the connection stays open.
/// Assistant queries are spawned so the inbound loop keeps draining while a
/// query streams - concurrent queries interleave on the broadcast channel.
pub fn dispatch(state: &Arc<AppState>, raw: &str) {
    match serde_json::from_str::<ClientMessage>(raw) {
        Ok(ClientMessage::Play) => state.transport.play(),
        Ok(ClientMessage::Stop) => state.transport.stop(),
        Ok(ClientMessage::Tempo { payload }) => {
            if let Err(e) = state.transport.set_tempo(payload) {
                log::warn!("[transport] rejected tempo update: {e}");
            }
        }
        Ok(ClientMessage::Query {
            text,
            model,
            context,
        }) => {
            tokio::spawn(assistant::run_query(
                state.provider.clone(),
                state.registry.clone(),
                text,
                model,
                context,
            ));
        }
        Err(e) => {
            log::warn!("[ws] dropping malformed message: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibelink_llm::MockProvider;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            transport: vibelink_core::TransportManager::new(),
            registry: Arc::new(crate::registry::SessionRegistry::new()),
            provider: Arc::new(MockProvider::new()),
        })
    }

    #[tokio::test]
    async fn test_dispatch_transport_controls() {
        let state = test_state();
        dispatch(&state, r#"{"type":"transport:play"}"#);
        assert!(state.transport.is_playing());

        dispatch(&state, r#"{"type":"transport:tempo","payload":140}"#);
        assert!((state.transport.tempo() - 140.0).abs() < f64::EPSILON);

        dispatch(&state, r#"{"type":"transport:stop"}"#);
        assert!(!state.transport.is_playing());
        assert_eq!(state.transport.snapshot().step, 0);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_bad_tempo_keeps_prior() {
        let state = test_state();
        dispatch(&state, r#"{"type":"transport:tempo","payload":-3}"#);
        assert!((state.transport.tempo() - 120.0).abs() < f64::EPSILON);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_new_client_first_frame_is_current_snapshot() {
        let state = test_state();
        // Advance the transport before anyone connects
        state.transport.play();
        state.transport.set_tempo(135.0).unwrap();
        state
            .transport
            .with_state_write(|s| s.tick(std::time::Duration::from_millis(500)));

        let router = crate::build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap();
        let msg = ws.next().await.unwrap().unwrap();
        let frame: ServerMessage = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        match frame {
            ServerMessage::TransportState { payload } => {
                assert!(payload.playing);
                assert!((payload.tempo - 135.0).abs() < f64::EPSILON);
                // 0.5s at 135 BPM (9 steps/s) lands on step 4
                assert_eq!(payload.step, 4);
            }
            other => panic!("expected a transport snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_survives_malformed_payloads() {
        let state = test_state();
        dispatch(&state, "not json at all");
        dispatch(&state, r#"{"type":"transport:warp"}"#);
        dispatch(&state, r#"{"type":"transport:tempo"}"#);
        // State untouched, no panic
        assert!(!state.transport.is_playing());
    }
}
