//! Vibelink Relay - WebSocket relay between a live-coding editor, the shared
//! transport clock, and a streaming code-generation assistant.
//!
//! # Features
//!
//! - Deterministic 20 Hz transport clock with per-tick state broadcast
//! - Session registry with serialize-once fan-out to all connected clients
//! - Assistant query orchestration: streaming first answer, static
//!   validation of generated code blocks, single self-correction round
//! - Health check and a minimal player page
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use vibelink_llm::MockProvider;
//! use vibelink_relay::start_server;
//!
//! let addr = "127.0.0.1:8787".parse().unwrap();
//! start_server(addr, Arc::new(MockProvider::new())).await?;
//! ```

pub mod assistant;
pub mod clock;
pub mod registry;
pub mod routes;
pub mod socket;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use vibelink_core::TransportManager;
use vibelink_llm::ChatProvider;

pub use clock::TICK_INTERVAL;
pub use registry::{Registration, SessionRegistry};

/// Shared application state for HTTP and WebSocket handlers.
pub struct AppState {
    /// The single transport state instance.
    pub transport: TransportManager,
    /// Client registry and broadcast primitive.
    pub registry: Arc<SessionRegistry>,
    /// Chat backend used by the assistant orchestrator.
    pub provider: Arc<dyn ChatProvider>,
}

/// Build the router over an explicit state (used by tests and `start_server`).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/", get(routes::player_page))
        .route("/player", get(routes::player_page))
        .route("/ws", get(socket::ws_handler))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Start the relay on the given address and serve until the process exits.
///
/// Spawns the transport clock in the background; binding errors are
/// returned so the caller can report them instead of panicking.
pub async fn start_server(
    addr: SocketAddr,
    provider: Arc<dyn ChatProvider>,
) -> std::io::Result<()> {
    let transport = TransportManager::new();
    let registry = Arc::new(SessionRegistry::new());

    let state = Arc::new(AppState {
        transport: transport.clone(),
        registry: registry.clone(),
        provider,
    });

    tokio::spawn(clock::run_transport_clock(transport, registry));

    let app = build_router(state);

    log::info!("[relay] listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
