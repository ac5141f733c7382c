//! Session registry: tracks connected clients and fans messages out.
//!
//! Frames are serialized once and distributed over a tokio broadcast
//! channel; each connection's send task owns a receiver. The member map
//! exists for lifecycle bookkeeping only - delivery never touches it, so a
//! slow client cannot stall a broadcast.

use std::collections::HashSet;
use std::sync::Mutex;

use tokio::sync::broadcast;
use uuid::Uuid;

use vibelink_core::protocol::ServerMessage;

/// Frames buffered per receiver before a slow client starts lagging.
const BROADCAST_CAPACITY: usize = 1024;

/// A registered client connection.
pub struct Registration {
    /// Opaque connection identity.
    pub id: Uuid,
    /// Receiver for serialized outbound frames.
    pub frames: broadcast::Receiver<String>,
}

/// Registry of live client connections with a broadcast primitive.
///
/// Constructed once at server start and injected wherever fan-out is
/// needed (clock task, assistant orchestrator, socket handlers).
pub struct SessionRegistry {
    frames: broadcast::Sender<String>,
    members: Mutex<HashSet<Uuid>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let (frames, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            frames,
            members: Mutex::new(HashSet::new()),
        }
    }

    /// Register a new client connection.
    ///
    /// The returned receiver only sees frames broadcast from this point on;
    /// there is no replay of historical messages. The caller is responsible
    /// for sending the transport snapshot as the first frame.
    pub fn register(&self) -> Registration {
        let id = Uuid::new_v4();
        self.members
            .lock()
            .expect("registry lock poisoned")
            .insert(id);
        let frames = self.frames.subscribe();
        log::info!("[registry] client {id} connected ({} total)", self.client_count());
        Registration { id, frames }
    }

    /// Remove a client. Idempotent; called on disconnect.
    pub fn unregister(&self, id: Uuid) {
        let removed = self
            .members
            .lock()
            .expect("registry lock poisoned")
            .remove(&id);
        if removed {
            log::info!("[registry] client {id} disconnected ({} total)", self.client_count());
        }
    }

    /// Serialize a message once and send it to every live receiver.
    ///
    /// Having no connected clients is not an error; the frame is dropped.
    pub fn broadcast(&self, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(frame) => {
                // Err means no receivers are subscribed right now
                let _ = self.frames.send(frame);
            }
            Err(e) => log::error!("[registry] failed to serialize frame: {e}"),
        }
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.members.lock().expect("registry lock poisoned").len()
    }
}
