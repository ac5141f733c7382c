//! Transport state model and thread-safe access.
//!
//! The [`TransportState`] struct is the single source of truth for playback
//! position. The [`TransportManager`] wraps it for shared access between the
//! clock task and the WebSocket dispatch path.

mod manager;
mod model;

pub use manager::TransportManager;
pub use model::{TransportError, TransportState, STEPS_PER_BEAT};
