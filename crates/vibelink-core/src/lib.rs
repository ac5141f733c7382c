//! Vibelink Core - Transport state and core types for the Vibelink relay.
//!
//! This crate provides the platform-independent building blocks shared by the
//! relay server and the CLI:
//!
//! - **State** - The transport state model and its thread-safe manager
//! - **Protocol** - Wire message types exchanged with editor clients
//! - **Validation** - Heuristic structural checks for generated Strudel code
//!
//! # Architecture
//!
//! The transport state is a single process-wide value owned by the
//! [`TransportManager`]. The clock task and inbound transport-control
//! messages are the only writers; everyone else takes read snapshots.
//! All wire traffic is expressed as [`ClientMessage`] / [`ServerMessage`]
//! values so that serialization lives in exactly one place.

pub mod protocol;
pub mod state;
pub mod validation;

// Re-export main types for convenience
pub use protocol::{
    AudioFeatures, ClientMessage, PromptContext, ResponseMetadata, ServerMessage, Usage,
};
pub use state::{TransportError, TransportManager, TransportState};
pub use validation::{validate_pattern, validate_pattern_with_denylist, ValidationResult};
