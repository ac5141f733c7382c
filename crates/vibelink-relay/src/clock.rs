//! Transport clock task.
//!
//! Advances the shared transport state on a fixed interval and broadcasts a
//! snapshot on every tick - even while stopped, so idle clients still get a
//! heartbeat. Tick work is synchronous and never awaits the assistant path;
//! missed ticks are skipped rather than queued so latency cannot accumulate
//! into a burst of stale ticks.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use vibelink_core::protocol::ServerMessage;
use vibelink_core::TransportManager;

use crate::registry::SessionRegistry;

/// Fixed tick interval (20 Hz).
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Run the transport clock until the process exits.
pub async fn run_transport_clock(transport: TransportManager, registry: Arc<SessionRegistry>) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let snapshot = transport.with_state_write(|s| {
            s.tick(TICK_INTERVAL);
            *s
        });
        registry.broadcast(&ServerMessage::transport_state(snapshot));
    }
}
