//! Thread-safe manager for the transport state.
//!
//! The [`TransportManager`] wraps the [`TransportState`] in an Arc<RwLock>
//! so the clock task (writer) and WebSocket handlers (writers for control
//! messages, readers for snapshots) can share it safely.

use std::sync::{Arc, RwLock};

use super::model::{TransportError, TransportState};

/// Thread-safe handle to the single transport state instance.
///
/// Cloning the manager clones the handle, not the state.
#[derive(Clone, Default)]
pub struct TransportManager {
    state: Arc<RwLock<TransportState>>,
}

impl TransportManager {
    /// Create a manager with default (stopped, 120 BPM) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the state with a closure.
    pub fn with_state_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&TransportState) -> R,
    {
        let state = self.state.read().expect("transport lock poisoned");
        f(&state)
    }

    /// Write to the state with a closure, holding the exclusive lock for its
    /// duration.
    pub fn with_state_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut TransportState) -> R,
    {
        let mut state = self.state.write().expect("transport lock poisoned");
        f(&mut state)
    }

    /// Take a copy of the current state.
    pub fn snapshot(&self) -> TransportState {
        self.with_state_read(|s| *s)
    }

    /// Start the transport.
    pub fn play(&self) {
        self.with_state_write(|s| s.play());
        log::info!("[transport] playing");
    }

    /// Stop the transport and rewind.
    pub fn stop(&self) {
        self.with_state_write(|s| s.stop());
        log::info!("[transport] stopped");
    }

    /// Set the tempo, rejecting invalid values.
    pub fn set_tempo(&self, bpm: f64) -> Result<(), TransportError> {
        self.with_state_write(|s| s.set_tempo(bpm))?;
        log::info!("[transport] tempo: {bpm}");
        Ok(())
    }

    /// Get the current tempo.
    pub fn tempo(&self) -> f64 {
        self.with_state_read(|s| s.tempo)
    }

    /// Check whether the transport is playing.
    pub fn is_playing(&self) -> bool {
        self.with_state_read(|s| s.playing)
    }
}

impl std::fmt::Debug for TransportManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportManager")
            .field("state", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_defaults() {
        let manager = TransportManager::new();
        assert!(!manager.is_playing());
        assert!((manager.tempo() - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_manager_clone_shares_state() {
        let a = TransportManager::new();
        let b = a.clone();
        a.set_tempo(150.0).unwrap();
        assert!((b.tempo() - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejected_tempo_leaves_state_alone() {
        let manager = TransportManager::new();
        assert!(manager.set_tempo(-1.0).is_err());
        assert!((manager.tempo() - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let manager = TransportManager::new();
        let snap = manager.snapshot();
        manager.play();
        assert!(!snap.playing);
        assert!(manager.is_playing());
    }
}
