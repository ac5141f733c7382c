//! The transport state model.
//!
//! All mutation happens through the methods on [`TransportState`] so the
//! `step`/`time` invariant is maintained in one place. The struct is `Copy`
//! and serializes directly as the `transport:state` payload.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Steps per beat (16th-note resolution).
pub const STEPS_PER_BEAT: f64 = 4.0;

/// Errors from transport control operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Tempo must be a finite value above zero.
    #[error("invalid tempo {0} (must be a finite BPM > 0)")]
    InvalidTempo(f64),
}

/// Shared playback transport state.
///
/// Invariant while playing: `step == floor(time * tempo / 60 * 4)`.
/// When stopped, `step` and `time` are frozen until [`TransportState::stop`]
/// resets both to zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    /// Whether the transport is advancing.
    pub playing: bool,
    /// Current step index (16th notes since transport start).
    pub step: u64,
    /// Tempo in beats per minute.
    pub tempo: f64,
    /// Transport time in seconds.
    pub time: f64,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            playing: false,
            step: 0,
            tempo: 120.0,
            time: 0.0,
        }
    }
}

impl TransportState {
    /// Create a new stopped transport at 120 BPM.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the transport by one tick interval.
    ///
    /// Does nothing when not playing. The step index is recomputed from
    /// absolute time rather than incremented, so a tempo change mid-flight
    /// re-derives the step grid instead of accumulating drift.
    pub fn tick(&mut self, interval: Duration) {
        if !self.playing {
            return;
        }
        self.time += interval.as_secs_f64();
        let steps_per_second = self.tempo / 60.0 * STEPS_PER_BEAT;
        self.step = (self.time * steps_per_second).floor() as u64;
    }

    /// Start the transport. Position is preserved (resume semantics).
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop the transport and rewind to zero.
    pub fn stop(&mut self) {
        self.playing = false;
        self.step = 0;
        self.time = 0.0;
    }

    /// Set the tempo in BPM.
    ///
    /// Rejects non-positive and non-finite values; `step` and `time` are
    /// untouched either way.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), TransportError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(TransportError::InvalidTempo(bpm));
        }
        self.tempo = bpm;
        Ok(())
    }
}
