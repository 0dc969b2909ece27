//! Playback status classification and the per-transition effect plan.

use std::time::{Duration, Instant};

use strum::{Display, IntoStaticStr};

use crate::sampler::Sample;

/// Default tolerance between the expected and observed position advance
pub const DEFAULT_TOLERANCE_SECS: f64 = 0.2;
/// Default time a paused player keeps its presence before it is cleared
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Changed,
}

/// Compares consecutive samples.
#[derive(Debug, Clone, Copy)]
pub struct StatusClassifier {
    tolerance: f64,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_SECS)
    }
}

impl StatusClassifier {
    pub fn new(tolerance_secs: f64) -> Self {
        Self {
            tolerance: tolerance_secs.abs(),
        }
    }

    /// Classify `sample` against the previous accepted observation
    /// (`song_id`, `position_seconds`). `elapsed_secs` is the scheduled time
    /// between the two samples.
    ///
    /// A different song is always `Changed`. Within the same song the position
    /// either advanced by roughly `elapsed_secs` (`Playing`), stayed exactly
    /// put (`Paused`), or jumped (`Changed`, i.e. a seek).
    pub fn classify(
        &self,
        previous: Option<(&str, f64)>,
        sample: &Sample,
        elapsed_secs: f64,
    ) -> PlaybackStatus {
        let Some((last_song, last_position)) = previous else {
            return PlaybackStatus::Changed;
        };
        if sample.song_id != last_song {
            return PlaybackStatus::Changed;
        }

        let advance = sample.position_seconds - last_position;
        if (advance - elapsed_secs).abs() < self.tolerance {
            PlaybackStatus::Playing
        } else if sample.position_seconds == last_position {
            PlaybackStatus::Paused
        } else {
            PlaybackStatus::Changed
        }
    }
}

/// What a status transition asks the synchronizer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Effect {
    /// Still playing; only the tracked position moves
    Advance,
    /// Playback continued after a pause; reconnect if needed and publish once
    Resume,
    /// Playback just paused; start the idle timer and publish once
    Pause,
    /// Still paused; publish nothing, poll the idle timer
    HoldPaused,
    /// New song or seek; publish and reset the idle timer
    Change,
}

pub fn plan(previous: PlaybackStatus, current: PlaybackStatus) -> Effect {
    match (previous, current) {
        (PlaybackStatus::Paused, PlaybackStatus::Playing) => Effect::Resume,
        (_, PlaybackStatus::Playing) => Effect::Advance,
        (PlaybackStatus::Paused, PlaybackStatus::Paused) => Effect::HoldPaused,
        (_, PlaybackStatus::Paused) => Effect::Pause,
        (_, PlaybackStatus::Changed) => Effect::Change,
    }
}

/// Fires once when a pause has lasted longer than the timeout.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    timeout: Duration,
    paused_since: Option<Instant>,
    fired: bool,
}

impl IdleTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            paused_since: None,
            fired: false,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.paused_since = Some(now);
        self.fired = false;
    }

    pub fn reset(&mut self) {
        self.paused_since = None;
        self.fired = false;
    }

    pub fn is_running(&self) -> bool {
        self.paused_since.is_some()
    }

    /// Returns `true` exactly once per pause, on the first poll past the timeout.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(since) = self.paused_since else {
            return false;
        };
        if self.fired || now.saturating_duration_since(since) < self.timeout {
            return false;
        }
        self.fired = true;
        true
    }
}
