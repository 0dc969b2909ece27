use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::layout::{LayoutStrategy, ResolvedPointers};
use crate::memory::ReadMemory;
use crate::status::{IdleTimer, PlaybackStatus};

/// An attached target instance. Dropping it releases the OS handle.
pub struct TargetProcess {
    pub pid: u32,
    pub version: String,
    pub executable: PathBuf,
    pub reader: Box<dyn ReadMemory>,
    pub layout: Box<dyn LayoutStrategy>,
    /// Resolved lazily; `None` until resolution first succeeds
    pub pointers: Option<ResolvedPointers>,
}

/// Last accepted observation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub song_id: Option<String>,
    pub position_seconds: f64,
    pub status: PlaybackStatus,
    pub last_status_change: Option<Instant>,
    /// Scheduled time of the last accepted sample
    pub last_sample_at: Option<Instant>,
}

impl PlaybackState {
    /// Forget the previous song so the first sample after attach is published.
    pub fn reset_for_attach(&mut self) {
        *self = Self::default();
    }

    /// Previous observation in the shape the classifier takes
    pub fn previous(&self) -> Option<(&str, f64)> {
        self.song_id
            .as_deref()
            .map(|song_id| (song_id, self.position_seconds))
    }

    /// Scheduled seconds since the last accepted sample, one interval if none
    pub fn elapsed_since_sample(&self, scheduled: Instant, interval: Duration) -> f64 {
        self.last_sample_at
            .map(|at| scheduled.saturating_duration_since(at))
            .unwrap_or(interval)
            .as_secs_f64()
    }

    pub fn record(&mut self, song_id: &str, position_seconds: f64, status: PlaybackStatus, at: Instant) {
        if self.status != status {
            self.last_status_change = Some(at);
        }
        if self.song_id.as_deref() != Some(song_id) {
            self.song_id = Some(song_id.to_string());
        }
        self.position_seconds = position_seconds;
        self.status = status;
        self.last_sample_at = Some(at);
    }
}

/// Everything the worker mutates from one cycle to the next
pub struct SynchronizerState {
    pub target: Option<TargetProcess>,
    pub playback: PlaybackState,
    pub idle: IdleTimer,
    /// Last failure message, to log repeats quietly
    pub last_failure: Option<String>,
}

impl SynchronizerState {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            target: None,
            playback: PlaybackState::default(),
            idle: IdleTimer::new(idle_timeout),
            last_failure: None,
        }
    }
}
