/// Notifications sent from the worker to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Attached {
        pid: u32,
        version: String,
        layout: String,
    },
    Detached {
        pid: u32,
    },
    NowPlaying {
        song_id: String,
        title: String,
        artist: String,
        position_seconds: f64,
    },
    Paused {
        song_id: String,
        title: String,
    },
    /// The idle timeout removed the shown activity
    Cleared,
    /// Needs the user's attention; synchronization continues
    Warning(String),
    /// Synchronization stopped and will not resume on its own
    Fatal(String),
    /// The worker thread has exited
    Stopped,
}
