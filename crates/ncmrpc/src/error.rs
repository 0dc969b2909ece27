use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Multiple candidate processes found: {0:?}")]
    MultipleCandidates(Vec<u32>),

    #[error("Process {0} exited")]
    ProcessExited(u32),

    #[error("Access denied to process {0}")]
    AccessDenied(u32),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("This version is not supported yet: {version}. Supported versions: {supported}")]
    UnsupportedVersion { version: String, supported: String },

    #[error("Signature pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Presence channel closed")]
    ChannelClosed,

    #[error("Presence endpoint unavailable: {0}")]
    PresenceUnavailable(String),

    #[error("Presence error: {0}")]
    Presence(String),

    #[error("Metadata lookup failed: {0}")]
    Metadata(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors that must stop scheduling until the user intervenes.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::UnsupportedVersion { .. })
    }

    /// Errors caused by the target process going away or refusing access
    /// while it was being inspected. These are treated as "not found".
    pub fn is_process_race(&self) -> bool {
        matches!(
            self,
            Error::ProcessExited(_) | Error::AccessDenied(_) | Error::ProcessNotFound(_)
        )
    }

    /// Per-tick failures that are expected to clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::MemoryReadFailed { .. } | Error::ChannelClosed
                | Error::Metadata(_)
        ) || self.is_process_race()
    }

    /// Errors that need user action and must not be buried in the log.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedVersion { .. }
                | Error::MultipleCandidates(_)
                | Error::PresenceUnavailable(_)
        )
    }
}
