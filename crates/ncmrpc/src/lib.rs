//! # ncmrpc
//!
//! Mirrors what the NetEase Cloud Music desktop client is playing to Discord
//! Rich Presence by reading the client's process memory.
//!
//! This crate provides:
//! - Windows process discovery and memory reading
//! - Per-release memory layouts, fixed offsets for 2.x and signature scanning for 3.x
//! - Playback sampling and playing/paused/changed classification
//! - Song metadata lookup (local client files, NetEase web API)
//! - Discord IPC client and presence publishing
//! - A scheduled synchronizer running on a worker thread
//!
//! ## Feature Flags
//!
//! - `api`: Enables the NetEase web API metadata source (`ureq`).

pub mod config;
pub mod error;
pub mod layout;
pub mod memory;
pub mod metadata;
pub mod prelude;
pub mod presence;
pub mod process;
pub mod sampler;
pub mod scheduler;
pub mod signature;
pub mod status;
pub mod sync;

pub use config::{Config, default_config_path};
pub use error::{Error, Result};
pub use layout::{LayoutCatalog, LayoutStrategy, ResolvedPointers, SongPointer};
pub use memory::{MemoryReader, ReadMemory};
pub use metadata::{MetadataCache, MetadataSource, SongMetadata};
pub use presence::{Activity, DiscordIpcClient, PresenceClient, PresencePublisher};
pub use process::{LocatedProcess, ProcessBackend, ProcessLocator, SystemProcessBackend};
pub use sampler::{Sample, SampleOutcome, format_position, parse_song_token};
pub use scheduler::{Scheduler, ShutdownSignal, Tick};
pub use signature::{
    CodeSignature, SignatureEntry, SignatureSet, builtin_signatures, load_signatures,
    save_signatures,
};
pub use status::{PlaybackStatus, StatusClassifier};
pub use sync::{SyncEvent, SyncOptions, SyncService, Synchronizer};
