//! Song metadata lookup.
//!
//! Sources are consulted in priority order and every answer, including "not
//! found", is memoized for the lifetime of the process.

mod cache;
mod local;
#[cfg(feature = "api")]
mod remote;
mod track;

pub use cache::MetadataCache;
pub use local::{LocalFileSource, default_webdata_dir};
#[cfg(feature = "api")]
pub use remote::{RemoteApiSource, SONG_DETAIL_URL};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMetadata {
    pub title: String,
    pub album: String,
    pub artist: String,
    pub cover_url: Option<String>,
    pub duration_seconds: f64,
}

/// One place song details can come from.
pub trait MetadataSource {
    /// Short name for log lines
    fn name(&self) -> &str;

    /// `Ok(None)` means the source does not know the song.
    fn resolve(&self, song_id: &str) -> Result<Option<SongMetadata>>;
}
