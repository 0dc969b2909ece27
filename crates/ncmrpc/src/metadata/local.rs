use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::metadata::track::TrackRecord;
use crate::metadata::{MetadataSource, SongMetadata};

/// `%LOCALAPPDATA%\Netease\CloudMusic\webdata\file`
pub fn default_webdata_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("Netease/CloudMusic/webdata/file"))
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    track: TrackRecord,
}

/// One of the JSON files the client keeps under `webdata/file`.
///
/// Both `history` and `queue` are arrays of `{"track": {...}}` records.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    name: &'static str,
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(name: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
        }
    }

    /// Recently played tracks
    pub fn history(webdata_dir: &Path) -> Self {
        Self::new("history", webdata_dir.join("history"))
    }

    /// The current play queue
    pub fn queue(webdata_dir: &Path) -> Self {
        Self::new("queue", webdata_dir.join("queue"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataSource for LocalFileSource {
    fn name(&self) -> &str {
        self.name
    }

    fn resolve(&self, song_id: &str) -> Result<Option<SongMetadata>> {
        if !self.path.exists() {
            debug!("{} file not present: {}", self.name, self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        // Parse entries one by one; a single odd record must not hide the rest
        let entries: Vec<serde_json::Value> = serde_json::from_str(&content)?;
        let found = entries
            .into_iter()
            .filter_map(|value| serde_json::from_value::<FileEntry>(value).ok())
            .find(|entry| entry.track.id.as_ref().is_some_and(|id| id.matches(song_id)));

        Ok(found.map(|entry| entry.track.into_metadata()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HISTORY: &str = r#"[
        {"track": {"id": 100, "name": "First", "album": {"name": "One", "picUrl": "https://img/1.jpg"},
                   "artists": [{"name": "X"}], "duration": 180000}, "time": 1},
        {"broken": true},
        {"track": {"id": 200, "name": "Second", "album": {"name": "Two", "picUrl": null},
                   "artists": [{"name": "Y"}, {"name": "Z"}], "duration": 60000}}
    ]"#;

    #[test]
    fn test_history_lookup() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("history"), HISTORY).unwrap();
        let source = LocalFileSource::history(dir.path());

        let metadata = source.resolve("200").unwrap().unwrap();
        assert_eq!(metadata.title, "Second");
        assert_eq!(metadata.artist, "Y / Z");
        assert_eq!(metadata.cover_url, None);
        assert_eq!(metadata.duration_seconds, 60.0);

        assert!(source.resolve("300").unwrap().is_none());
    }

    #[test]
    fn test_queue_uses_queue_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("queue"), HISTORY).unwrap();
        let source = LocalFileSource::queue(dir.path());
        assert_eq!(source.name(), "queue");
        assert_eq!(source.resolve("100").unwrap().unwrap().album, "One");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let source = LocalFileSource::history(dir.path());
        assert!(source.resolve("100").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("history"), "{not json").unwrap();
        let source = LocalFileSource::history(dir.path());
        assert!(source.resolve("100").is_err());
    }
}
