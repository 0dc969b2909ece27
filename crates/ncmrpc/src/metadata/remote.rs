use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::metadata::track::TrackRecord;
use crate::metadata::{MetadataSource, SongMetadata};

pub const SONG_DETAIL_URL: &str = "https://music.163.com/api/v3/song/detail";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct SongDetailResponse {
    #[serde(default)]
    songs: Vec<TrackRecord>,
}

/// NetEase web API lookup
pub struct RemoteApiSource {
    agent: ureq::Agent,
    endpoint: String,
}

impl RemoteApiSource {
    pub fn new() -> Self {
        Self::with_endpoint(SONG_DETAIL_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: config.into(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for RemoteApiSource {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_response(body: SongDetailResponse) -> Option<SongMetadata> {
    body.songs.into_iter().next().map(TrackRecord::into_metadata)
}

impl MetadataSource for RemoteApiSource {
    fn name(&self) -> &str {
        "remote"
    }

    fn resolve(&self, song_id: &str) -> Result<Option<SongMetadata>> {
        let id: u64 = song_id
            .parse()
            .map_err(|_| Error::Metadata(format!("invalid song id: {}", song_id)))?;
        let query = serde_json::json!([{ "id": id }]).to_string();
        let mut response = self
            .agent
            .get(&self.endpoint)
            .query("c", &query)
            .call()
            .map_err(|e| Error::Metadata(format!("request failed: {}", e)))?;

        let body: SongDetailResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| Error::Metadata(format!("invalid response: {}", e)))?;

        Ok(parse_response(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_song_detail_response() {
        let json = r#"{"songs": [{"name": "T", "id": 1, "al": {"name": "A", "picUrl": "https://c"},
                       "ar": [{"name": "P"}, {"name": "Q"}], "dt": 200000}], "code": 200}"#;
        let metadata = parse_response(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(metadata.title, "T");
        assert_eq!(metadata.artist, "P / Q");
        assert_eq!(metadata.duration_seconds, 200.0);
    }

    #[test]
    fn test_empty_songs_is_not_found() {
        let body: SongDetailResponse = serde_json::from_str(r#"{"songs": [], "code": 200}"#).unwrap();
        assert!(parse_response(body).is_none());
    }
}
