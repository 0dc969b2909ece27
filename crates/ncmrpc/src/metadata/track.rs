use serde::Deserialize;

use crate::metadata::SongMetadata;

/// Track record shared by the client's local files and the web API.
///
/// The local files use long field names (`album`, `artists`, `duration`),
/// the API the short ones (`al`, `ar`, `dt`).
#[derive(Debug, Deserialize)]
pub(crate) struct TrackRecord {
    #[serde(default)]
    pub id: Option<TrackId>,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "al", default)]
    pub album: AlbumRecord,
    #[serde(alias = "ar", default)]
    pub artists: Vec<ArtistRecord>,
    /// Milliseconds
    #[serde(alias = "dt", default)]
    pub duration: f64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AlbumRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "picUrl", default)]
    pub pic_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistRecord {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum TrackId {
    Number(u64),
    Text(String),
}

impl TrackId {
    pub fn matches(&self, song_id: &str) -> bool {
        match self {
            TrackId::Number(id) => id.to_string() == song_id,
            TrackId::Text(id) => id == song_id,
        }
    }
}

impl TrackRecord {
    pub fn into_metadata(self) -> SongMetadata {
        let artist = self
            .artists
            .into_iter()
            .filter_map(|a| a.name)
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(" / ");

        SongMetadata {
            title: self.name,
            album: self.album.name.unwrap_or_default(),
            artist,
            cover_url: self.album.pic_url.filter(|url| !url.is_empty()),
            duration_seconds: self.duration / 1000.0,
        }
    }
}
