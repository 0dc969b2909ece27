use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metadata::SongMetadata;

pub const LISTEN_BUTTON_LABEL: &str = "Listen on NetEase";
/// Discord rejects activity strings outside 2..=128 characters
const MIN_TEXT_CHARS: usize = 2;
const MAX_TEXT_CHARS: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timestamps {
    /// Unix seconds
    pub start: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    pub label: String,
    pub url: String,
}

/// Payload of a `SET_ACTIVITY` command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub details: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    pub assets: Assets,
    pub buttons: Vec<Button>,
}

pub fn song_url(song_id: &str) -> String {
    format!("https://music.163.com/#/song?id={}", song_id)
}

impl Activity {
    /// Activity for a track. While playing, the start timestamp is set so the
    /// elapsed counter lines up with `position_seconds`.
    pub fn for_track(
        song_id: &str,
        metadata: &SongMetadata,
        position_seconds: f64,
        paused: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let timestamps = (!paused).then(|| Timestamps {
            start: now.timestamp() - position_seconds.max(0.0) as i64,
        });
        let (small_image, small_text) = if paused {
            ("pause", "Paused")
        } else {
            ("play", "Playing")
        };

        Self {
            details: fit_text(&metadata.title),
            state: fit_text(&format!("{} | {}", metadata.artist, metadata.album)),
            timestamps,
            assets: Assets {
                large_image: metadata.cover_url.clone(),
                large_text: fit_text(&metadata.album),
                small_image: small_image.to_string(),
                small_text: small_text.to_string(),
            },
            buttons: vec![Button {
                label: LISTEN_BUTTON_LABEL.to_string(),
                url: song_url(song_id),
            }],
        }
    }

    pub fn is_paused(&self) -> bool {
        self.timestamps.is_none()
    }
}

/// Pad short strings and truncate long ones to what Discord accepts.
pub fn fit_text(text: &str) -> String {
    let count = text.chars().count();
    if count < MIN_TEXT_CHARS {
        let mut padded = text.to_string();
        padded.extend(std::iter::repeat_n(' ', MIN_TEXT_CHARS - count));
        padded
    } else if count > MAX_TEXT_CHARS {
        text.chars().take(MAX_TEXT_CHARS).collect()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata() -> SongMetadata {
        SongMetadata {
            title: "晴天".to_string(),
            album: "叶惠美".to_string(),
            artist: "周杰伦".to_string(),
            cover_url: Some("https://p2.music.126.net/cover.jpg".to_string()),
            duration_seconds: 269.0,
        }
    }

    #[test]
    fn test_playing_activity() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let activity = Activity::for_track("186016", &metadata(), 42.7, false, now);

        assert_eq!(activity.details, "晴天");
        assert_eq!(activity.state, "周杰伦 | 叶惠美");
        assert_eq!(activity.timestamps, Some(Timestamps { start: 1_699_999_958 }));
        assert_eq!(activity.assets.small_image, "play");
        assert_eq!(activity.assets.small_text, "Playing");
        assert_eq!(activity.buttons[0].label, "Listen on NetEase");
        assert_eq!(
            activity.buttons[0].url,
            "https://music.163.com/#/song?id=186016"
        );
        assert!(!activity.is_paused());
    }

    #[test]
    fn test_paused_activity_has_no_timestamp() {
        let activity = Activity::for_track("1", &metadata(), 10.0, true, Utc::now());
        assert!(activity.is_paused());
        assert_eq!(activity.assets.small_image, "pause");
        assert_eq!(activity.assets.small_text, "Paused");

        let json = serde_json::to_value(&activity).unwrap();
        assert!(json.get("timestamps").is_none());
    }

    #[test]
    fn test_fit_text() {
        assert_eq!(fit_text(""), "  ");
        assert_eq!(fit_text("A"), "A ");
        assert_eq!(fit_text("AB"), "AB");
        assert_eq!(fit_text(&"x".repeat(200)).chars().count(), 128);
    }

    #[test]
    fn test_missing_cover_is_omitted() {
        let mut metadata = metadata();
        metadata.cover_url = None;
        let activity = Activity::for_track("1", &metadata, 0.0, false, Utc::now());
        let json = serde_json::to_value(&activity).unwrap();
        assert!(json["assets"].get("large_image").is_none());
    }
}
