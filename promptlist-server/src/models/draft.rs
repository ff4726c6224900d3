//! Tolerant decode of completion output
//!
//! The model is asked for `{title, description, tracks: [...]}` but nothing
//! enforces it. Decoding never fails on a missing or mistyped field; only
//! text that is not a JSON object at all is rejected.
//!
//! | Field                   | Fallback                         |
//! |-------------------------|----------------------------------|
//! | `title`, `description`  | empty string                     |
//! | `tracks`                | empty sequence                   |
//! | `album`                 | empty string                     |
//! | `year`, `duration`      | 0 (numeric strings are accepted) |
//! | `explanation`           | absent                           |
//!
//! Entries with an empty title or artist are dropped.

use promptlist_common::Track;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::services::completion_client::CompletionError;

/// Model-authored playlist before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftPlaylist {
    pub title: String,
    pub description: String,
    pub tracks: Vec<Track>,
}

impl DraftPlaylist {
    /// Decode raw completion text
    ///
    /// # Errors
    /// `CompletionError::Malformed` when the text is not a JSON object.
    pub fn from_completion(raw: &str) -> Result<Self, CompletionError> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|e| CompletionError::Malformed(format!("Completion is not JSON: {}", e)))?;

        if !value.is_object() {
            return Err(CompletionError::Malformed(
                "Completion JSON is not an object".to_string(),
            ));
        }

        let raw_draft: RawDraft = serde_json::from_value(value)
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        let total = raw_draft.tracks.len();
        let tracks: Vec<Track> = raw_draft
            .tracks
            .into_iter()
            .filter_map(RawTrack::into_track)
            .collect();

        if tracks.len() < total {
            debug!(
                dropped = total - tracks.len(),
                "Dropped completion tracks without title or artist"
            );
        }

        Ok(Self {
            title: raw_draft.title,
            description: raw_draft.description,
            tracks,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawDraft {
    #[serde(default, deserialize_with = "lenient_string")]
    title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    description: String,
    #[serde(default, deserialize_with = "lenient_tracks")]
    tracks: Vec<RawTrack>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTrack {
    #[serde(deserialize_with = "lenient_string")]
    title: String,
    #[serde(deserialize_with = "lenient_string")]
    artist: String,
    #[serde(deserialize_with = "lenient_string")]
    album: String,
    #[serde(deserialize_with = "lenient_int")]
    year: i64,
    #[serde(deserialize_with = "lenient_int")]
    duration: i64,
    #[serde(deserialize_with = "lenient_string")]
    explanation: String,
}

impl RawTrack {
    fn into_track(self) -> Option<Track> {
        let title = self.title.trim();
        let artist = self.artist.trim();
        if title.is_empty() || artist.is_empty() {
            return None;
        }

        let explanation = self.explanation.trim();
        Some(Track {
            title: title.to_string(),
            artist: artist.to_string(),
            album: self.album.trim().to_string(),
            year: i32::try_from(self.year).unwrap_or(0),
            duration: u32::try_from(self.duration).unwrap_or(0),
            explanation: (!explanation.is_empty()).then(|| explanation.to_string()),
            catalog_id: None,
            artwork_url: None,
        })
    }
}

/// Strings pass through, numbers are rendered, everything else is empty
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Integers, floats (truncated) and numeric strings; anything else is 0
fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    })
}

/// Arrays of objects; non-object entries are skipped, non-arrays are empty
fn lenient_tracks<'de, D>(deserializer: D) -> Result<Vec<RawTrack>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
