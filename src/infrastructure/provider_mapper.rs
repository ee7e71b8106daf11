//! Maps the three provider payload shapes onto [`Track`] / [`Playlist`].
//!
//! Every function here is pure. Missing or mistyped optional fields never
//! fail; each output field has a documented default.

use crate::domain::models::{Playlist, PlaylistFields, Provider, Track};
use crate::infrastructure::error::InfraError;
use serde_json::Value;

pub const APPLE_PLACEHOLDER_IMAGE: &str =
    "https://toolbox.marketingtools.apple.com/_next/static/media/music.159ea19e.svg";
const APPLE_DEFAULT_ARTWORK_PX: u64 = 200;
const DEFAULT_DURATION: &str = "0";

/// YouTube playlist listings from the backend misspell this key on some
/// code paths; both spellings are read.
const YOUTUBE_DURATION_KEYS: [&str; 2] = ["formatted_duration", "formatted_duraiton"];

/// Unknown tags are rejected instead of falling back to the Spotify shape.
pub fn provider_from_tag(tag: &str) -> Result<Provider, InfraError> {
    tag.parse::<Provider>()
        .map_err(|_| InfraError::UnsupportedProvider(tag.trim().to_string()))
}

pub fn normalize_track(raw: &Value, provider: Provider) -> Track {
    match provider {
        Provider::YouTube => Track::new(
            text(raw, "title"),
            text(raw, "channelTitle"),
            text(raw, "video_id"),
            text(raw, "thumbnail_url"),
        ),
        Provider::Spotify | Provider::Apple => Track::new(
            text(raw, "track_name"),
            text(raw, "artist_name"),
            text(raw, "track_id"),
            text(raw, "track_image"),
        ),
    }
}

pub fn normalize_playlist(raw: &Value, provider: Provider) -> Playlist {
    let fields = match provider {
        Provider::Spotify => spotify_fields(raw),
        Provider::YouTube => youtube_fields(raw),
        Provider::Apple => apple_fields(raw),
    };
    Playlist::new(fields, provider)
}

/// Unwraps a playlist listing response: Spotify returns a bare array, YouTube
/// wraps entries in `items`, Apple in `data`.
pub fn normalize_playlist_page(raw: &Value, provider: Provider) -> Vec<Playlist> {
    let entries = match provider {
        Provider::Spotify => raw.as_array().or_else(|| array_at(raw, "items")),
        Provider::YouTube => array_at(raw, "items"),
        Provider::Apple => array_at(raw, "data"),
    };

    entries
        .map(|entries| {
            entries
                .iter()
                .filter(|entry| entry.is_object())
                .map(|entry| normalize_playlist(entry, provider))
                .collect()
        })
        .unwrap_or_default()
}

fn spotify_fields(raw: &Value) -> PlaylistFields {
    let tracks = nested_tracks(raw, Provider::Spotify);
    let count = raw
        .get("playlist_track_count")
        .and_then(count_value)
        .unwrap_or(0);

    PlaylistFields {
        playlist_name: text(raw, "playlist_name"),
        playlist_id: text(raw, "playlist_id"),
        playlist_image: text(raw, "playlist_image"),
        playlist_owner: text(raw, "playlist_owner"),
        playlist_owner_id: text(raw, "playlist_owner_id"),
        playlist_track_count: count.max(tracks.len() as u64),
        playlist_duration: raw
            .get("playlist_duration")
            .and_then(duration_value)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DURATION.to_string()),
        channel_image: String::new(),
        tracks,
    }
}

fn youtube_fields(raw: &Value) -> PlaylistFields {
    let snippet = raw.get("snippet");
    let content_details = raw.get("contentDetails");
    let thumbnails = snippet.and_then(|snippet| snippet.get("thumbnails"));

    let image = ["high", "default"]
        .into_iter()
        .find_map(|size| {
            thumbnails
                .and_then(|thumbs| thumbs.get(size))
                .and_then(|thumb| non_empty_str(thumb, "url"))
        })
        .unwrap_or_default()
        .to_string();

    let tracks = nested_tracks(raw, Provider::YouTube);
    let count = present(raw, "total_tracks")
        .and_then(count_value)
        .or_else(|| {
            content_details
                .and_then(|details| present(details, "itemCount"))
                .and_then(count_value)
        })
        .unwrap_or(tracks.len() as u64);

    let duration = YOUTUBE_DURATION_KEYS
        .into_iter()
        .find_map(|key| present(raw, key).and_then(duration_value))
        .unwrap_or_else(|| DEFAULT_DURATION.to_string());

    PlaylistFields {
        playlist_name: snippet.map(|s| text(s, "title")).unwrap_or_default(),
        playlist_id: text(raw, "id"),
        playlist_image: image,
        playlist_owner: snippet.map(|s| text(s, "channelTitle")).unwrap_or_default(),
        playlist_owner_id: snippet.map(|s| text(s, "channelId")).unwrap_or_default(),
        playlist_track_count: count.max(tracks.len() as u64),
        playlist_duration: duration,
        channel_image: snippet.map(|s| text(s, "channelImage")).unwrap_or_default(),
        tracks,
    }
}

fn apple_fields(raw: &Value) -> PlaylistFields {
    let attributes = raw.get("attributes");
    let artwork = attributes.and_then(|attributes| attributes.get("artwork"));

    let image = artwork
        .and_then(|artwork| artwork.get("url"))
        .and_then(Value::as_str)
        .map(|template| {
            let width = artwork_dimension(artwork, "width");
            let height = artwork_dimension(artwork, "height");
            template
                .replace("{w}", &width.to_string())
                .replace("{h}", &height.to_string())
        })
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| APPLE_PLACEHOLDER_IMAGE.to_string());

    let playlist_id = non_empty_str(raw, "playlist_id")
        .or_else(|| non_empty_str(raw, "id"))
        .unwrap_or_default()
        .to_string();

    PlaylistFields {
        playlist_name: attributes.map(|a| text(a, "name")).unwrap_or_default(),
        playlist_id,
        playlist_image: image,
        playlist_owner: String::new(),
        playlist_owner_id: String::new(),
        playlist_track_count: raw.get("total_tracks").and_then(count_value).unwrap_or(0),
        playlist_duration: raw
            .get("formatted_duration")
            .and_then(duration_value)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DURATION.to_string()),
        channel_image: String::new(),
        tracks: Vec::new(),
    }
}

fn artwork_dimension(artwork: Option<&Value>, key: &str) -> u64 {
    artwork
        .and_then(|artwork| artwork.get(key))
        .and_then(count_value)
        .filter(|value| *value > 0)
        .unwrap_or(APPLE_DEFAULT_ARTWORK_PX)
}

fn nested_tracks(raw: &Value, provider: Provider) -> Vec<Track> {
    array_at(raw, "tracks")
        .map(|tracks| {
            tracks
                .iter()
                .map(|track| normalize_track(track, provider))
                .collect()
        })
        .unwrap_or_default()
}

fn array_at<'a>(raw: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    raw.get(key).and_then(Value::as_array)
}

/// Present and not `null`.
fn present<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|value| !value.is_null())
}

fn non_empty_str<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn text(raw: &Value, key: &str) -> String {
    non_empty_str(raw, key).unwrap_or_default().to_string()
}

/// Counts arrive as integers, floats or numeric strings depending on the
/// upstream service.
fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.is_finite() && *value >= 0.0)
                .map(|value| value as u64)
        }),
        Value::String(raw) => raw.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn duration_value(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => Some(raw.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
