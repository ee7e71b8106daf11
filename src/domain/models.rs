use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Provider {
    Spotify,
    YouTube,
    Apple,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Spotify, Provider::YouTube, Provider::Apple];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spotify => "Spotify",
            Self::YouTube => "YouTube",
            Self::Apple => "Apple",
        }
    }

    /// Name the backend uses in `apps/*` payloads.
    pub fn backend_app_name(self) -> &'static str {
        match self {
            Self::Spotify => "Spotify",
            Self::YouTube => "YoutubeMusic",
            Self::Apple => "AppleMusic",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Spotify => "Spotify",
            Self::YouTube => "YouTube Music",
            Self::Apple => "Apple Music",
        }
    }

    pub fn playlists_path(self) -> &'static str {
        match self {
            Self::Spotify => "spotify/playlists",
            Self::YouTube => "youtube-music/playlists",
            Self::Apple => "apple-music/playlists",
        }
    }

    pub fn from_backend_app_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.backend_app_name() == name.trim())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "spotify" => Ok(Self::Spotify),
            "youtube" | "youtubemusic" | "youtube-music" | "ytm" => Ok(Self::YouTube),
            "apple" | "applemusic" | "apple-music" => Ok(Self::Apple),
            other => Err(format!(
                "unknown provider '{other}' (expected spotify, youtube or apple)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    track_name: String,
    artist_name: String,
    track_id: String,
    track_image: String,
}

impl Track {
    pub(crate) fn new(
        track_name: String,
        artist_name: String,
        track_id: String,
        track_image: String,
    ) -> Self {
        Self {
            track_name,
            artist_name,
            track_id,
            track_image,
        }
    }

    pub fn track_name(&self) -> &str {
        &self.track_name
    }

    pub fn artist_name(&self) -> &str {
        &self.artist_name
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn track_image(&self) -> &str {
        &self.track_image
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    playlist_name: String,
    playlist_id: String,
    playlist_image: String,
    playlist_owner: String,
    #[serde(rename = "playlistOwnerID")]
    playlist_owner_id: String,
    playlist_track_count: u64,
    playlist_duration: String,
    channel_image: String,
    tracks: Vec<Track>,
    provider_tag: Provider,
}

/// Field values a provider branch produced; handed to `Playlist::new`.
#[derive(Debug, Clone)]
pub(crate) struct PlaylistFields {
    pub playlist_name: String,
    pub playlist_id: String,
    pub playlist_image: String,
    pub playlist_owner: String,
    pub playlist_owner_id: String,
    pub playlist_track_count: u64,
    pub playlist_duration: String,
    pub channel_image: String,
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub(crate) fn new(fields: PlaylistFields, provider_tag: Provider) -> Self {
        Self {
            playlist_name: fields.playlist_name,
            playlist_id: fields.playlist_id,
            playlist_image: fields.playlist_image,
            playlist_owner: fields.playlist_owner,
            playlist_owner_id: fields.playlist_owner_id,
            playlist_track_count: fields.playlist_track_count,
            playlist_duration: fields.playlist_duration,
            channel_image: fields.channel_image,
            tracks: fields.tracks,
            provider_tag,
        }
    }

    /// Applies a later duration/count lookup. Empty values keep what the
    /// playlist already carried.
    pub(crate) fn with_details(mut self, details: &PlaylistDetails) -> Self {
        if let Some(duration) = details
            .formatted_duration
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            self.playlist_duration = duration.to_string();
        }
        if let Some(count) = details.total_track_count.filter(|count| *count > 0) {
            self.playlist_track_count = count.max(self.tracks.len() as u64);
        }
        self
    }

    pub fn playlist_name(&self) -> &str {
        &self.playlist_name
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    pub fn playlist_image(&self) -> &str {
        &self.playlist_image
    }

    pub fn playlist_owner(&self) -> &str {
        &self.playlist_owner
    }

    pub fn playlist_owner_id(&self) -> &str {
        &self.playlist_owner_id
    }

    pub fn playlist_track_count(&self) -> u64 {
        self.playlist_track_count
    }

    pub fn playlist_duration(&self) -> &str {
        &self.playlist_duration
    }

    pub fn channel_image(&self) -> &str {
        &self.channel_image
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn provider_tag(&self) -> Provider {
        self.provider_tag
    }

    /// A count-only playlist (empty `tracks`) is valid; a detailed one must
    /// not report fewer tracks than it carries.
    pub fn validate(&self) -> Result<(), String> {
        if !self.tracks.is_empty() && self.playlist_track_count < self.tracks.len() as u64 {
            return Err(format!(
                "playlist.track_count {} is smaller than tracks.len() {}",
                self.playlist_track_count,
                self.tracks.len()
            ));
        }
        if self.provider_tag == Provider::Apple && !self.tracks.is_empty() {
            return Err("apple playlists carry no nested tracks".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PlaylistDetails {
    #[serde(default)]
    pub formatted_duration: Option<String>,
    #[serde(default)]
    pub total_track_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    pub cover_url: String,
}

impl NowPlaying {
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// Authoritative playback state as reported by the provider.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub track: NowPlaying,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct PlaybackProgressState {
    pub local_progress_ms: u64,
    pub local_duration_ms: u64,
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LinkStatus {
    #[serde(default)]
    pub user_linked: bool,
    #[serde(default)]
    pub user_profile: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppBinding {
    pub provider: Provider,
    pub user_linked: bool,
    pub user_profile: Option<serde_json::Value>,
}

impl AppBinding {
    /// `display_name` for Spotify profiles, `name` for the others.
    pub fn profile_name(&self) -> Option<&str> {
        let profile = self.user_profile.as_ref()?;
        profile
            .get("display_name")
            .or_else(|| profile.get("name"))
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCredentials {
    pub user_email: String,
    pub bearer_token: Option<String>,
}

impl SessionCredentials {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.user_email, "credentials.user_email")?;
        if let Some(token) = self.bearer_token.as_deref() {
            validate_non_empty(token, "credentials.bearer_token")?;
        }
        Ok(())
    }
}

fn validate_non_empty(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(count: u64, tracks: Vec<Track>) -> PlaylistFields {
        PlaylistFields {
            playlist_name: "Focus".to_string(),
            playlist_id: "p1".to_string(),
            playlist_image: String::new(),
            playlist_owner: String::new(),
            playlist_owner_id: String::new(),
            playlist_track_count: count,
            playlist_duration: "0".to_string(),
            channel_image: String::new(),
            tracks,
        }
    }

    fn track(id: &str) -> Track {
        Track::new(
            "Song".to_string(),
            "Artist".to_string(),
            id.to_string(),
            String::new(),
        )
    }

    #[test]
    fn provider_parses_cli_and_backend_spellings() {
        assert_eq!("spotify".parse::<Provider>(), Ok(Provider::Spotify));
        assert_eq!("YouTube-Music".parse::<Provider>(), Ok(Provider::YouTube));
        assert_eq!(" apple ".parse::<Provider>(), Ok(Provider::Apple));
        assert!("tidal".parse::<Provider>().is_err());

        assert_eq!(
            Provider::from_backend_app_name("YoutubeMusic"),
            Some(Provider::YouTube)
        );
        assert_eq!(Provider::from_backend_app_name("Google API"), None);
    }

    #[test]
    fn count_only_playlist_is_valid() {
        let playlist = Playlist::new(fields(42, Vec::new()), Provider::Apple);
        assert!(playlist.validate().is_ok());
    }

    #[test]
    fn playlist_count_below_track_len_is_rejected() {
        let playlist = Playlist::new(fields(1, vec![track("a"), track("b")]), Provider::Spotify);
        assert!(playlist.validate().is_err());
    }

    #[test]
    fn with_details_ignores_empty_values() {
        let playlist = Playlist::new(fields(3, Vec::new()), Provider::Spotify);
        let unchanged = playlist.clone().with_details(&PlaylistDetails {
            formatted_duration: Some("  ".to_string()),
            total_track_count: Some(0),
        });
        assert_eq!(unchanged, playlist);

        let enriched = playlist.with_details(&PlaylistDetails {
            formatted_duration: Some("1h 02m".to_string()),
            total_track_count: Some(17),
        });
        assert_eq!(enriched.playlist_duration(), "1h 02m");
        assert_eq!(enriched.playlist_track_count(), 17);
    }

    #[test]
    fn binding_profile_name_prefers_display_name() {
        let binding = AppBinding {
            provider: Provider::Spotify,
            user_linked: true,
            user_profile: Some(serde_json::json!({"display_name": "dj", "name": "other"})),
        };
        assert_eq!(binding.profile_name(), Some("dj"));

        let apple = AppBinding {
            provider: Provider::Apple,
            user_linked: true,
            user_profile: Some(serde_json::json!({"name": "listener"})),
        };
        assert_eq!(apple.profile_name(), Some("listener"));
    }

    #[test]
    fn credentials_require_email() {
        let credentials = SessionCredentials {
            user_email: "  ".to_string(),
            bearer_token: None,
        };
        assert!(credentials.validate().is_err());
    }
}
