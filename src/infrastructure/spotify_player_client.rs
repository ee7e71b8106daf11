use crate::domain::models::{Device, NowPlaying, PlaybackSnapshot};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEVICES_PATH: &str = "me/player/devices";
const CURRENTLY_PLAYING_PATH: &str = "me/player/currently-playing";
const PLAY_PATH: &str = "me/player/play";
const PAUSE_PATH: &str = "me/player/pause";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayRequest {
    pub context_uri: String,
    pub offset: PlayOffset,
    pub position_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayOffset {
    pub position: u32,
}

impl PlayRequest {
    /// Start `playlist_id` from its first track.
    pub fn playlist(playlist_id: &str) -> Self {
        Self {
            context_uri: format!("spotify:playlist:{playlist_id}"),
            offset: PlayOffset { position: 0 },
            position_ms: 0,
        }
    }
}

#[async_trait]
pub trait PlayerApi: Send + Sync {
    async fn devices(&self, access_token: &str) -> Result<Vec<Device>, InfraError>;

    /// `None` when nothing is playing (HTTP 204 or an empty item).
    async fn currently_playing(
        &self,
        access_token: &str,
    ) -> Result<Option<PlaybackSnapshot>, InfraError>;

    async fn play(
        &self,
        access_token: &str,
        device_id: &str,
        request: &PlayRequest,
    ) -> Result<(), InfraError>;

    async fn pause(&self, access_token: &str, device_id: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestPlayerClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct DevicesPayload {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlayingPayload {
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    item: Option<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<NamedItem>,
    #[serde(default)]
    album: Option<AlbumItem>,
}

#[derive(Debug, Deserialize)]
struct NamedItem {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct ImageItem {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct PlayerErrorPayload {
    error: PlayerErrorBody,
}

#[derive(Debug, Deserialize)]
struct PlayerErrorBody {
    #[serde(default)]
    message: String,
}

impl ReqwestPlayerClient {
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| InfraError::InvalidConfig(format!("failed building http client: {error}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, InfraError> {
        self.base_url
            .join(path)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid player url for {path}: {error}")))
    }

    fn device_endpoint(&self, path: &str, device_id: &str) -> Result<Url, InfraError> {
        let mut endpoint = self.endpoint(path)?;
        endpoint.query_pairs_mut().append_pair("device_id", device_id);
        Ok(endpoint)
    }

    async fn read_body(response: reqwest::Response, path: &str) -> Result<(StatusCode, String), InfraError> {
        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::NetworkUnreachable(format!("failed reading {path} response: {error}"))
        })?;
        Ok((status, body))
    }
}

fn send_error(path: &str, error: reqwest::Error) -> InfraError {
    InfraError::NetworkUnreachable(format!("{path} request failed: {error}"))
}

fn player_http_error(path: &str, status: StatusCode, body: &str) -> InfraError {
    let message = serde_json::from_str::<PlayerErrorPayload>(body)
        .map(|payload| payload.error.message)
        .ok()
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    InfraError::Upstream {
        status: status.as_u16(),
        message: format!("{path}: {message}"),
    }
}

fn snapshot_from_payload(payload: CurrentlyPlayingPayload) -> Option<PlaybackSnapshot> {
    let item = payload.item?;
    let (album, cover_url) = match item.album {
        Some(album) => {
            let cover = album
                .images
                .into_iter()
                .map(|image| image.url)
                .find(|url| !url.is_empty())
                .unwrap_or_default();
            (album.name, cover)
        }
        None => (String::new(), String::new()),
    };

    Some(PlaybackSnapshot {
        progress_ms: payload.progress_ms.unwrap_or(0),
        duration_ms: item.duration_ms,
        is_playing: payload.is_playing,
        track: NowPlaying {
            title: item.name,
            artists: item
                .artists
                .into_iter()
                .map(|artist| artist.name)
                .filter(|name| !name.is_empty())
                .collect(),
            album,
            cover_url,
        },
    })
}

#[async_trait]
impl PlayerApi for ReqwestPlayerClient {
    async fn devices(&self, access_token: &str) -> Result<Vec<Device>, InfraError> {
        let response = self
            .client
            .get(self.endpoint(DEVICES_PATH)?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| send_error(DEVICES_PATH, error))?;

        let (status, body) = Self::read_body(response, DEVICES_PATH).await?;
        if !status.is_success() {
            return Err(player_http_error(DEVICES_PATH, status, &body));
        }
        let payload: DevicesPayload = serde_json::from_str(&body)?;
        Ok(payload.devices)
    }

    async fn currently_playing(
        &self,
        access_token: &str,
    ) -> Result<Option<PlaybackSnapshot>, InfraError> {
        let response = self
            .client
            .get(self.endpoint(CURRENTLY_PLAYING_PATH)?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| send_error(CURRENTLY_PLAYING_PATH, error))?;

        let (status, body) = Self::read_body(response, CURRENTLY_PLAYING_PATH).await?;
        if status == StatusCode::NO_CONTENT || (status.is_success() && body.trim().is_empty()) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(player_http_error(CURRENTLY_PLAYING_PATH, status, &body));
        }

        let payload: CurrentlyPlayingPayload = serde_json::from_str(&body)?;
        Ok(snapshot_from_payload(payload))
    }

    async fn play(
        &self,
        access_token: &str,
        device_id: &str,
        request: &PlayRequest,
    ) -> Result<(), InfraError> {
        let response = self
            .client
            .put(self.device_endpoint(PLAY_PATH, device_id)?)
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await
            .map_err(|error| send_error(PLAY_PATH, error))?;

        let (status, body) = Self::read_body(response, PLAY_PATH).await?;
        if !status.is_success() {
            return Err(player_http_error(PLAY_PATH, status, &body));
        }
        Ok(())
    }

    async fn pause(&self, access_token: &str, device_id: &str) -> Result<(), InfraError> {
        let response = self
            .client
            .put(self.device_endpoint(PAUSE_PATH, device_id)?)
            .bearer_auth(access_token)
            .header(CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(|error| send_error(PAUSE_PATH, error))?;

        let (status, body) = Self::read_body(response, PAUSE_PATH).await?;
        if !status.is_success() {
            return Err(player_http_error(PAUSE_PATH, status, &body));
        }
        Ok(())
    }
}
