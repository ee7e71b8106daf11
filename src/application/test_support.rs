use crate::domain::models::{
    AppBinding, Device, LinkStatus, NowPlaying, PlaybackSnapshot, PlaylistDetails, Provider,
    SessionCredentials,
};
use crate::infrastructure::backend_client::BackendApi;
use crate::infrastructure::credential_store::InMemoryCredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::spotify_player_client::{PlayRequest, PlayerApi};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) fn signed_in_store() -> Arc<InMemoryCredentialStore> {
    Arc::new(InMemoryCredentialStore::with_credentials(SessionCredentials {
        user_email: "focus@example.com".to_string(),
        bearer_token: Some("backend-jwt".to_string()),
    }))
}

pub(crate) fn device(id: &str, is_active: bool) -> Device {
    Device {
        id: Some(id.to_string()),
        name: format!("device {id}"),
        is_active,
        device_type: "Computer".to_string(),
        volume_percent: Some(50),
    }
}

pub(crate) fn snapshot(progress_ms: u64, duration_ms: u64) -> PlaybackSnapshot {
    PlaybackSnapshot {
        progress_ms,
        duration_ms,
        is_playing: true,
        track: NowPlaying {
            title: "Weightless".to_string(),
            artists: vec!["Marconi Union".to_string()],
            album: "Ambient".to_string(),
            cover_url: String::new(),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeTokenResponse {
    Token,
    Rejected,
}

#[derive(Debug)]
pub(crate) struct FakeBackend {
    token_response: Mutex<FakeTokenResponse>,
    token_delay: Duration,
    pub(crate) token_calls: AtomicUsize,
    pub(crate) playlists: Mutex<serde_json::Value>,
    pub(crate) details: Mutex<HashMap<String, PlaylistDetails>>,
    pub(crate) detail_calls: AtomicUsize,
    pub(crate) link_status: Mutex<LinkStatus>,
    pub(crate) unlink_message: Mutex<Option<String>>,
    pub(crate) bindings: Mutex<Vec<AppBinding>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            token_response: Mutex::new(FakeTokenResponse::Token),
            token_delay: Duration::ZERO,
            token_calls: AtomicUsize::new(0),
            playlists: Mutex::new(serde_json::json!([])),
            details: Mutex::new(HashMap::new()),
            detail_calls: AtomicUsize::new(0),
            link_status: Mutex::new(LinkStatus::default()),
            unlink_message: Mutex::new(None),
            bindings: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub(crate) fn rejecting_tokens() -> Self {
        let backend = Self::default();
        backend.set_token_response(FakeTokenResponse::Rejected);
        backend
    }

    pub(crate) fn with_token_delay(delay: Duration) -> Self {
        Self {
            token_delay: delay,
            ..Self::default()
        }
    }

    pub(crate) fn set_token_response(&self, response: FakeTokenResponse) {
        *self.token_response.lock().expect("token response lock poisoned") = response;
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn login(&self, email: &str, password: &str) -> Result<SessionCredentials, InfraError> {
        if password == "wrong" {
            return Err(InfraError::Auth("Invalid email or password".to_string()));
        }
        Ok(SessionCredentials {
            user_email: email.to_string(),
            bearer_token: Some(format!("jwt-{email}")),
        })
    }

    async fn playback_token(&self, credentials: &SessionCredentials) -> Result<String, InfraError> {
        let call = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.token_delay.is_zero() {
            tokio::time::sleep(self.token_delay).await;
        }
        match *self.token_response.lock().expect("token response lock poisoned") {
            FakeTokenResponse::Token => Ok(format!("player-token-{}-{call}", credentials.user_email)),
            FakeTokenResponse::Rejected => Err(InfraError::Auth("User not found.".to_string())),
        }
    }

    async fn check_linked_app(
        &self,
        _credentials: &SessionCredentials,
        _provider: Provider,
    ) -> Result<LinkStatus, InfraError> {
        Ok(self.link_status.lock().expect("link status lock poisoned").clone())
    }

    async fn unlink_app(
        &self,
        _credentials: &SessionCredentials,
        _provider: Provider,
    ) -> Result<Option<String>, InfraError> {
        Ok(self.unlink_message.lock().expect("unlink lock poisoned").clone())
    }

    async fn app_bindings(
        &self,
        _credentials: &SessionCredentials,
    ) -> Result<Vec<AppBinding>, InfraError> {
        Ok(self.bindings.lock().expect("bindings lock poisoned").clone())
    }

    async fn playlists(
        &self,
        _credentials: &SessionCredentials,
        _provider: Provider,
    ) -> Result<serde_json::Value, InfraError> {
        Ok(self.playlists.lock().expect("playlists lock poisoned").clone())
    }

    async fn playlist_details(
        &self,
        _credentials: &SessionCredentials,
        playlist_id: &str,
    ) -> Result<PlaylistDetails, InfraError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .lock()
            .expect("details lock poisoned")
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| InfraError::Upstream {
                status: 400,
                message: format!("no details for {playlist_id}"),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlayerCall {
    Play { device_id: String, context_uri: String },
    Pause { device_id: String },
}

#[derive(Debug, Clone)]
pub(crate) enum FakePlaybackResponse {
    Playing(PlaybackSnapshot),
    NothingPlaying,
    Unavailable,
}

#[derive(Debug)]
pub(crate) struct FakePlayer {
    pub(crate) devices: Mutex<Vec<Device>>,
    playback_responses: Mutex<VecDeque<FakePlaybackResponse>>,
    pub(crate) calls: Mutex<Vec<PlayerCall>>,
    pub(crate) device_calls: AtomicUsize,
}

impl FakePlayer {
    pub(crate) fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            devices: Mutex::new(devices),
            playback_responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            device_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push_playback(&self, response: FakePlaybackResponse) {
        self.playback_responses
            .lock()
            .expect("playback lock poisoned")
            .push_back(response);
    }

    pub(crate) fn recorded(&self) -> Vec<PlayerCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub(crate) fn play_count(&self) -> usize {
        self.recorded()
            .iter()
            .filter(|call| matches!(call, PlayerCall::Play { .. }))
            .count()
    }

    pub(crate) fn pause_count(&self) -> usize {
        self.recorded()
            .iter()
            .filter(|call| matches!(call, PlayerCall::Pause { .. }))
            .count()
    }
}

impl Default for FakePlayer {
    fn default() -> Self {
        Self::with_devices(vec![device("desk", true)])
    }
}

#[async_trait]
impl PlayerApi for FakePlayer {
    async fn devices(&self, _access_token: &str) -> Result<Vec<Device>, InfraError> {
        self.device_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.devices.lock().expect("devices lock poisoned").clone())
    }

    async fn currently_playing(
        &self,
        _access_token: &str,
    ) -> Result<Option<PlaybackSnapshot>, InfraError> {
        let response = self
            .playback_responses
            .lock()
            .expect("playback lock poisoned")
            .pop_front()
            .unwrap_or(FakePlaybackResponse::NothingPlaying);
        match response {
            FakePlaybackResponse::Playing(snapshot) => Ok(Some(snapshot)),
            FakePlaybackResponse::NothingPlaying => Ok(None),
            FakePlaybackResponse::Unavailable => Err(InfraError::Upstream {
                status: 503,
                message: "Service unavailable".to_string(),
            }),
        }
    }

    async fn play(
        &self,
        _access_token: &str,
        device_id: &str,
        request: &PlayRequest,
    ) -> Result<(), InfraError> {
        self.calls.lock().expect("calls lock poisoned").push(PlayerCall::Play {
            device_id: device_id.to_string(),
            context_uri: request.context_uri.clone(),
        });
        Ok(())
    }

    async fn pause(&self, _access_token: &str, device_id: &str) -> Result<(), InfraError> {
        self.calls.lock().expect("calls lock poisoned").push(PlayerCall::Pause {
            device_id: device_id.to_string(),
        });
        Ok(())
    }
}
