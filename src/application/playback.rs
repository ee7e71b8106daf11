use crate::domain::models::{Device, PlaybackSnapshot};
use crate::infrastructure::backend_client::BackendApi;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::spotify_player_client::{PlayRequest, PlayerApi};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// The caller stopped caring before the request went out.
    Discarded,
}

/// Playback commands against the user's provider account. Every operation
/// fetches a fresh token from the backend first.
pub struct PlaybackClient<B, P>
where
    B: BackendApi,
    P: PlayerApi,
{
    backend: Arc<B>,
    player: Arc<P>,
    credentials: Arc<dyn CredentialStore>,
}

impl<B, P> PlaybackClient<B, P>
where
    B: BackendApi,
    P: PlayerApi,
{
    pub fn new(backend: Arc<B>, player: Arc<P>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            backend,
            player,
            credentials,
        }
    }

    pub async fn access_token(&self) -> Result<String, InfraError> {
        let credentials = self.credentials.require()?;
        self.backend.playback_token(&credentials).await
    }

    pub async fn list_devices(&self) -> Result<Vec<Device>, InfraError> {
        let token = self.access_token().await?;
        self.player.devices(&token).await
    }

    pub async fn play(&self, playlist_id: &str, device_id: Option<&str>) -> Result<(), InfraError> {
        self.play_when(playlist_id, device_id, || true).await?;
        Ok(())
    }

    /// Like [`play`](Self::play), but checks `still_relevant` right before the
    /// `PUT` and skips it when the answer is no.
    pub async fn play_when<F>(
        &self,
        playlist_id: &str,
        device_id: Option<&str>,
        still_relevant: F,
    ) -> Result<PlayOutcome, InfraError>
    where
        F: Fn() -> bool + Send + Sync,
    {
        let token = self.access_token().await?;
        let device_id = self.resolve_device(&token, device_id).await?;

        if !still_relevant() {
            debug!(playlist_id, "play discarded before request");
            return Ok(PlayOutcome::Discarded);
        }

        self.player
            .play(&token, &device_id, &PlayRequest::playlist(playlist_id))
            .await?;
        info!(playlist_id, device_id = %device_id, "playback started");
        Ok(PlayOutcome::Started)
    }

    pub async fn pause(&self, device_id: Option<&str>) -> Result<(), InfraError> {
        let token = self.access_token().await?;
        let device_id = self.resolve_device(&token, device_id).await?;
        self.player.pause(&token, &device_id).await?;
        info!(device_id = %device_id, "playback paused");
        Ok(())
    }

    pub async fn current_playback(&self) -> Result<Option<PlaybackSnapshot>, InfraError> {
        let token = self.access_token().await?;
        self.player.currently_playing(&token).await
    }

    async fn resolve_device(&self, token: &str, device_id: Option<&str>) -> Result<String, InfraError> {
        if let Some(device_id) = device_id.map(str::trim).filter(|id| !id.is_empty()) {
            return Ok(device_id.to_string());
        }
        let devices = self.player.devices(token).await?;
        select_device(&devices).ok_or(InfraError::NoDeviceAvailable)
    }
}

/// Active device first, else the first listed one. Devices without an id
/// cannot be targeted and are skipped.
pub fn select_device(devices: &[Device]) -> Option<String> {
    devices
        .iter()
        .filter(|device| device.is_active)
        .chain(devices.iter())
        .find_map(|device| device.id.clone().filter(|id| !id.is_empty()))
}
