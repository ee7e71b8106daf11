use crate::application::accounts::AccountService;
use crate::application::catalog::PlaylistCatalog;
use crate::application::endpoint::{EndpointChoice, EndpointResolver};
use crate::application::playback::PlaybackClient;
use crate::application::progress::ProgressSynchronizer;
use crate::application::session::SessionEngine;
use crate::infrastructure::backend_client::ReqwestBackendClient;
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::health_probe::ReqwestHealthProbe;
use crate::infrastructure::spotify_player_client::ReqwestPlayerClient;
use std::sync::Arc;
use tracing::info;

pub type LivePlaybackClient = PlaybackClient<ReqwestBackendClient, ReqwestPlayerClient>;
pub type LiveSessionEngine = SessionEngine<ReqwestBackendClient, ReqwestPlayerClient>;
pub type LiveProgressSynchronizer = ProgressSynchronizer<ReqwestBackendClient, ReqwestPlayerClient>;

/// Every service wired against one resolved backend base URL.
pub struct ClientServices {
    pub config: ClientConfig,
    pub endpoint: EndpointChoice,
    pub accounts: AccountService<ReqwestBackendClient>,
    pub catalog: PlaylistCatalog<ReqwestBackendClient>,
    pub playback: Arc<LivePlaybackClient>,
    pub progress: Arc<LiveProgressSynchronizer>,
}

impl ClientServices {
    /// Session engine whose stop also halts the shared progress increment.
    pub fn session_engine(&self) -> LiveSessionEngine {
        SessionEngine::new(Arc::clone(&self.playback)).with_progress(Arc::clone(&self.progress))
    }
}

/// Probes the preferred backend once (bounded by the probe timeout), then
/// builds the clients with whichever base URL won.
pub async fn bootstrap_services(
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
) -> Result<ClientServices, InfraError> {
    let probe = Arc::new(ReqwestHealthProbe::new(config.probe_timeout)?);
    let resolver = EndpointResolver::new(
        probe,
        config.default_api_base.clone(),
        config.preferred_api_base.clone(),
        config.probe_timeout,
    );
    let endpoint = resolver.resolve().await;
    info!(
        base_url = %endpoint.base_url(),
        preferred = endpoint.is_preferred(),
        "backend endpoint resolved"
    );
    build_services(config, endpoint, credentials)
}

pub fn build_services(
    config: ClientConfig,
    endpoint: EndpointChoice,
    credentials: Arc<dyn CredentialStore>,
) -> Result<ClientServices, InfraError> {
    let backend = Arc::new(ReqwestBackendClient::new(
        endpoint.base_url().clone(),
        config.request_timeout,
    )?);
    let player = Arc::new(ReqwestPlayerClient::new(
        config.player_api_base.clone(),
        config.request_timeout,
    )?);

    let playback = Arc::new(PlaybackClient::new(
        Arc::clone(&backend),
        player,
        Arc::clone(&credentials),
    ));
    let progress = Arc::new(ProgressSynchronizer::new(Arc::clone(&playback)));

    Ok(ClientServices {
        accounts: AccountService::new(Arc::clone(&backend), Arc::clone(&credentials)),
        catalog: PlaylistCatalog::new(backend, credentials),
        playback,
        progress,
        endpoint,
        config,
    })
}
