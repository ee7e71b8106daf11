use crate::domain::models::{Playlist, Provider, SessionCredentials};
use crate::infrastructure::backend_client::BackendApi;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::provider_mapper::normalize_playlist_page;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const DEFAULT_ENRICHMENT_CONCURRENCY: usize = 4;

/// Loads a provider's playlists in the common shape. Spotify playlists are
/// enriched with the backend's duration/count lookup.
pub struct PlaylistCatalog<B>
where
    B: BackendApi,
{
    backend: Arc<B>,
    credentials: Arc<dyn CredentialStore>,
    enrichment_concurrency: usize,
}

impl<B> PlaylistCatalog<B>
where
    B: BackendApi + 'static,
{
    pub fn new(backend: Arc<B>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            backend,
            credentials,
            enrichment_concurrency: DEFAULT_ENRICHMENT_CONCURRENCY,
        }
    }

    pub fn with_enrichment_concurrency(mut self, concurrency: usize) -> Self {
        self.enrichment_concurrency = concurrency.max(1);
        self
    }

    pub async fn load(&self, provider: Provider) -> Result<Vec<Playlist>, InfraError> {
        let credentials = self.credentials.require()?;
        let raw = self.backend.playlists(&credentials, provider).await?;
        let playlists = normalize_playlist_page(&raw, provider);
        debug!(provider = %provider, count = playlists.len(), "playlists normalized");

        match provider {
            Provider::Spotify => Ok(self.enrich(&credentials, playlists).await),
            Provider::YouTube | Provider::Apple => Ok(playlists),
        }
    }

    /// Order is preserved; a failed lookup keeps the playlist as normalized.
    async fn enrich(&self, credentials: &SessionCredentials, playlists: Vec<Playlist>) -> Vec<Playlist> {
        let permits = Arc::new(Semaphore::new(self.enrichment_concurrency));
        let mut lookups = JoinSet::new();

        for (index, playlist) in playlists.iter().enumerate() {
            let backend = Arc::clone(&self.backend);
            let credentials = credentials.clone();
            let permits = Arc::clone(&permits);
            let playlist_id = playlist.playlist_id().to_string();
            lookups.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let details = backend.playlist_details(&credentials, &playlist_id).await;
                (index, playlist_id, details)
            });
        }

        let mut enriched: Vec<Option<Playlist>> = playlists.into_iter().map(Some).collect();
        while let Some(joined) = lookups.join_next().await {
            let (index, playlist_id, details) = match joined {
                Ok(result) => result,
                Err(error) => {
                    warn!(%error, "playlist detail task failed");
                    continue;
                }
            };
            match details {
                Ok(details) => {
                    if let Some(slot) = enriched.get_mut(index) {
                        *slot = slot.take().map(|playlist| playlist.with_details(&details));
                    }
                }
                Err(error) => {
                    warn!(%error, playlist_id = %playlist_id, "playlist detail lookup failed");
                }
            }
        }

        enriched.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{FakeBackend, signed_in_store};
    use crate::domain::models::PlaylistDetails;
    use crate::infrastructure::credential_store::InMemoryCredentialStore;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn catalog(backend: FakeBackend) -> (PlaylistCatalog<FakeBackend>, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        (PlaylistCatalog::new(Arc::clone(&backend), signed_in_store()), backend)
    }

    #[tokio::test]
    async fn spotify_playlists_are_enriched_in_order() {
        let backend = FakeBackend::default();
        *backend.playlists.lock().expect("playlists lock") = json!([
            {"playlist_name": "Focus", "playlist_id": "p1", "playlist_track_count": 12},
            {"playlist_name": "Deep", "playlist_id": "p2"},
            {"playlist_name": "Lofi", "playlist_id": "p3", "playlist_duration": "12 min"}
        ]);
        backend.details.lock().expect("details lock").extend([
            (
                "p1".to_string(),
                PlaylistDetails {
                    formatted_duration: Some("45:00".to_string()),
                    total_track_count: Some(14),
                },
            ),
            (
                "p2".to_string(),
                PlaylistDetails {
                    formatted_duration: Some(String::new()),
                    total_track_count: Some(3),
                },
            ),
        ]);
        let (catalog, backend) = catalog(backend);

        let playlists = catalog
            .with_enrichment_concurrency(2)
            .load(Provider::Spotify)
            .await
            .expect("load");

        let ids: Vec<&str> = playlists.iter().map(Playlist::playlist_id).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(playlists[0].playlist_duration(), "45:00");
        assert_eq!(playlists[0].playlist_track_count(), 14);
        assert_eq!(playlists[1].playlist_duration(), "0");
        assert_eq!(playlists[1].playlist_track_count(), 3);
        assert_eq!(playlists[2].playlist_duration(), "12 min");
        assert_eq!(backend.detail_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn apple_playlists_skip_enrichment() {
        let backend = FakeBackend::default();
        *backend.playlists.lock().expect("playlists lock") = json!({
            "data": [
                {"id": "pl.1", "attributes": {"name": "Chill", "artwork": {"url": "https://a/{w}x{h}.jpg"}}}
            ]
        });
        let (catalog, backend) = catalog(backend);

        let playlists = catalog.load(Provider::Apple).await.expect("load");

        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].provider_tag(), Provider::Apple);
        assert_eq!(playlists[0].playlist_image(), "https://a/200x200.jpg");
        assert_eq!(backend.detail_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn signed_out_load_is_auth_error() {
        let catalog = PlaylistCatalog::new(
            Arc::new(FakeBackend::default()),
            Arc::new(InMemoryCredentialStore::default()),
        );
        assert!(matches!(
            catalog.load(Provider::YouTube).await,
            Err(InfraError::Auth(_))
        ));
    }
}
