use crate::domain::models::{AppBinding, LinkStatus, Provider, SessionCredentials};
use crate::infrastructure::backend_client::BackendApi;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use std::sync::Arc;
use tracing::info;

pub struct AccountService<B>
where
    B: BackendApi,
{
    backend: Arc<B>,
    credentials: Arc<dyn CredentialStore>,
}

impl<B> AccountService<B>
where
    B: BackendApi,
{
    pub fn new(backend: Arc<B>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            backend,
            credentials,
        }
    }

    /// Signs in and keeps the returned identity for later calls.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionCredentials, InfraError> {
        let credentials = self.backend.login(email, password).await?;
        self.credentials.save(&credentials)?;
        info!(user_email = %credentials.user_email, "signed in");
        Ok(credentials)
    }

    pub fn sign_out(&self) -> Result<(), InfraError> {
        self.credentials.clear()
    }

    pub async fn check_linked(&self, provider: Provider) -> Result<LinkStatus, InfraError> {
        let credentials = self.credentials.require()?;
        self.backend.check_linked_app(&credentials, provider).await
    }

    /// Backend's confirmation text, or `"<App> unlinked"` when it sends none.
    pub async fn unlink(&self, provider: Provider) -> Result<String, InfraError> {
        let credentials = self.credentials.require()?;
        let message = self
            .backend
            .unlink_app(&credentials, provider)
            .await?
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| format!("{} unlinked", provider.display_name()));
        info!(provider = %provider, "app unlinked");
        Ok(message)
    }

    pub async fn bindings(&self) -> Result<Vec<AppBinding>, InfraError> {
        let credentials = self.credentials.require()?;
        self.backend.app_bindings(&credentials).await
    }
}
