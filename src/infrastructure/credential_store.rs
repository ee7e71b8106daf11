use crate::domain::models::SessionCredentials;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

/// Holds the signed-in user's identity for the lifetime of the process.
pub trait CredentialStore: Send + Sync {
    fn save(&self, credentials: &SessionCredentials) -> Result<(), InfraError>;
    fn load(&self) -> Result<Option<SessionCredentials>, InfraError>;
    fn clear(&self) -> Result<(), InfraError>;

    fn require(&self) -> Result<SessionCredentials, InfraError> {
        self.load()?
            .ok_or_else(|| InfraError::Auth("not signed in; no session credentials".to_string()))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: Mutex<Option<SessionCredentials>>,
}

impl InMemoryCredentialStore {
    pub fn with_credentials(credentials: SessionCredentials) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn save(&self, credentials: &SessionCredentials) -> Result<(), InfraError> {
        credentials.validate().map_err(InfraError::Auth)?;
        let mut guard = self
            .credentials
            .lock()
            .map_err(|error| InfraError::Auth(format!("credential lock poisoned: {error}")))?;
        *guard = Some(credentials.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionCredentials>, InfraError> {
        let guard = self
            .credentials
            .lock()
            .map_err(|error| InfraError::Auth(format!("credential lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn clear(&self) -> Result<(), InfraError> {
        let mut guard = self
            .credentials
            .lock()
            .map_err(|error| InfraError::Auth(format!("credential lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}
