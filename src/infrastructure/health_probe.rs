use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use std::time::Duration;
use url::Url;

const HEALTHCHECK_PATH: &str = "healthcheck";

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Status code of `GET {base_url}healthcheck`.
    async fn check(&self, base_url: &Url) -> Result<u16, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestHealthProbe {
    client: Client,
}

impl ReqwestHealthProbe {
    pub fn new(timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| InfraError::InvalidConfig(format!("failed building probe client: {error}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for ReqwestHealthProbe {
    async fn check(&self, base_url: &Url) -> Result<u16, InfraError> {
        let endpoint = base_url
            .join(HEALTHCHECK_PATH)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid healthcheck url: {error}")))?;

        let response = self
            .client
            .get(endpoint)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|error| InfraError::NetworkUnreachable(format!("healthcheck failed: {error}")))?;

        Ok(response.status().as_u16())
    }
}
