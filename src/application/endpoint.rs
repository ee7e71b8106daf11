use crate::infrastructure::health_probe::HealthProbe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use url::Url;

/// Outcome of the one-time liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointChoice {
    /// The preferred endpoint answered `200`.
    Preferred(Url),
    /// Probe failed, timed out or answered anything but `200`.
    Default(Url),
}

impl EndpointChoice {
    pub fn base_url(&self) -> &Url {
        match self {
            Self::Preferred(url) | Self::Default(url) => url,
        }
    }

    pub fn is_preferred(&self) -> bool {
        matches!(self, Self::Preferred(_))
    }
}

pub struct EndpointResolver<P>
where
    P: HealthProbe,
{
    probe: Arc<P>,
    default_base: Url,
    preferred_base: Url,
    probe_timeout: Duration,
    choice: OnceCell<EndpointChoice>,
}

impl<P> EndpointResolver<P>
where
    P: HealthProbe,
{
    pub fn new(probe: Arc<P>, default_base: Url, preferred_base: Url, probe_timeout: Duration) -> Self {
        Self {
            probe,
            default_base,
            preferred_base,
            probe_timeout,
            choice: OnceCell::new(),
        }
    }

    /// Probes at most once per resolver; concurrent callers share the
    /// in-flight probe. Never fails.
    pub async fn resolve(&self) -> EndpointChoice {
        self.choice
            .get_or_init(|| self.probe_preferred())
            .await
            .clone()
    }

    /// Whatever is known right now, without waiting on the probe.
    pub fn current(&self) -> Url {
        self.choice
            .get()
            .map(|choice| choice.base_url().clone())
            .unwrap_or_else(|| self.default_base.clone())
    }

    async fn probe_preferred(&self) -> EndpointChoice {
        let outcome = tokio::time::timeout(self.probe_timeout, self.probe.check(&self.preferred_base)).await;

        match outcome {
            Ok(Ok(200)) => {
                info!(base_url = %self.preferred_base, "preferred backend healthy");
                EndpointChoice::Preferred(self.preferred_base.clone())
            }
            Ok(Ok(status)) => {
                warn!(status, base_url = %self.default_base, "healthcheck not ok; using default backend");
                EndpointChoice::Default(self.default_base.clone())
            }
            Ok(Err(error)) => {
                warn!(%error, base_url = %self.default_base, "healthcheck failed; using default backend");
                EndpointChoice::Default(self.default_base.clone())
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    base_url = %self.default_base,
                    "healthcheck timed out; using default backend"
                );
                EndpointChoice::Default(self.default_base.clone())
            }
        }
    }
}
