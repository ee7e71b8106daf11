use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("upstream error: http {status}; {message}")]
    Upstream { status: u16, message: String },
    #[error("no playback device available; open the player on a device first")]
    NoDeviceAvailable,
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),
}

impl InfraError {
    /// Only auth failures can be fixed by re-linking the account.
    pub fn is_recoverable_by_relink(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkUnreachable(_) | Self::Upstream { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_upstream_are_classified_differently() {
        let auth = InfraError::Auth("token exchange rejected".to_string());
        let upstream = InfraError::Upstream {
            status: 502,
            message: "bad gateway".to_string(),
        };

        assert!(auth.is_recoverable_by_relink());
        assert!(!auth.is_transient());
        assert!(upstream.is_transient());
        assert!(!upstream.is_recoverable_by_relink());
        assert!(!InfraError::NoDeviceAvailable.is_transient());
    }
}
