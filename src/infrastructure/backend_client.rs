use crate::domain::models::{AppBinding, LinkStatus, PlaylistDetails, Provider, SessionCredentials};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const LOGIN_PATH: &str = "auth/login";
const PLAYBACK_TOKEN_PATH: &str = "spotify/token";
const CHECK_LINKED_APP_PATH: &str = "apps/check_linked_app";
const UNLINK_APP_PATH: &str = "apps/unlink_app";
const APP_BINDINGS_PATH: &str = "apps/get_all_apps_binding";
const PLAYLIST_DURATION_PATH: &str = "spotify-micro-service/playlist_duration";

/// REST contract of the backend service. Every call goes to the base URL the
/// client was built with.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<SessionCredentials, InfraError>;

    /// Short-lived playback-provider token. Never cache it past one operation.
    async fn playback_token(&self, credentials: &SessionCredentials) -> Result<String, InfraError>;

    async fn check_linked_app(
        &self,
        credentials: &SessionCredentials,
        provider: Provider,
    ) -> Result<LinkStatus, InfraError>;

    async fn unlink_app(
        &self,
        credentials: &SessionCredentials,
        provider: Provider,
    ) -> Result<Option<String>, InfraError>;

    async fn app_bindings(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<Vec<AppBinding>, InfraError>;

    /// Raw provider-shaped playlist listing.
    async fn playlists(
        &self,
        credentials: &SessionCredentials,
        provider: Provider,
    ) -> Result<serde_json::Value, InfraError>;

    async fn playlist_details(
        &self,
        credentials: &SessionCredentials,
        playlist_id: &str,
    ) -> Result<PlaylistDetails, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackendClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct UserRequest<'a> {
    user_email: &'a str,
}

#[derive(Debug, Serialize)]
struct AppRequest<'a> {
    app_name: &'a str,
    user_email: &'a str,
}

#[derive(Debug, Serialize)]
struct PlaylistDetailsRequest<'a> {
    playlist_id: &'a str,
    user_email: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct LoginResponsePayload {
    access_token: Option<String>,
    user_id: Option<String>,
    error: Option<serde_json::Value>,
    message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponsePayload {
    token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct MessagePayload {
    message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct BindingsPayload {
    #[serde(default)]
    apps: Vec<BindingEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct BindingEntry {
    app_name: String,
    #[serde(default)]
    user_linked: bool,
    #[serde(default)]
    user_profile: Option<serde_json::Value>,
}

impl ReqwestBackendClient {
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|error| InfraError::InvalidConfig(format!("failed building http client: {error}")))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, InfraError> {
        self.base_url
            .join(path)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid backend url for {path}: {error}")))
    }

    async fn post_json<B>(
        &self,
        path: &str,
        credentials: Option<&SessionCredentials>,
        body: &B,
    ) -> Result<(StatusCode, String), InfraError>
    where
        B: Serialize + Sync,
    {
        let endpoint = self.endpoint(path)?;
        let mut request = self.client.post(endpoint).json(body);
        if let Some(token) = credentials.and_then(|credentials| credentials.bearer_token.as_deref()) {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| InfraError::NetworkUnreachable(format!("POST {path} failed: {error}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::NetworkUnreachable(format!("failed reading {path} response: {error}"))
        })?;
        debug!(path, status = status.as_u16(), "backend response");
        Ok((status, body))
    }

    fn http_error(path: &str, status: StatusCode, body: &str) -> InfraError {
        let detail = error_detail(body).unwrap_or_else(|| format!("http {}", status.as_u16()));
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return InfraError::Auth(format!("{path}: {detail}"));
        }
        InfraError::Upstream {
            status: status.as_u16(),
            message: format!("{path}: {detail}"),
        }
    }

    fn parse<T>(path: &str, body: &str) -> Result<T, InfraError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(body).map_err(|error| InfraError::Upstream {
            status: 200,
            message: format!("invalid {path} payload: {error}; body={body}"),
        })
    }
}

/// `{"error": "..."}` or `{"message": "..."}` from a backend error body.
fn error_detail(body: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"].into_iter().find_map(|key| match parsed.get(key)? {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    })
}

#[async_trait]
impl BackendApi for ReqwestBackendClient {
    async fn login(&self, email: &str, password: &str) -> Result<SessionCredentials, InfraError> {
        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(InfraError::Auth("email and password are required".to_string()));
        }

        let request = LoginRequest {
            email: email.trim(),
            password: password.trim(),
        };
        let (status, body) = self.post_json(LOGIN_PATH, None, &request).await?;
        let parsed = serde_json::from_str::<LoginResponsePayload>(&body).ok();

        let Some(parsed) = parsed.filter(|_| status.is_success()) else {
            let detail = error_detail(&body).unwrap_or_else(|| format!("http {}", status.as_u16()));
            return Err(InfraError::Auth(format!("login failed: {detail}")));
        };
        if parsed.error.as_ref().is_some_and(|error| !error.is_null() && error != &serde_json::Value::Bool(false)) {
            let detail = parsed.message.unwrap_or_else(|| "login failed".to_string());
            return Err(InfraError::Auth(detail));
        }

        let bearer_token = parsed
            .access_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| InfraError::Auth("login response did not include access_token".to_string()))?;
        let user_email = parsed
            .user_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| email.trim().to_string());

        Ok(SessionCredentials {
            user_email,
            bearer_token: Some(bearer_token),
        })
    }

    async fn playback_token(&self, credentials: &SessionCredentials) -> Result<String, InfraError> {
        let request = UserRequest {
            user_email: &credentials.user_email,
        };
        let (status, body) = self
            .post_json(PLAYBACK_TOKEN_PATH, Some(credentials), &request)
            .await?;

        if !status.is_success() {
            let detail = error_detail(&body)
                .unwrap_or_else(|| format!("token fetch failed ({})", status.as_u16()));
            return Err(InfraError::Auth(detail));
        }

        serde_json::from_str::<TokenResponsePayload>(&body)
            .ok()
            .and_then(|payload| payload.token)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| InfraError::Auth("no token field in response".to_string()))
    }

    async fn check_linked_app(
        &self,
        credentials: &SessionCredentials,
        provider: Provider,
    ) -> Result<LinkStatus, InfraError> {
        let request = AppRequest {
            app_name: provider.backend_app_name(),
            user_email: &credentials.user_email,
        };
        let (status, body) = self
            .post_json(CHECK_LINKED_APP_PATH, Some(credentials), &request)
            .await?;
        if !status.is_success() {
            return Err(Self::http_error(CHECK_LINKED_APP_PATH, status, &body));
        }
        Self::parse(CHECK_LINKED_APP_PATH, &body)
    }

    async fn unlink_app(
        &self,
        credentials: &SessionCredentials,
        provider: Provider,
    ) -> Result<Option<String>, InfraError> {
        let request = AppRequest {
            app_name: provider.backend_app_name(),
            user_email: &credentials.user_email,
        };
        let (status, body) = self
            .post_json(UNLINK_APP_PATH, Some(credentials), &request)
            .await?;
        if !status.is_success() {
            return Err(Self::http_error(UNLINK_APP_PATH, status, &body));
        }
        Ok(serde_json::from_str::<MessagePayload>(&body)
            .ok()
            .and_then(|payload| payload.message))
    }

    async fn app_bindings(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<Vec<AppBinding>, InfraError> {
        let request = UserRequest {
            user_email: &credentials.user_email,
        };
        let (status, body) = self
            .post_json(APP_BINDINGS_PATH, Some(credentials), &request)
            .await?;
        if !status.is_success() {
            return Err(Self::http_error(APP_BINDINGS_PATH, status, &body));
        }

        let parsed: BindingsPayload = Self::parse(APP_BINDINGS_PATH, &body)?;
        Ok(parsed
            .apps
            .into_iter()
            .filter_map(|entry| {
                let provider = Provider::from_backend_app_name(&entry.app_name)?;
                Some(AppBinding {
                    provider,
                    user_linked: entry.user_linked,
                    user_profile: entry.user_profile.filter(|profile| !profile.is_null()),
                })
            })
            .collect())
    }

    async fn playlists(
        &self,
        credentials: &SessionCredentials,
        provider: Provider,
    ) -> Result<serde_json::Value, InfraError> {
        let path = provider.playlists_path();
        let request = UserRequest {
            user_email: &credentials.user_email,
        };
        let (status, body) = self.post_json(path, Some(credentials), &request).await?;
        if !status.is_success() {
            return Err(Self::http_error(path, status, &body));
        }
        Self::parse(path, &body)
    }

    async fn playlist_details(
        &self,
        credentials: &SessionCredentials,
        playlist_id: &str,
    ) -> Result<PlaylistDetails, InfraError> {
        let request = PlaylistDetailsRequest {
            playlist_id,
            user_email: &credentials.user_email,
        };
        let (status, body) = self
            .post_json(PLAYLIST_DURATION_PATH, Some(credentials), &request)
            .await?;
        if !status.is_success() {
            return Err(Self::http_error(PLAYLIST_DURATION_PATH, status, &body));
        }
        Self::parse(PLAYLIST_DURATION_PATH, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_reads_error_then_message() {
        assert_eq!(
            error_detail(r#"{"error": "User not found."}"#),
            Some("User not found.".to_string())
        );
        assert_eq!(
            error_detail(r#"{"error": null, "message": "expired"}"#),
            Some("expired".to_string())
        );
        assert_eq!(
            error_detail(r#"{"error": [{"loc": "user_email"}]}"#),
            Some(r#"[{"loc":"user_email"}]"#.to_string())
        );
        assert_eq!(error_detail("<html>502</html>"), None);
    }

    #[test]
    fn forbidden_maps_to_auth_and_server_errors_to_upstream() {
        let auth = ReqwestBackendClient::http_error("apps/unlink_app", StatusCode::FORBIDDEN, "");
        let upstream = ReqwestBackendClient::http_error(
            "spotify/playlists",
            StatusCode::BAD_REQUEST,
            r#"{"error": "An internal error occurred."}"#,
        );

        assert!(matches!(auth, InfraError::Auth(_)));
        match upstream {
            InfraError::Upstream { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("An internal error occurred."));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn endpoint_joins_relative_to_base_path() {
        let base = Url::parse("https://example.com/api/").expect("url");
        let client = ReqwestBackendClient::new(base, Duration::from_secs(1)).expect("client");
        assert_eq!(
            client.endpoint(PLAYLIST_DURATION_PATH).expect("endpoint").as_str(),
            "https://example.com/api/spotify-micro-service/playlist_duration"
        );
    }
}
