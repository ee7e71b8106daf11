use crate::domain::models::SessionCredentials;
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://python-hello-world-911611650068.europe-west3.run.app/";
pub const PREFERRED_API_BASE: &str = "https://api-sync-branch.yggbranch.dev/";
pub const DEFAULT_PLAYER_API_BASE: &str = "https://api.spotify.com/v1/";

const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const CONFIG_SCHEMA: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Used unless the preferred endpoint passes its health probe.
    pub default_api_base: Url,
    pub preferred_api_base: Url,
    pub player_api_base: Url,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Built-in endpoints and timings, before any file or environment override.
    pub fn builtin() -> Result<Self, InfraError> {
        Ok(Self {
            default_api_base: parse_base_url(DEFAULT_API_BASE, "built-in defaultApiBase")?,
            preferred_api_base: parse_base_url(PREFERRED_API_BASE, "built-in preferredApiBase")?,
            player_api_base: parse_base_url(DEFAULT_PLAYER_API_BASE, "built-in playerApiBase")?,
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    schema: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preferred_api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    player_api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    probe_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    poll_interval_ms: Option<u64>,
}

/// Writes the default config file unless one already exists. Returns whether
/// a file was written.
pub fn write_default_config(path: &Path) -> Result<bool, InfraError> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let defaults = ConfigFile {
        schema: CONFIG_SCHEMA,
        default_api_base: Some(DEFAULT_API_BASE.to_string()),
        preferred_api_base: Some(PREFERRED_API_BASE.to_string()),
        player_api_base: Some(DEFAULT_PLAYER_API_BASE.to_string()),
        probe_timeout_ms: Some(DEFAULT_PROBE_TIMEOUT_MS),
        request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
        poll_interval_ms: Some(DEFAULT_POLL_INTERVAL_MS),
    };
    let formatted = serde_json::to_string_pretty(&defaults)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(true)
}

fn read_config(path: &Path) -> Result<ConfigFile, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != CONFIG_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(serde_json::from_value(parsed)?)
}

pub fn load_client_config_from_env(path: Option<&Path>) -> Result<ClientConfig, InfraError> {
    load_client_config(path, |key| std::env::var(key).ok())
}

/// Defaults, then the optional file, then environment lookups.
pub fn load_client_config<F>(path: Option<&Path>, lookup: F) -> Result<ClientConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::builtin()?;

    if let Some(path) = path {
        let file = read_config(path)?;
        if let Some(raw) = file.default_api_base.as_deref() {
            config.default_api_base = parse_base_url(raw, "defaultApiBase")?;
        }
        if let Some(raw) = file.preferred_api_base.as_deref() {
            config.preferred_api_base = parse_base_url(raw, "preferredApiBase")?;
        }
        if let Some(raw) = file.player_api_base.as_deref() {
            config.player_api_base = parse_base_url(raw, "playerApiBase")?;
        }
        if let Some(ms) = file.probe_timeout_ms {
            config.probe_timeout = positive_millis(ms, "probeTimeoutMs")?;
        }
        if let Some(ms) = file.request_timeout_ms {
            config.request_timeout = positive_millis(ms, "requestTimeoutMs")?;
        }
        if let Some(ms) = file.poll_interval_ms {
            config.poll_interval = positive_millis(ms, "pollIntervalMs")?;
        }
    }

    if let Some(raw) = optional_lookup_value(&lookup, &["POMOTUNE_DEFAULT_API"]) {
        config.default_api_base = parse_base_url(&raw, "POMOTUNE_DEFAULT_API")?;
    }
    if let Some(raw) = optional_lookup_value(&lookup, &["POMOTUNE_PREFERRED_API"]) {
        config.preferred_api_base = parse_base_url(&raw, "POMOTUNE_PREFERRED_API")?;
    }
    if let Some(raw) = optional_lookup_value(&lookup, &["POMOTUNE_PLAYER_API"]) {
        config.player_api_base = parse_base_url(&raw, "POMOTUNE_PLAYER_API")?;
    }
    if let Some(raw) = optional_lookup_value(&lookup, &["POMOTUNE_PROBE_TIMEOUT_MS"]) {
        config.probe_timeout = parse_millis(&raw, "POMOTUNE_PROBE_TIMEOUT_MS")?;
    }
    if let Some(raw) = optional_lookup_value(&lookup, &["POMOTUNE_REQUEST_TIMEOUT_MS"]) {
        config.request_timeout = parse_millis(&raw, "POMOTUNE_REQUEST_TIMEOUT_MS")?;
    }
    if let Some(raw) = optional_lookup_value(&lookup, &["POMOTUNE_POLL_INTERVAL_MS"]) {
        config.poll_interval = parse_millis(&raw, "POMOTUNE_POLL_INTERVAL_MS")?;
    }

    Ok(config)
}

pub fn load_credentials_from_env() -> Result<SessionCredentials, InfraError> {
    load_credentials_from_lookup(|key| std::env::var(key).ok())
}

pub fn load_credentials_from_lookup<F>(lookup: F) -> Result<SessionCredentials, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let user_email = required_lookup_value(&lookup, &["POMOTUNE_USER_EMAIL"], "user email")?;
    let bearer_token = optional_lookup_value(&lookup, &["POMOTUNE_BEARER_TOKEN"]);
    Ok(SessionCredentials {
        user_email,
        bearer_token,
    })
}

/// Relative joins drop the last path segment unless the base ends with `/`.
pub fn parse_base_url(raw: &str, field_name: &str) -> Result<Url, InfraError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&normalized)
        .map_err(|error| InfraError::InvalidConfig(format!("{field_name} is not a valid URL: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InfraError::InvalidConfig(format!(
            "{field_name} must use http or https"
        )));
    }
    Ok(url)
}

fn parse_millis(raw: &str, field_name: &str) -> Result<Duration, InfraError> {
    let ms = raw.trim().parse::<u64>().map_err(|_| {
        InfraError::InvalidConfig(format!("{field_name} must be a whole number of milliseconds"))
    })?;
    positive_millis(ms, field_name)
}

fn positive_millis(ms: u64, field_name: &str) -> Result<Duration, InfraError> {
    if ms == 0 {
        return Err(InfraError::InvalidConfig(format!("{field_name} must be > 0")));
    }
    Ok(Duration::from_millis(ms))
}

fn required_lookup_value<F>(
    lookup: &F,
    keys: &[&str],
    field_name: &str,
) -> Result<String, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_lookup_value(lookup, keys).ok_or_else(|| {
        InfraError::InvalidConfig(format!(
            "missing {} (set one of: {})",
            field_name,
            keys.join(", ")
        ))
    })
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "pomotune-config-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp directory");
            Self { path }
        }

        fn file(&self, name: &str) -> PathBuf {
            self.path.join(name)
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = load_client_config(None, |_| None).expect("load config");
        assert_eq!(config, ClientConfig::builtin().expect("built-in config"));
        assert_eq!(config.default_api_base.as_str(), DEFAULT_API_BASE);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn builtin_endpoints_parse_as_joinable_bases() {
        let config = ClientConfig::builtin().expect("built-in config");
        assert_eq!(config.preferred_api_base.as_str(), PREFERRED_API_BASE);
        assert_eq!(config.player_api_base.as_str(), DEFAULT_PLAYER_API_BASE);
        assert_eq!(
            config.player_api_base.join("me/player").expect("join").as_str(),
            "https://api.spotify.com/v1/me/player"
        );
    }

    #[test]
    fn env_overrides_file_and_base_urls_gain_trailing_slash() {
        let temp = TempConfigDir::new();
        let path = temp.file("client.json");
        fs::write(
            &path,
            r#"{"schema": 1, "defaultApiBase": "https://file.example/api", "pollIntervalMs": 2500}"#,
        )
        .expect("write config");

        let config = load_client_config(Some(&path), |key| match key {
            "POMOTUNE_PREFERRED_API" => Some("http://localhost:5000".to_string()),
            _ => None,
        })
        .expect("load config");

        assert_eq!(config.default_api_base.as_str(), "https://file.example/api/");
        assert_eq!(config.preferred_api_base.as_str(), "http://localhost:5000/");
        assert_eq!(config.poll_interval, Duration::from_millis(2500));
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let temp = TempConfigDir::new();
        let path = temp.file("client.json");
        fs::write(&path, r#"{"schema": 2}"#).expect("write config");

        match load_client_config(Some(&path), |_| None) {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("schema")),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn write_default_config_does_not_overwrite() {
        let temp = TempConfigDir::new();
        let path = temp.file("nested/client.json");

        assert!(write_default_config(&path).expect("first write"));
        assert!(!write_default_config(&path).expect("second write"));
        let config = load_client_config(Some(&path), |_| None).expect("load written config");
        assert_eq!(config, ClientConfig::builtin().expect("built-in config"));
    }

    #[test]
    fn zero_and_garbage_millis_are_rejected() {
        let zero = load_client_config(None, |key| {
            (key == "POMOTUNE_PROBE_TIMEOUT_MS").then(|| "0".to_string())
        });
        let garbage = load_client_config(None, |key| {
            (key == "POMOTUNE_POLL_INTERVAL_MS").then(|| "soon".to_string())
        });
        assert!(matches!(zero, Err(InfraError::InvalidConfig(_))));
        assert!(matches!(garbage, Err(InfraError::InvalidConfig(_))));
    }

    #[test]
    fn non_http_base_is_rejected() {
        assert!(parse_base_url("ftp://example.com", "x").is_err());
    }

    #[test]
    fn credentials_require_user_email() {
        let result = load_credentials_from_lookup(|key| match key {
            "POMOTUNE_BEARER_TOKEN" => Some("jwt".to_string()),
            _ => None,
        });
        match result {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("user email")),
            other => panic!("expected invalid config, got {other:?}"),
        }

        let credentials = load_credentials_from_lookup(|key| match key {
            "POMOTUNE_USER_EMAIL" => Some(" me@example.com ".to_string()),
            _ => None,
        })
        .expect("credentials");
        assert_eq!(credentials.user_email, "me@example.com");
        assert_eq!(credentials.bearer_token, None);
    }
}
