//! Gateway configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SESSION_FILE: &str = ".rentals-session.json";
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_AUTHENTICATED_PATH: &str = "/dashboard";
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 100;
pub const DEFAULT_EXPIRY_CHECK_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Timing and navigation settings shared by every guard instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSettings {
    pub login_path: String,
    pub default_path: String,
    pub redirect_delay: Duration,
    pub expiry_check_interval: Duration,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            default_path: DEFAULT_AUTHENTICATED_PATH.to_owned(),
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
            expiry_check_interval: Duration::from_secs(DEFAULT_EXPIRY_CHECK_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub port: u16,
    /// Origin every `/api/proxy/*` call is forwarded to, without trailing slash.
    pub upstream_base_url: String,
    /// Origin hosting `/api/auth/verify`, without trailing slash.
    pub auth_api_base_url: String,
    pub session_file: PathBuf,
    pub cors_permissive: bool,
    pub guard: GuardSettings,
}

impl GatewayConfig {
    /// Build typed gateway config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `UPSTREAM_BASE_URL`: default `http://localhost:8080`
    /// - `AUTH_API_BASE_URL`: defaults to the upstream origin
    /// - `SESSION_FILE`: default `.rentals-session.json`
    /// - `CORS_PERMISSIVE`: default true
    /// - `GUARD_LOGIN_PATH`: default `/login`
    /// - `GUARD_DEFAULT_PATH`: default `/dashboard`
    /// - `GUARD_REDIRECT_DELAY_MS`: default 100
    /// - `GUARD_EXPIRY_CHECK_SECS`: default 60
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is set but not a valid port, or if a base
    /// URL is not an `http(s)` origin.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid { var: "PORT", reason: e.to_string() })?,
            Err(_) => DEFAULT_PORT,
        };

        let upstream_base_url = normalize_origin(
            "UPSTREAM_BASE_URL",
            &std::env::var("UPSTREAM_BASE_URL").unwrap_or_else(|_| DEFAULT_UPSTREAM_BASE_URL.to_owned()),
        )?;
        let auth_api_base_url = match std::env::var("AUTH_API_BASE_URL") {
            Ok(raw) => normalize_origin("AUTH_API_BASE_URL", &raw)?,
            Err(_) => upstream_base_url.clone(),
        };

        let session_file = std::env::var("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));

        let guard = GuardSettings {
            login_path: std::env::var("GUARD_LOGIN_PATH").unwrap_or_else(|_| DEFAULT_LOGIN_PATH.to_owned()),
            default_path: std::env::var("GUARD_DEFAULT_PATH").unwrap_or_else(|_| DEFAULT_AUTHENTICATED_PATH.to_owned()),
            redirect_delay: Duration::from_millis(env_parse("GUARD_REDIRECT_DELAY_MS", DEFAULT_REDIRECT_DELAY_MS)),
            expiry_check_interval: Duration::from_secs(env_parse("GUARD_EXPIRY_CHECK_SECS", DEFAULT_EXPIRY_CHECK_SECS)),
        };

        Ok(Self {
            port,
            upstream_base_url,
            auth_api_base_url,
            session_file,
            cors_permissive: env_bool("CORS_PERMISSIVE").unwrap_or(true),
            guard,
        })
    }
}

fn normalize_origin(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid { var, reason: format!("expected an http(s) origin, got '{raw}'") });
    }
    Ok(trimmed.to_owned())
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
