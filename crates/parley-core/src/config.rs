//! Client configuration.
//!
//! The backend address and transport choice are deployment settings. They come
//! from the environment (or the shell's flags), never from constants in the core.

use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

pub const ENV_API_BASE: &str = "PARLEY_API_BASE";
pub const ENV_TRANSPORT: &str = "PARLEY_TRANSPORT";
pub const ENV_ROUTE: &str = "PARLEY_ROUTE";
pub const ENV_TIMEOUT_SECS: &str = "PARLEY_TIMEOUT_SECS";

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// How replies reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// One HTTP call per outbound message.
    #[default]
    RequestResponse,
    /// HTTP for outbound, plus a receive-only WebSocket for pushed replies.
    Duplex,
}

impl std::str::FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "request-response" => Ok(TransportMode::RequestResponse),
            "duplex" | "ws" | "websocket" => Ok(TransportMode::Duplex),
            other => Err(ConfigError::UnknownTransport(other.to_string())),
        }
    }
}

/// Which outbound endpoints to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteStyle {
    /// `/main_query` for auto-routing, `/ask` for a pinned agent.
    #[default]
    Routed,
    /// `/tools/{agent}/run` per agent, as older backends expose.
    LegacyTool,
}

impl std::str::FromStr for RouteStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "routed" => Ok(RouteStyle::Routed),
            "legacy" | "legacy-tool" => Ok(RouteStyle::LegacyTool),
            other => Err(ConfigError::UnknownRouteStyle(other.to_string())),
        }
    }
}

/// Settings for the legacy per-tool endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyToolConfig {
    /// Agent used when no agent is pinned (the legacy endpoint can't auto-route).
    pub default_agent: String,
    pub command: String,
    /// Key under `params` that carries the user's text.
    pub param_key: String,
}

impl Default for LegacyToolConfig {
    fn default() -> Self {
        Self {
            default_agent: "healthcare_agent".to_string(),
            command: "suggest_advice".to_string(),
            param_key: "symptom".to_string(),
        }
    }
}

/// Everything the core needs to talk to one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    pub transport: TransportMode,
    pub route_style: RouteStyle,
    pub legacy: LegacyToolConfig,
    /// Health components whose key ends with this are selectable agents.
    pub agent_suffix: String,
    /// Health status value that marks a component usable.
    pub healthy_status: String,
    /// Applied by the HTTP client. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
    /// Send the session id as `conversation_id` on pinned-agent requests.
    pub share_conversation_id: bool,
}

impl ClientConfig {
    /// Build a config for the given backend address with defaults elsewhere.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            transport: TransportMode::default(),
            route_style: RouteStyle::default(),
            legacy: LegacyToolConfig::default(),
            agent_suffix: "_agent".to_string(),
            healthy_status: "healthy".to_string(),
            request_timeout: None,
            share_conversation_id: false,
        })
    }

    /// Read configuration from `PARLEY_*` environment variables.
    ///
    /// Unset or empty variables fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = env_var(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let mut config = Self::new(&base)?;

        if let Some(mode) = env_var(ENV_TRANSPORT) {
            config.transport = mode.parse()?;
        }
        if let Some(style) = env_var(ENV_ROUTE) {
            config.route_style = style.parse()?;
        }
        if let Some(secs) = env_var(ENV_TIMEOUT_SECS) {
            config.request_timeout = Some(parse_timeout(&secs)?);
        }

        Ok(config)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an endpoint path relative to the base.
    pub fn endpoint_url(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    /// WebSocket address for the duplex channel.
    pub fn ws_url(&self) -> String {
        let http = self.endpoint_url("ws");
        if let Some(rest) = http.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = http.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            http
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

/// Parse a timeout in whole seconds. Zero is rejected.
pub fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidTimeout(raw.to_string())),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 4] = [ENV_API_BASE, ENV_TRANSPORT, ENV_ROUTE, ENV_TIMEOUT_SECS];

    fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let prev: Vec<(&str, Option<String>)> =
            ALL_VARS.iter().map(|k| (*k, env::var(k).ok())).collect();

        for key in ALL_VARS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }

        f();

        for (key, value) in prev {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }

    mod from_env {
        use super::*;

        #[test]
        fn defaults_when_unset() {
            with_env(&[], || {
                let config = ClientConfig::from_env().expect("config");
                assert_eq!(config.base_url().as_str(), "http://localhost:8000/");
                assert_eq!(config.transport, TransportMode::RequestResponse);
                assert_eq!(config.route_style, RouteStyle::Routed);
                assert_eq!(config.request_timeout, None);
            });
        }

        #[test]
        fn reads_overrides() {
            with_env(
                &[
                    (ENV_API_BASE, "https://agents.example.com/api"),
                    (ENV_TRANSPORT, "duplex"),
                    (ENV_ROUTE, "legacy"),
                    (ENV_TIMEOUT_SECS, "30"),
                ],
                || {
                    let config = ClientConfig::from_env().expect("config");
                    assert_eq!(config.transport, TransportMode::Duplex);
                    assert_eq!(config.route_style, RouteStyle::LegacyTool);
                    assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
                    assert_eq!(
                        config.endpoint_url("main_query"),
                        "https://agents.example.com/api/main_query"
                    );
                },
            );
        }

        #[test]
        fn empty_values_fall_back() {
            with_env(&[(ENV_API_BASE, "  "), (ENV_TRANSPORT, "")], || {
                let config = ClientConfig::from_env().expect("config");
                assert_eq!(config.base_url().as_str(), "http://localhost:8000/");
                assert_eq!(config.transport, TransportMode::RequestResponse);
            });
        }

        #[test]
        fn rejects_unknown_transport() {
            with_env(&[(ENV_TRANSPORT, "carrier-pigeon")], || {
                let err = ClientConfig::from_env().unwrap_err();
                assert_eq!(err, ConfigError::UnknownTransport("carrier-pigeon".to_string()));
            });
        }
    }

    mod urls {
        use super::*;

        #[test]
        fn endpoint_url_joins_without_double_slash() {
            let config = ClientConfig::new("http://localhost:5000/").unwrap();
            assert_eq!(config.endpoint_url("/ask"), "http://localhost:5000/ask");
            assert_eq!(
                config.endpoint_url("tools/law_agent/run"),
                "http://localhost:5000/tools/law_agent/run"
            );
        }

        #[test]
        fn ws_url_maps_scheme() {
            let plain = ClientConfig::new("http://localhost:5000").unwrap();
            assert_eq!(plain.ws_url(), "ws://localhost:5000/ws");

            let tls = ClientConfig::new("https://example.com/base").unwrap();
            assert_eq!(tls.ws_url(), "wss://example.com/base/ws");
        }

        #[test]
        fn rejects_non_http_scheme() {
            let err = ClientConfig::new("ftp://example.com").unwrap_err();
            assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
        }

        #[test]
        fn rejects_garbage() {
            assert!(ClientConfig::new("not a url").is_err());
        }
    }

    #[test]
    fn timeout_must_be_positive() {
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("abc").is_err());
        assert_eq!(parse_timeout(" 5 ").unwrap(), Duration::from_secs(5));
    }
}
