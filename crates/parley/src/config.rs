//! Client configuration.

use parley_session::{HistoryPolicy, SessionConfig};
use parley_transport::ReconnectConfig;

use crate::ParleyError;

/// Environment variable holding the server endpoint.
pub const ENV_URL: &str = "PARLEY_WS_URL";
/// Environment variable enabling reconnect (`1`, `true`, `yes`, `on`).
pub const ENV_RECONNECT: &str = "PARLEY_RECONNECT";
/// Environment variable selecting the history policy (`clear`, `preserve`).
pub const ENV_HISTORY: &str = "PARLEY_HISTORY";

/// Default server endpoint.
pub const DEFAULT_URL: &str = "ws://localhost:8080";

/// Everything needed to start a [`ChatClient`](crate::ChatClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `ws://` or `wss://` endpoint of the chat server.
    pub url: String,

    /// `None` (the default) means the first disconnect is final.
    pub reconnect: Option<ReconnectConfig>,

    pub session: SessionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reconnect: None,
            session: SessionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Builds a config from `PARLEY_WS_URL`, `PARLEY_RECONNECT` and
    /// `PARLEY_HISTORY`, falling back to defaults for unset variables.
    ///
    /// # Errors
    /// Returns [`ParleyError::Session`] if `PARLEY_HISTORY` names an unknown
    /// policy.
    pub fn from_env() -> Result<Self, ParleyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ParleyError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_URL).filter(|url| !url.trim().is_empty()) {
            config.url = url.trim().to_string();
        }

        if let Some(flag) = lookup(ENV_RECONNECT) {
            if is_truthy(&flag) {
                config.reconnect = Some(ReconnectConfig::default());
            }
        }

        if let Some(policy) = lookup(ENV_HISTORY) {
            config.session.history_policy = policy.parse::<HistoryPolicy>()?;
        }

        Ok(config)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
