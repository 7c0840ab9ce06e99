//! Client configuration shared by the engine builder and the bundled
//! transport.

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_USER_AGENT: &str = concat!("exchange-core/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Sent as the default `User-Agent` header.
    pub user_agent: String,
    /// Whole-request timeout enforced by the transport.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Responses larger than this are rejected by the transport.
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_response_size: 10 * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `EXCHANGE_USER_AGENT`, `EXCHANGE_TIMEOUT_SECS`,
    /// `EXCHANGE_CONNECT_TIMEOUT_SECS` and `EXCHANGE_MAX_RESPONSE_SIZE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(agent) = lookup("EXCHANGE_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            config.user_agent = agent;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "EXCHANGE_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "EXCHANGE_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = parse_var::<usize>(&lookup, "EXCHANGE_MAX_RESPONSE_SIZE") {
            config.max_response_size = size;
        }
        config
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_response_size, 10 * 1024 * 1024);
    }

    #[test]
    fn variables_override_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("EXCHANGE_USER_AGENT", "bot/1.0"),
            ("EXCHANGE_TIMEOUT_SECS", "5"),
            ("EXCHANGE_CONNECT_TIMEOUT_SECS", " 2 "),
            ("EXCHANGE_MAX_RESPONSE_SIZE", "1024"),
        ]));
        assert_eq!(config.user_agent, "bot/1.0");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.max_response_size, 1024);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("EXCHANGE_TIMEOUT_SECS", "soon"),
            ("EXCHANGE_USER_AGENT", "  "),
        ]));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }
}
