use dashmap::DashMap;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// Key-value configuration, seeded from the process environment.
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigService")
            .field("keys", &self.config.len())
            .finish()
    }
}

impl ConfigService {
    /// A snapshot of the current environment variables.
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse the value under `key`. `None` when absent or unparseable.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        match self.get(key)?.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(key, "ignoring unparseable configuration value");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Listen address of the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Read `HOST` and `PORT`, falling back to `0.0.0.0:8080`.
    pub fn from_config(config: &ConfigService) -> Self {
        let defaults = Self::default();
        Self {
            host: config.get("HOST").unwrap_or(defaults.host),
            port: config.get_parsed("PORT").unwrap_or(defaults.port),
        }
    }

    pub fn from_env() -> Self {
        Self::from_config(&ConfigService::new())
    }

    /// `host:port`, suitable for [`HttpTransport::listen`](crate::HttpTransport::listen).
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The address as a socket address, when the host is an IP literal.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.addr().parse().ok()
    }
}
