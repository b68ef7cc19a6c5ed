//! Listener and logging configuration

use serde::Deserialize;
use std::net::SocketAddr;

use super::error::ValidationError;

/// Listener and logging settings
///
/// Holds no whole-request timeout. Each outbound call is bounded by its own
/// section (`payment`, `directory`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// Log filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines (always on in production)
    #[serde(default)]
    pub log_json: bool,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl ServerConfig {
    /// Address the listener binds to
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ValidationError::InvalidHost)
    }

    /// Whether log lines are written as JSON
    pub fn json_logs(&self) -> bool {
        self.log_json || self.environment == Environment::Production
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        self.socket_addr()?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Port the hosted checkout integration posts to.
fn default_port() -> u16 {
    4242
}

fn default_log_level() -> String {
    "info,entitlement_sync=debug,tower_http=info".to_string()
}
