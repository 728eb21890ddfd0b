use std::env;
use std::net::SocketAddr;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `RENDEZVOUS_BIND`; an unparseable value keeps the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env::var("RENDEZVOUS_BIND")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(defaults.bind),
        }
    }

    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }
}
