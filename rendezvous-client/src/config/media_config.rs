use rendezvous_core::IceServerConfig;
use std::env;

pub const DEFAULT_STUN: &str = "stun:stun.l.google.com:19302";

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN)],
        }
    }
}

impl MediaConfig {
    /// `RENDEZVOUS_STUN` (comma separated) replaces the default STUN list;
    /// `RENDEZVOUS_TURN_URL` with `RENDEZVOUS_TURN_USER` / `RENDEZVOUS_TURN_CREDENTIAL` adds a
    /// TURN relay.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(stun) = env::var("RENDEZVOUS_STUN") {
            let urls: Vec<String> = stun
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_owned)
                .collect();
            if !urls.is_empty() {
                config.ice_servers = urls.into_iter().map(IceServerConfig::stun).collect();
            }
        }

        if let Ok(url) = env::var("RENDEZVOUS_TURN_URL") {
            config = config.with_turn(
                url,
                env::var("RENDEZVOUS_TURN_USER").ok(),
                env::var("RENDEZVOUS_TURN_CREDENTIAL").ok(),
            );
        }

        config
    }

    pub fn with_turn(
        mut self,
        url: impl Into<String>,
        username: Option<String>,
        credential: Option<String>,
    ) -> Self {
        self.ice_servers.push(IceServerConfig {
            urls: vec![url.into()],
            username,
            credential,
        });
        self
    }
}
