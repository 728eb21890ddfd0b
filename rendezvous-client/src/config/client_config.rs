use rendezvous_core::StorePath;
use std::env;
use std::time::Duration;

/// Tunables for matchmaking, negotiation and teardown.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Parent of all room records in the store.
    pub rooms_path: StorePath,
    /// How long a Caller waits in `Waiting` for someone to claim its room.
    pub match_timeout: Duration,
    /// How long a Callee waits for the Caller's offer to appear.
    pub offer_wait: Duration,
    /// From `Matched` until the media engine reports `Connected`.
    pub negotiation_timeout: Duration,
    /// Upper bound on each best-effort store write during teardown.
    pub teardown_write_timeout: Duration,
    /// Lost claim races tolerated before creating a fresh room instead.
    pub claim_attempts: u32,
    /// Per-request timeout of the WebSocket store binding.
    pub store_request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rooms_path: StorePath::new("rooms"),
            match_timeout: Duration::from_secs(120),
            offer_wait: Duration::from_secs(10),
            negotiation_timeout: Duration::from_secs(30),
            teardown_write_timeout: Duration::from_secs(2),
            claim_attempts: 16,
            store_request_timeout: Duration::from_secs(10),
        }
    }
}

/// Longest accepted timeout override.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

fn parse_secs(raw: &str) -> Option<Duration> {
    let secs = raw.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| *d <= MAX_TIMEOUT)
}

fn secs_from_env(name: &str) -> Option<Duration> {
    env::var(name).ok().as_deref().and_then(parse_secs)
}

impl ClientConfig {
    /// Defaults overridden by `RENDEZVOUS_*` variables. Durations are in seconds; values that
    /// do not parse, are negative or exceed `MAX_TIMEOUT` keep their default. An empty rooms
    /// path keeps the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rooms_path: env::var("RENDEZVOUS_ROOMS_PATH")
                .ok()
                .map(StorePath::new)
                .filter(|p| !p.is_root())
                .unwrap_or(defaults.rooms_path),
            match_timeout: secs_from_env("RENDEZVOUS_MATCH_TIMEOUT").unwrap_or(defaults.match_timeout),
            offer_wait: secs_from_env("RENDEZVOUS_OFFER_WAIT").unwrap_or(defaults.offer_wait),
            negotiation_timeout: secs_from_env("RENDEZVOUS_NEGOTIATION_TIMEOUT")
                .unwrap_or(defaults.negotiation_timeout),
            teardown_write_timeout: secs_from_env("RENDEZVOUS_TEARDOWN_WRITE_TIMEOUT")
                .unwrap_or(defaults.teardown_write_timeout),
            claim_attempts: env::var("RENDEZVOUS_CLAIM_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.claim_attempts),
            store_request_timeout: secs_from_env("RENDEZVOUS_STORE_REQUEST_TIMEOUT")
                .unwrap_or(defaults.store_request_timeout),
        }
    }
}
