//! Relay settings read from the environment.

use std::net::SocketAddr;
use tracing::warn;

pub const ADDR_VAR: &str = "SCRIBBLE_RELAY_ADDR";
pub const HISTORY_VAR: &str = "SCRIBBLE_RELAY_HISTORY";

const DEFAULT_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 3030);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub addr: SocketAddr,
    /// Keep the latest elements update per channel and hand it to late
    /// joiners.
    pub replay_history: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(DEFAULT_ADDR),
            replay_history: true,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// the defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ADDR_VAR) {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => config.addr = addr,
                Err(e) => warn!("Ignoring {ADDR_VAR}={raw:?}: {e}"),
            }
        }

        if let Some(raw) = lookup(HISTORY_VAR) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => config.replay_history = true,
                "0" | "false" | "off" | "no" => config.replay_history = false,
                other => warn!("Ignoring {HISTORY_VAR}={other:?}: expected a boolean"),
            }
        }

        config
    }
}
