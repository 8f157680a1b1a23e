use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

// Server configuration sourced from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub mongo_uri: Option<String>,
    pub mongo_database: String,
    pub firebase_api_key: Option<String>,
    /// Identity Toolkit host override, e.g. the Firebase auth emulator.
    pub firebase_auth_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    /// How long a bearer token stays usable after login.
    pub session_ttl: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let set = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_addr = set("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()
            .with_context(|| "parse BIND_ADDR")?;
        let timeout_secs: u64 = match set("REQUEST_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| "parse REQUEST_TIMEOUT_SECS")?,
            None => 10,
        };
        if timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be at least 1");
        }
        let ttl_secs: u64 = match set("SESSION_TTL_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| "parse SESSION_TTL_SECS")?,
            None => 3600,
        };
        if ttl_secs == 0 {
            anyhow::bail!("SESSION_TTL_SECS must be at least 1");
        }

        Ok(Self {
            mongo_uri: set("MONGOURI"),
            mongo_database: set("MONGO_DATABASE").unwrap_or_else(|| "keyvalue".to_string()),
            firebase_api_key: set("FIREBASE_API_KEY"),
            firebase_auth_url: set("FIREBASE_AUTH_URL"),
            bind_addr,
            request_timeout: Duration::from_secs(timeout_secs),
            session_ttl: Duration::from_secs(ttl_secs),
        })
    }
}
