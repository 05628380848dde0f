//! HTTP server settings.

use std::net::SocketAddr;

use anyhow::Context;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEV_SESSION_SECRET: &str = "dev-secret";

#[derive(Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub session_secret: String,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let raw_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse()
            .with_context(|| format!("BIND_ADDR is not a socket address: {raw_addr:?}"))?;

        let session_secret = var("SESSION_SECRET").unwrap_or_else(|| {
            tracing::warn!("SESSION_SECRET not set; using insecure dev default");
            DEV_SESSION_SECRET.to_string()
        });

        let database_url = var("DATABASE_URL").filter(|u| !u.is_empty());
        if database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
        }

        Ok(Self {
            bind_addr,
            session_secret,
            database_url,
        })
    }
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("session_secret", &"<redacted>")
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
