use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;

const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub public_url: String,
    pub bind: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            database_url: lookup("DATABASE_URL"),
            public_url: or_default(&lookup, "CERTFOLIO_PUBLIC_URL", DEFAULT_PUBLIC_URL),
            bind: or_default(&lookup, "CERTFOLIO_BIND", DEFAULT_BIND),
        })
    }

    /// Parsed only by `serve`; other commands never look at it.
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("invalid CERTFOLIO_BIND value {:?}", self.bind))
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to the certificate Postgres instance")
    }
}

fn or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}
