use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("HUB_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HUB_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let db_path = get("HUB_DB_PATH").unwrap_or_else(|| "collectorshub.db".into()).into();
        let host = get("HUB_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match get("HUB_PORT") {
            Some(raw) => raw.parse::<u16>().with_context(|| format!("HUB_PORT '{}' is not a port", raw))?,
            None => 5001,
        };

        Ok(Self {
            jwt_secret,
            db_path,
            host,
            port,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port).parse()?;
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("HUB_JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.port, 5001);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.db_path, PathBuf::from("collectorshub.db"));
        assert_eq!(config.addr().unwrap().port(), 5001);
    }

    #[test]
    fn placeholder_secret_rejected() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("HUB_JWT_SECRET", "dev-secret-change-me")])).is_err());
    }

    #[test]
    fn bad_port_rejected() {
        let result = Config::from_lookup(lookup(&[("HUB_JWT_SECRET", "s3cret"), ("HUB_PORT", "http")]));
        assert!(result.is_err());
    }
}
