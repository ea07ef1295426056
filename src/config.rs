use std::env;
use std::fmt::{self, Display};
use std::str::FromStr;

use log::info;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "5000";
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/emp";
/// Default API base URL for the `emp` client, overridable with `SERVER_URL`.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Debug)]
pub struct ConfigError {
    key: String,
    message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {} value: {}", self.key, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server settings, read from the environment after `.env` is loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Config {
            host: try_load(&lookup, "HOST", DEFAULT_HOST)?,
            port: try_load(&lookup, "PORT", DEFAULT_PORT)?,
            database_url: try_load(&lookup, "DATABASE_URL", DEFAULT_DATABASE_URL)?,
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    });
    raw.trim().parse().map_err(|err: T::Err| ConfigError {
        key: key.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[("PORT", "8081"), ("DATABASE_URL", "memory://")])).unwrap();
        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 8081));
        assert_eq!(config.database_url, "memory://");
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().starts_with("Invalid PORT value"));
    }
}
