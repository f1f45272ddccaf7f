use crate::errors::{CLIError, Result};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::{env, fmt::Display, str::FromStr};
use tracing::{info, warn};

/// Default address for both the client and the development server
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:9898";
/// Default file holding the session token between CLI invocations
pub const DEFAULT_TOKEN_DB: &str = "storefront-session.db";
pub const DEFAULT_WORKERS: usize = 4;

/// Settings read from the environment, each with a default
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend address, as <host>:<port>
    pub api_addr: String,
    pub token_db: PathBuf,
    /// Worker threads of the development server
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_addr: DEFAULT_ADDRESS.to_string(),
            token_db: PathBuf::from(DEFAULT_TOKEN_DB),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_addr: String = try_load("STOREFRONT_API_ADDR", DEFAULT_ADDRESS)?;
        Ok(Config {
            api_addr: validate_address(&api_addr)?.to_string(),
            token_db: try_load("STOREFRONT_TOKEN_DB", DEFAULT_TOKEN_DB)?,
            workers: try_load("STOREFRONT_WORKERS", &DEFAULT_WORKERS.to_string())?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        CLIError::InvalidParameter(format!("{key}={value}")).into()
    })
}

/// Validate the format of a TCP address
///
/// Returns its input if the address is in the format <host>:<port>, otherwise InvalidUrlFormat
pub fn validate_address(url: &str) -> std::result::Result<&str, CLIError> {
    static ADDRESS: OnceLock<Regex> = OnceLock::new();
    let re = ADDRESS.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9\.\-]+:\d{1,5}$").expect("address pattern is valid")
    });
    if re.is_match(url) {
        Ok(url)
    } else {
        Err(CLIError::InvalidUrlFormat)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert_eq!(validate_address("127.0.0.1:9898").unwrap(), "127.0.0.1:9898");
        assert!(validate_address("pizza.local:80").is_ok());
        assert!(validate_address("menu").is_err());
        assert!(validate_address("http://localhost:5000").is_err());
        assert!(validate_address("localhost:123456").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_addr, DEFAULT_ADDRESS);
        assert_eq!(config.token_db, PathBuf::from(DEFAULT_TOKEN_DB));
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_try_load_rejects_garbage() {
        env::set_var("STOREFRONT_TEST_WORKERS", "many");
        let parsed: Result<usize> = try_load("STOREFRONT_TEST_WORKERS", "4");
        assert!(parsed.is_err());

        let parsed: usize = try_load("STOREFRONT_TEST_UNSET_KEY", "4").unwrap();
        assert_eq!(parsed, 4);
    }
}
