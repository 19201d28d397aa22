use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

const DEFAULT_PROVIDER_DELAY_MS: u64 = 300;
const DEFAULT_SESSION_GRACE_SECS: u64 = 3600;
const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub public_rps: u32,
    /// Simulated latency of the candidate and question lookups.
    pub provider_delay: Duration,
    /// How long a completed session stays readable before it is dropped.
    pub session_grace: Duration,
    pub prune_interval: Duration,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let provider_delay_ms = get_env_parse_or("PROVIDER_DELAY_MS", DEFAULT_PROVIDER_DELAY_MS)?;
        let session_grace_secs = get_env_parse_or("SESSION_GRACE_SECS", DEFAULT_SESSION_GRACE_SECS)?;
        let prune_interval_secs =
            get_env_parse_or("PRUNE_INTERVAL_SECS", DEFAULT_PRUNE_INTERVAL_SECS)?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            public_rps: get_env_parse("PUBLIC_RPS")?,
            provider_delay: Duration::from_millis(provider_delay_ms),
            session_grace: Duration::from_secs(session_grace_secs),
            prune_interval: Duration::from_secs(prune_interval_secs.max(1)),
        })
    }

    /// Configuration for in-process use (tests, embedding) with no lookup delay.
    pub fn in_process() -> Self {
        Self {
            server_address: "127.0.0.1:0".to_string(),
            public_rps: 1000,
            provider_delay: Duration::ZERO,
            session_grace: Duration::from_secs(DEFAULT_SESSION_GRACE_SECS),
            prune_interval: Duration::from_secs(DEFAULT_PRUNE_INTERVAL_SECS),
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(_) => get_env_parse(name),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_numeric_value_is_reported_with_its_name() {
        env::set_var("ASSESSMENT_TEST_BAD_RPS", "many");
        let err = get_env_parse::<u32>("ASSESSMENT_TEST_BAD_RPS").unwrap_err();
        assert!(err.to_string().contains("ASSESSMENT_TEST_BAD_RPS"));
    }

    #[test]
    fn optional_variable_falls_back_to_default() {
        let grace: u64 = get_env_parse_or("ASSESSMENT_TEST_UNSET_GRACE", 42).unwrap();
        assert_eq!(grace, 42);
    }

    #[test]
    fn missing_variable_is_a_config_error() {
        let err = get_env("ASSESSMENT_TEST_SURELY_UNSET").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
