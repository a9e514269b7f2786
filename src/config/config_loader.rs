use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

use super::config_model::{Database, DotEnvyConfig, PiNetwork, Server};

const DEFAULT_PI_API_BASE_URL: &str = "https://api.minepi.com";
const DEFAULT_PI_HTTP_TIMEOUT: u64 = 30;
const DEFAULT_SERVER_PORT: u16 = 8000;
const DEFAULT_SERVER_BODY_LIMIT: u64 = 1;
const DEFAULT_SERVER_TIMEOUT: u64 = 60;

/// Reads the process environment; `.env` is loaded by the caller beforehand.
pub fn load() -> Result<DotEnvyConfig> {
    let server = Server {
        port: parse_or(
            "SERVER_PORT",
            env_string("SERVER_PORT"),
            DEFAULT_SERVER_PORT,
        )?,
        body_limit: parse_or(
            "SERVER_BODY_LIMIT",
            env_string("SERVER_BODY_LIMIT"),
            DEFAULT_SERVER_BODY_LIMIT,
        )?,
        timeout: parse_or(
            "SERVER_TIMEOUT",
            env_string("SERVER_TIMEOUT"),
            DEFAULT_SERVER_TIMEOUT,
        )?,
    };

    let database = Database {
        url: required("DATABASE_URL", env_string("DATABASE_URL"))?,
    };

    let pi_network = PiNetwork {
        api_key: required("PI_API_KEY", env_string("PI_API_KEY"))?,
        wallet_private_seed: required(
            "PI_WALLET_PRIVATE_SEED",
            env_string("PI_WALLET_PRIVATE_SEED"),
        )?,
        base_url: env_string("PI_API_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PI_API_BASE_URL.to_string()),
        http_timeout: parse_or(
            "PI_HTTP_TIMEOUT",
            env_string("PI_HTTP_TIMEOUT"),
            DEFAULT_PI_HTTP_TIMEOUT,
        )?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        pi_network,
    })
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn required(key: &str, raw: Option<String>) -> Result<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("{} is missing from environment variables", key))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .with_context(|| format!("{} is invalid: {:?}", key, value)),
    }
}
