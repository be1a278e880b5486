//! Environment-driven server configuration.

use std::net::SocketAddr;

use adpulse_ads_api::{RateLimitConfig, RegionEndpoints};
use adpulse_core::errors::{Error, Result};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8088";
const DEFAULT_DATABASE_PATH: &str = "./data";
const DEFAULT_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Directory for `adpulse.db`, or an explicit `.db` file path.
    pub database_path: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub endpoints: RegionEndpoints,
    pub rate_limit: RateLimitConfig,
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_url(name: &str) -> Option<String> {
    env_value(name).map(|v| v.trim_end_matches('/').to_string())
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env_value(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| Error::config(format!("{} must be a number, got '{}'", name, raw))),
        None => Ok(default),
    }
}

fn required(name: &str) -> Result<String> {
    env_value(name).ok_or_else(|| Error::config(format!("{} is not set", name)))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_raw =
            env_value("ADPULSE_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_raw.parse::<SocketAddr>().map_err(|_| {
            Error::config(format!("ADPULSE_LISTEN_ADDR is not a socket address: '{}'", listen_raw))
        })?;

        let defaults = RegionEndpoints::default();
        let rate_defaults = RateLimitConfig::default();

        Ok(Self {
            listen_addr,
            database_path: env_value("ADPULSE_DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            client_id: required("ADS_API_CLIENT_ID")?,
            client_secret: required("ADS_API_CLIENT_SECRET")?,
            token_url: env_url("ADS_API_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            endpoints: RegionEndpoints {
                na: env_url("ADS_API_URL_NA").unwrap_or(defaults.na),
                eu: env_url("ADS_API_URL_EU").unwrap_or(defaults.eu),
                fe: env_url("ADS_API_URL_FE").unwrap_or(defaults.fe),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: env_number(
                    "ADS_API_RPS",
                    rate_defaults.requests_per_second,
                )?,
                daily_quota: env_number("ADS_API_DAILY_QUOTA", rate_defaults.daily_quota)?,
            },
        })
    }
}
