use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::models::flight::{ParseRouteError, Route};

pub const DEFAULT_ROUTES: &str =
    "ALA-TSE,TSE-ALA,ALA-MOW,MOW-ALA,ALA-CIT,CIT-ALA,TSE-MOW,MOW-TSE,TSE-LED,LED-TSE";
pub const SKYPICKER_FLIGHTS_URL: &str = "https://api.skypicker.com/flights";
pub const SKYPICKER_BOOKING_URL: &str =
    "https://booking-api.skypicker.com/api/v0.1/check_flights";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
    #[error(transparent)]
    Route(#[from] ParseRouteError),
}

#[derive(Debug, Clone)]
pub struct SkypickerSettings {
    pub flights_url: String,
    pub booking_url: String,
    pub partner: String,
    pub fetch_attempts: u32,
    pub fetch_retry_delay: Duration,
    pub confirm_poll_interval: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub routes: Vec<Route>,
    pub window_days: u32,
    pub max_concurrency: usize,
    pub cycle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub rate_limit_ms: u64,
    pub rate_limit_burst: u32,
    pub discovery: DiscoverySettings,
    pub skypicker: SkypickerSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 8080)))?;

        let routes = parse_routes(
            &lookup("FLIGHT_ROUTES").unwrap_or_else(|| DEFAULT_ROUTES.to_string()),
        )?;

        // A zero-sized expectation can never complete a run.
        let window_days: u32 = parse_or(&lookup, "WINDOW_DAYS", 30)?;
        if window_days == 0 {
            return Err(ConfigError::Invalid {
                name: "WINDOW_DAYS",
                value: window_days.to_string(),
            });
        }

        let discovery = DiscoverySettings {
            routes,
            window_days,
            max_concurrency: parse_or(&lookup, "MAX_PROVIDER_CONCURRENCY", 10usize)?.max(1),
            cycle_timeout: Duration::from_secs(parse_or(&lookup, "CYCLE_TIMEOUT_SECONDS", 3600)?),
        };

        let skypicker = SkypickerSettings {
            flights_url: lookup("SKYPICKER_FLIGHTS_URL")
                .unwrap_or_else(|| SKYPICKER_FLIGHTS_URL.to_string()),
            booking_url: lookup("SKYPICKER_BOOKING_URL")
                .unwrap_or_else(|| SKYPICKER_BOOKING_URL.to_string()),
            partner: lookup("SKYPICKER_PARTNER").unwrap_or_else(|| "picky".to_string()),
            fetch_attempts: parse_or(&lookup, "FETCH_RETRY_ATTEMPTS", 3)?,
            fetch_retry_delay: Duration::from_millis(parse_or(
                &lookup,
                "FETCH_RETRY_DELAY_MS",
                2000,
            )?),
            confirm_poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "CONFIRM_POLL_INTERVAL_MS",
                5000,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SKYPICKER_REQUEST_TIMEOUT_SECONDS",
                30,
            )?),
        };

        Ok(Config {
            database_url,
            bind_addr,
            // Default: 200ms/token (~5 req/sec)
            rate_limit_ms: parse_or(&lookup, "RATE_LIMITER_MILLISECONDS", 200)?,
            rate_limit_burst: parse_or(&lookup, "RATE_LIMITER_BURST", 20)?,
            discovery,
            skypicker,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { name, value: raw })
        }
        _ => Ok(default),
    }
}

pub fn parse_routes(raw: &str) -> Result<Vec<Route>, ConfigError> {
    let mut routes: Vec<Route> = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let route: Route = part.parse()?;
        if !routes.contains(&route) {
            routes.push(route);
        }
    }
    if routes.is_empty() {
        return Err(ConfigError::Invalid {
            name: "FLIGHT_ROUTES",
            value: raw.to_string(),
        });
    }
    Ok(routes)
}
