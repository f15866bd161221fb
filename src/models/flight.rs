use core::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One bookable fare as returned by a ticket provider.
///
/// Dedup identity is `(city_code_from, city_code_to, departure_date)`; `price`
/// orders flights sharing that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Flight {
    pub city_code_from: String,
    pub city_code_to: String,
    pub departure_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub booking_token: String,
}

impl Flight {
    pub fn route(&self) -> Route {
        Route::new(&self.city_code_from, &self.city_code_to)
    }
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} @ {} EUR {}",
            self.city_code_from, self.city_code_to, self.departure_date, self.price
        )
    }
}

/// Ordered origin/destination pair of city codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl Route {
    pub fn new(origin: &str, destination: &str) -> Self {
        Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid route `{0}`, expected ORIGIN-DESTINATION (e.g. ALA-TSE)")]
pub struct ParseRouteError(pub String);

impl FromStr for Route {
    type Err = ParseRouteError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (origin, destination) = trimmed
            .split_once('-')
            .ok_or_else(|| ParseRouteError(trimmed.to_string()))?;
        let origin = origin.trim().to_ascii_uppercase();
        let destination = destination.trim().to_ascii_uppercase();
        let valid = |code: &str| code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic());
        if !valid(&origin) || !valid(&destination) || origin == destination {
            return Err(ParseRouteError(trimmed.to_string()));
        }
        Ok(Self {
            origin,
            destination,
        })
    }
}
