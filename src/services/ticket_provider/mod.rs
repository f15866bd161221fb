pub mod skypicker;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::flight::Flight;

pub use skypicker::SkypickerProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("ticket provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ticket provider responded with status {status}")]
    Status { status: StatusCode },
    #[error("ticket provider returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Source of flight offers and booking checks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketProvider: Send + Sync {
    /// All offers for a direction departing within `[date_from, date_to]`.
    ///
    /// Implementations retry on their own; an error here means retries are exhausted.
    async fn fetch(
        &self,
        city_code_from: &str,
        city_code_to: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Flight>, ProviderError>;

    /// Check that a flight can still be booked at its stated price.
    ///
    /// Returns the flight back together with the verdict. Transport failures
    /// yield `false` rather than an error.
    async fn confirm(&self, flight: Flight) -> (Flight, bool);
}
