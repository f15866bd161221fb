use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{ProviderError, TicketProvider};
use crate::config::SkypickerSettings;
use crate::models::flight::Flight;

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Deserialize)]
struct FlightsResponse {
    #[serde(default)]
    data: Vec<RawFlight>,
}

#[derive(Debug, Deserialize)]
struct RawFlight {
    #[serde(rename = "cityCodeFrom")]
    city_code_from: String,
    #[serde(rename = "cityCodeTo")]
    city_code_to: String,
    price: serde_json::Number,
    booking_token: String,
    #[serde(rename = "dTime")]
    departure_time: i64,
}

impl RawFlight {
    fn into_flight(self) -> Result<Flight, ProviderError> {
        let price = Decimal::from_str(&self.price.to_string()).map_err(|err| {
            ProviderError::InvalidResponse(format!("price `{}`: {}", self.price, err))
        })?;
        let departure = DateTime::from_timestamp(self.departure_time, 0).ok_or_else(|| {
            ProviderError::InvalidResponse(format!("dTime `{}` out of range", self.departure_time))
        })?;
        Ok(Flight {
            city_code_from: self.city_code_from,
            city_code_to: self.city_code_to,
            departure_date: departure.date_naive(),
            price,
            booking_token: self.booking_token,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct CheckFlightsResponse {
    #[serde(default)]
    flights_checked: bool,
    #[serde(default)]
    flights_invalid: bool,
    #[serde(default)]
    price_change: bool,
}

/// Skypicker search and booking-check API.
pub struct SkypickerProvider {
    client: Client,
    settings: SkypickerSettings,
}

impl SkypickerProvider {
    pub fn new(client: Client, settings: SkypickerSettings) -> Self {
        Self { client, settings }
    }

    /// Provider with its own client; every request is capped at `request_timeout`.
    pub fn from_settings(settings: SkypickerSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self::new(client, settings))
    }

    async fn fetch_once(
        &self,
        city_code_from: &str,
        city_code_to: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Flight>, ProviderError> {
        let date_from = date_from.format(DATE_FORMAT).to_string();
        let date_to = date_to.format(DATE_FORMAT).to_string();
        let response = self
            .client
            .get(&self.settings.flights_url)
            .query(&[
                ("fly_from", city_code_from),
                ("fly_to", city_code_to),
                ("date_from", date_from.as_str()),
                ("date_to", date_to.as_str()),
                ("partner", self.settings.partner.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status { status });
        }

        let body: FlightsResponse = response.json().await?;
        body.data.into_iter().map(RawFlight::into_flight).collect()
    }

    async fn check_once(&self, booking_token: &str) -> Result<CheckFlightsResponse, ProviderError> {
        let response = self
            .client
            .get(&self.settings.booking_url)
            .query(&[
                ("v", "2"),
                ("booking_token", booking_token),
                ("bnum", "0"),
                ("pnum", "1"),
                ("affily", self.settings.partner.as_str()),
                ("currency", "EUR"),
                ("adults", "1"),
                ("children", "0"),
                ("infants", "0"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status { status });
        }

        // The booking API labels its JSON as text/html, so decode the raw bytes.
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| ProviderError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl TicketProvider for SkypickerProvider {
    async fn fetch(
        &self,
        city_code_from: &str,
        city_code_to: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Flight>, ProviderError> {
        info!(%city_code_from, %city_code_to, %date_from, %date_to, "fetching flights");
        let attempts = self.settings.fetch_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self
                .fetch_once(city_code_from, city_code_to, date_from, date_to)
                .await
            {
                Ok(flights) => return Ok(flights),
                Err(err) if attempt < attempts => {
                    warn!(
                        %city_code_from,
                        %city_code_to,
                        attempt,
                        error = %err,
                        "flight search failed, retrying"
                    );
                    sleep(self.settings.fetch_retry_delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn confirm(&self, flight: Flight) -> (Flight, bool) {
        debug!(%flight, "checking flight");
        loop {
            let check = match self.check_once(&flight.booking_token).await {
                Ok(check) => check,
                Err(err) => {
                    warn!(%flight, error = %err, "booking check failed");
                    return (flight, false);
                }
            };
            if check.flights_checked {
                let valid = !check.flights_invalid && !check.price_change;
                return (flight, valid);
            }
            sleep(self.settings.confirm_poll_interval).await;
        }
    }
}
