use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{ProviderError, TicketProvider};
use crate::models::flight::{Flight, Route};

/// In-memory provider backed by a fixed list of offers.
///
/// `fetch` returns the stored offers for the route without any date filtering
/// unless `filter_dates` is set, which lets tests feed out-of-window noise.
pub struct StaticTicketProvider {
    pub flights: Vec<Flight>,
    pub filter_dates: bool,
    pub failing_routes: HashSet<Route>,
    /// Booking tokens that never confirm.
    pub rejected_tokens: HashSet<String>,
    /// Booking tokens that fail confirmation this many times before succeeding.
    pub flaky_tokens: Mutex<HashMap<String, usize>>,
    pub fetch_calls: Mutex<Vec<(Route, NaiveDate, NaiveDate)>>,
    pub confirm_calls: Mutex<Vec<Flight>>,
    /// Time every call spends in flight.
    pub latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StaticTicketProvider {
    pub fn new(flights: Vec<Flight>) -> Self {
        Self {
            flights,
            filter_dates: true,
            failing_routes: HashSet::new(),
            rejected_tokens: HashSet::new(),
            flaky_tokens: Mutex::new(HashMap::new()),
            fetch_calls: Mutex::new(vec![]),
            confirm_calls: Mutex::new(vec![]),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Highest number of fetch and confirm calls observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn occupy(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.lock().unwrap().len()
    }

    pub fn confirm_count(&self) -> usize {
        self.confirm_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TicketProvider for StaticTicketProvider {
    async fn fetch(
        &self,
        city_code_from: &str,
        city_code_to: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Flight>, ProviderError> {
        self.occupy().await;
        let route = Route::new(city_code_from, city_code_to);
        self.fetch_calls
            .lock()
            .unwrap()
            .push((route.clone(), date_from, date_to));
        if self.failing_routes.contains(&route) {
            return Err(ProviderError::InvalidResponse("route unavailable".into()));
        }
        Ok(self
            .flights
            .iter()
            .filter(|f| f.route() == route)
            .filter(|f| {
                !self.filter_dates || (date_from <= f.departure_date && f.departure_date <= date_to)
            })
            .cloned()
            .collect())
    }

    async fn confirm(&self, flight: Flight) -> (Flight, bool) {
        self.occupy().await;
        self.confirm_calls.lock().unwrap().push(flight.clone());
        if self.rejected_tokens.contains(&flight.booking_token) {
            return (flight, false);
        }
        let mut flaky = self.flaky_tokens.lock().unwrap();
        if let Some(remaining) = flaky.get_mut(&flight.booking_token) {
            if *remaining > 0 {
                *remaining -= 1;
                return (flight, false);
            }
        }
        drop(flaky);
        (flight, true)
    }
}
