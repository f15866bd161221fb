use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::DateWindow;
use crate::models::flight::{Flight, Route};
use crate::services::ticket_provider::TicketProvider;

/// Cheapest flight per departure date for one route.
///
/// Provider failures are logged and turn into an empty result so one broken
/// route never takes the rest of the run down with it.
pub async fn cheapest_flights_for_route(
    provider: &dyn TicketProvider,
    route: &Route,
    window: DateWindow,
) -> Vec<Flight> {
    let all_flights = match provider
        .fetch(&route.origin, &route.destination, window.from, window.to)
        .await
    {
        Ok(flights) => flights,
        Err(err) => {
            warn!(%route, from = %window.from, to = %window.to, error = %err, "route fetch failed");
            return vec![];
        }
    };

    let fetched = all_flights.len();
    let cheapest = cheapest_per_date(filter_outliers(all_flights, &window));
    debug!(%route, fetched, kept = cheapest.len(), "route fetched");
    cheapest
}

/// Drop flights departing outside the requested window.
pub fn filter_outliers(flights: Vec<Flight>, window: &DateWindow) -> Vec<Flight> {
    flights
        .into_iter()
        .filter(|flight| window.contains(flight.departure_date))
        .collect()
}

/// Keep one flight per departure date: the cheapest one. On equal prices the
/// flight seen first wins. Output follows the order dates were first seen.
pub fn cheapest_per_date(flights: Vec<Flight>) -> Vec<Flight> {
    let mut slot_by_date: HashMap<NaiveDate, usize> = HashMap::new();
    let mut result: Vec<Flight> = Vec::new();
    for flight in flights {
        match slot_by_date.get(&flight.departure_date) {
            Some(&idx) => {
                if flight.price < result[idx].price {
                    result[idx] = flight;
                }
            }
            None => {
                slot_by_date.insert(flight.departure_date, result.len());
                result.push(flight);
            }
        }
    }
    result
}
