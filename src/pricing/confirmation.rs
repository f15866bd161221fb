use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::fetcher::cheapest_flights_for_route;
use super::DateWindow;
use crate::models::flight::Flight;
use crate::services::ticket_provider::TicketProvider;

/// Number of confirm rounds before remaining candidates are given up on.
pub const MAX_CONFIRMATION_ROUNDS: usize = 3;

#[derive(Debug, Default)]
pub struct ConfirmationReport {
    pub confirmed: Vec<Flight>,
    /// Flights still unconfirmed when the round budget ran out.
    pub dropped: Vec<Flight>,
    pub rounds: usize,
}

/// Confirm candidates against the booking API.
///
/// Each round confirms the current candidates concurrently. Rejected flights are
/// looked up again for their exact route and date, and whatever comes back is the
/// next round's candidate set.
pub async fn confirm_flights(
    provider: Arc<dyn TicketProvider>,
    candidates: Vec<Flight>,
    limiter: Arc<Semaphore>,
) -> ConfirmationReport {
    let mut report = ConfirmationReport::default();
    let mut candidates = candidates;

    while !candidates.is_empty() {
        info!(round = report.rounds, count = candidates.len(), "confirming flights");
        let (confirmed, rejected) =
            confirm_round(provider.as_ref(), candidates, &limiter).await;
        report.rounds += 1;
        info!(
            round = report.rounds - 1,
            confirmed = confirmed.len(),
            retry = rejected.len(),
            "confirmation round finished"
        );
        report.confirmed.extend(confirmed);

        if report.rounds >= MAX_CONFIRMATION_ROUNDS {
            report.dropped = rejected;
            break;
        }
        candidates = rediscover(provider.as_ref(), rejected, &limiter).await;
    }

    if !report.dropped.is_empty() {
        warn!(
            dropped = report.dropped.len(),
            flights = %report
                .dropped
                .iter()
                .map(|f| format!("{}@{}", f.route(), f.departure_date))
                .collect::<Vec<_>>()
                .join(","),
            "flights still unconfirmed after final round"
        );
    }
    report
}

async fn confirm_round(
    provider: &dyn TicketProvider,
    candidates: Vec<Flight>,
    limiter: &Semaphore,
) -> (Vec<Flight>, Vec<Flight>) {
    let verdicts = join_all(candidates.into_iter().map(|flight| async move {
        let _permit = limiter.acquire().await.ok();
        provider.confirm(flight).await
    }))
    .await;

    verdicts
        .into_iter()
        .fold((Vec::new(), Vec::new()), |(mut confirmed, mut rejected), (flight, ok)| {
            if ok {
                confirmed.push(flight);
            } else {
                rejected.push(flight);
            }
            (confirmed, rejected)
        })
}

/// Look each rejected flight up again on its own route and date.
async fn rediscover(
    provider: &dyn TicketProvider,
    rejected: Vec<Flight>,
    limiter: &Semaphore,
) -> Vec<Flight> {
    join_all(rejected.into_iter().map(|flight| async move {
        let _permit = limiter.acquire().await.ok();
        cheapest_flights_for_route(
            provider,
            &flight.route(),
            DateWindow::single(flight.departure_date),
        )
        .await
    }))
    .await
    .into_iter()
    .flatten()
    .collect()
}
