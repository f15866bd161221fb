use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::info;

use super::fetcher::cheapest_flights_for_route;
use super::DateWindow;
use crate::models::flight::{Flight, Route};
use crate::services::ticket_provider::TicketProvider;

/// Fetch every route concurrently and concatenate the per-date minimums.
///
/// All routes share the same `window`; at most `limiter`'s permit count of
/// fetches are in flight at once.
pub async fn discover_cheapest_flights(
    provider: Arc<dyn TicketProvider>,
    routes: &[Route],
    window: DateWindow,
    limiter: Arc<Semaphore>,
) -> Vec<Flight> {
    info!(
        from = %window.from,
        to = %window.to,
        routes = %routes.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
        "discovering cheapest flights"
    );

    let provider = provider.as_ref();
    let limiter = limiter.as_ref();
    join_all(routes.iter().map(|route| async move {
        let _permit = limiter.acquire().await.ok();
        cheapest_flights_for_route(provider, route, window).await
    }))
    .await
    .into_iter()
    .flatten()
    .collect()
}
