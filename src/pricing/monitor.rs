use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Semaphore;

use super::confirmation::{confirm_flights, ConfirmationReport};
use super::discovery::discover_cheapest_flights;
use super::DateWindow;
use crate::config::DiscoverySettings;
use crate::models::flight::Route;
use crate::services::ticket_provider::TicketProvider;

/// Discovery followed by confirmation for a fixed set of routes.
#[derive(Clone)]
pub struct PriceMonitor {
    provider: Arc<dyn TicketProvider>,
    routes: Vec<Route>,
    window_days: u32,
    limiter: Arc<Semaphore>,
}

impl PriceMonitor {
    pub fn new(
        provider: Arc<dyn TicketProvider>,
        routes: Vec<Route>,
        window_days: u32,
        max_concurrency: usize,
    ) -> Self {
        Self {
            provider,
            routes,
            window_days,
            limiter: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn from_settings(provider: Arc<dyn TicketProvider>, settings: &DiscoverySettings) -> Self {
        Self::new(
            provider,
            settings.routes.clone(),
            settings.window_days,
            settings.max_concurrency,
        )
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Cheapest bookable flight per route and date, from `today` on.
    pub async fn cheapest_confirmed_flights(&self, today: NaiveDate) -> ConfirmationReport {
        let window = DateWindow::starting(today, self.window_days);
        let candidates = discover_cheapest_flights(
            self.provider.clone(),
            &self.routes,
            window,
            self.limiter.clone(),
        )
        .await;
        confirm_flights(self.provider.clone(), candidates, self.limiter.clone()).await
    }
}
