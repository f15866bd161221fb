use crate::config::Config;
use crate::db::price_update_repository::PriceUpdateRepository;
use crate::services::ticket_provider::TicketProvider;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub price_updates: Arc<dyn PriceUpdateRepository>,
    pub ticket_provider: Arc<dyn TicketProvider>,
    pub config: Arc<Config>,
}
