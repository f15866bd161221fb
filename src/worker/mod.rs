pub mod price_update;

use tokio::task::JoinHandle;
use tracing::info;

use crate::pricing::PriceMonitor;
use crate::state::AppState;
use price_update::PriceUpdateScheduler;

pub async fn start_background_workers(state: AppState) -> JoinHandle<()> {
    let discovery = &state.config.discovery;
    let monitor = PriceMonitor::from_settings(state.ticket_provider.clone(), discovery);
    let scheduler = PriceUpdateScheduler::new(
        state.price_updates.clone(),
        monitor,
        discovery.cycle_timeout,
    );
    info!(
        routes = discovery.routes.len(),
        window_days = discovery.window_days,
        max_concurrency = discovery.max_concurrency,
        "starting price update worker"
    );

    // A single loop: cycles never overlap.
    tokio::spawn(scheduler.run())
}
