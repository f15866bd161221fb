use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;
use uuid::Uuid;

use crate::models::flight::Flight;
use crate::models::price_update::{PersistOutcome, PriceUpdate, PriceUpdateStatus};
use crate::utils::schedule::CompletenessPolicy;

pub type FlightStream<'a> = Pin<Box<dyn Stream<Item = Result<Flight, sqlx::Error>> + Send + 'a>>;

#[async_trait]
pub trait PriceUpdateRepository: Send + Sync {
    /// Most recent run that finished with `completed`.
    async fn latest_completed_update(&self) -> Result<Option<PriceUpdate>, sqlx::Error>;

    async fn create_price_update(&self) -> Result<PriceUpdate, sqlx::Error>;

    /// Insert `flights` under the run and set its final status in one transaction.
    ///
    /// The status is derived from the number of rows actually inserted.
    async fn finalize_price_update(
        &self,
        update_id: Uuid,
        flights: &[Flight],
        policy: CompletenessPolicy,
    ) -> Result<PersistOutcome, sqlx::Error>;

    async fn set_price_update_status(
        &self,
        update_id: Uuid,
        status: PriceUpdateStatus,
    ) -> Result<(), sqlx::Error>;

    fn stream_flights<'a>(
        &'a self,
        update_id: Uuid,
        city_code_from: Option<String>,
        city_code_to: Option<String>,
    ) -> FlightStream<'a>;
}
