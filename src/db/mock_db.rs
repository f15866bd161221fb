use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use super::price_update_repository::{FlightStream, PriceUpdateRepository};
use crate::models::flight::Flight;
use crate::models::price_update::{PersistOutcome, PriceUpdate, PriceUpdateStatus};
use crate::utils::schedule::CompletenessPolicy;

/// In-memory repository. Mirrors the transactional contract: a failed
/// finalize leaves neither flights nor a status change behind.
pub struct MockDb {
    pub updates: Mutex<Vec<PriceUpdate>>,
    pub flights: Mutex<HashMap<Uuid, Vec<Flight>>>,
    pub should_fail: bool,
    pub fail_finalize: bool,
    pub calls: Mutex<Vec<&'static str>>,
}

impl Default for MockDb {
    fn default() -> Self {
        Self {
            updates: Mutex::new(vec![]),
            flights: Mutex::new(HashMap::new()),
            should_fail: false,
            fail_finalize: false,
            calls: Mutex::new(vec![]),
        }
    }
}

impl MockDb {
    pub fn with_completed_update(created_at: OffsetDateTime, flights: Vec<Flight>) -> Self {
        let db = Self::default();
        let id = Uuid::new_v4();
        db.updates.lock().unwrap().push(PriceUpdate {
            id,
            status: PriceUpdateStatus::Completed,
            created_at,
        });
        db.flights.lock().unwrap().insert(id, flights);
        db
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_of(&self, update_id: Uuid) -> Option<PriceUpdateStatus> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == update_id)
            .map(|u| u.status)
    }

    fn record(&self, call: &'static str) -> Result<(), sqlx::Error> {
        self.calls.lock().unwrap().push(call);
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceUpdateRepository for MockDb {
    async fn latest_completed_update(&self) -> Result<Option<PriceUpdate>, sqlx::Error> {
        self.record("latest_completed_update")?;
        Ok(self
            .updates
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.status == PriceUpdateStatus::Completed)
            .max_by_key(|u| u.created_at)
            .cloned())
    }

    async fn create_price_update(&self) -> Result<PriceUpdate, sqlx::Error> {
        self.record("create_price_update")?;
        let update = PriceUpdate {
            id: Uuid::new_v4(),
            status: PriceUpdateStatus::InProcess,
            created_at: OffsetDateTime::now_utc(),
        };
        self.updates.lock().unwrap().push(update.clone());
        Ok(update)
    }

    async fn finalize_price_update(
        &self,
        update_id: Uuid,
        flights: &[Flight],
        policy: CompletenessPolicy,
    ) -> Result<PersistOutcome, sqlx::Error> {
        self.record("finalize_price_update")?;
        if self.fail_finalize {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut updates = self.updates.lock().unwrap();
        let update = updates
            .iter_mut()
            .find(|u| u.id == update_id)
            .ok_or(sqlx::Error::RowNotFound)?;
        let inserted = flights.len() as u64;
        let status = policy.status_for(inserted);
        update.status = status;
        self.flights
            .lock()
            .unwrap()
            .insert(update_id, flights.to_vec());
        Ok(PersistOutcome { inserted, status })
    }

    async fn set_price_update_status(
        &self,
        update_id: Uuid,
        status: PriceUpdateStatus,
    ) -> Result<(), sqlx::Error> {
        self.record("set_price_update_status")?;
        if let Some(update) = self
            .updates
            .lock()
            .unwrap()
            .iter_mut()
            .find(|u| u.id == update_id)
        {
            update.status = status;
        }
        Ok(())
    }

    fn stream_flights<'a>(
        &'a self,
        update_id: Uuid,
        city_code_from: Option<String>,
        city_code_to: Option<String>,
    ) -> FlightStream<'a> {
        let rows: Vec<Result<Flight, sqlx::Error>> = if self.should_fail {
            vec![Err(sqlx::Error::Protocol("Mock DB failure".into()))]
        } else {
            self.flights
                .lock()
                .unwrap()
                .get(&update_id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|f| city_code_from.as_deref().map_or(true, |c| f.city_code_from == c))
                .filter(|f| city_code_to.as_deref().map_or(true, |c| f.city_code_to == c))
                .map(Ok)
                .collect()
        };
        Box::pin(tokio_stream::iter(rows))
    }
}
