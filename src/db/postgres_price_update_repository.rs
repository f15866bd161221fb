use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::price_update_repository::{FlightStream, PriceUpdateRepository},
    models::flight::Flight,
    models::price_update::{PersistOutcome, PriceUpdate, PriceUpdateStatus},
    utils::schedule::CompletenessPolicy,
};

// Six binds per row keeps each statement well under the 65535 parameter cap.
const INSERT_CHUNK_SIZE: usize = 1000;

pub struct PostgresPriceUpdateRepository {
    pub pool: PgPool,
}

#[async_trait]
impl PriceUpdateRepository for PostgresPriceUpdateRepository {
    async fn latest_completed_update(&self) -> Result<Option<PriceUpdate>, sqlx::Error> {
        let result = sqlx::query_as::<_, PriceUpdate>(
            r#"
            SELECT id, status, created_at
            FROM price_updates
            WHERE status = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(PriceUpdateStatus::Completed)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn create_price_update(&self) -> Result<PriceUpdate, sqlx::Error> {
        let result = sqlx::query_as::<_, PriceUpdate>(
            r#"
            INSERT INTO price_updates (id, status, created_at)
            VALUES ($1, $2, now())
            RETURNING id, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(PriceUpdateStatus::InProcess)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn finalize_price_update(
        &self,
        update_id: Uuid,
        flights: &[Flight],
        policy: CompletenessPolicy,
    ) -> Result<PersistOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let mut inserted = 0u64;
        for chunk in flights.chunks(INSERT_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO flights (update_id, city_code_from, city_code_to, departure_date, price, booking_token) ",
            );
            builder.push_values(chunk, |mut row, flight| {
                row.push_bind(update_id)
                    .push_bind(flight.city_code_from.clone())
                    .push_bind(flight.city_code_to.clone())
                    .push_bind(flight.departure_date)
                    .push_bind(flight.price)
                    .push_bind(flight.booking_token.clone());
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        let status = policy.status_for(inserted);
        sqlx::query("UPDATE price_updates SET status = $2 WHERE id = $1")
            .bind(update_id)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(PersistOutcome { inserted, status })
    }

    async fn set_price_update_status(
        &self,
        update_id: Uuid,
        status: PriceUpdateStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE price_updates SET status = $2 WHERE id = $1")
            .bind(update_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn stream_flights<'a>(
        &'a self,
        update_id: Uuid,
        city_code_from: Option<String>,
        city_code_to: Option<String>,
    ) -> FlightStream<'a> {
        sqlx::query_as::<_, Flight>(
            r#"
            SELECT city_code_from, city_code_to, departure_date, price, booking_token
            FROM flights
            WHERE update_id = $1
              AND ($2::text IS NULL OR city_code_from = $2)
              AND ($3::text IS NULL OR city_code_to = $3)
            ORDER BY city_code_from, city_code_to, departure_date
            "#,
        )
        .bind(update_id)
        .bind(city_code_from)
        .bind(city_code_to)
        .fetch(&self.pool)
    }
}
