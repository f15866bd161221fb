use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "price_update_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PriceUpdateStatus {
    /// Column default only; the worker creates runs as `in_process`.
    #[allow(dead_code)]
    Pending,
    InProcess,
    Completed,
    Failed,
}

impl fmt::Display for PriceUpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceUpdateStatus::Pending => "pending",
            PriceUpdateStatus::InProcess => "in_process",
            PriceUpdateStatus::Completed => "completed",
            PriceUpdateStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A single discovery run. Flights persisted under it live and die with it.
#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct PriceUpdate {
    pub id: Uuid,
    pub status: PriceUpdateStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What the persistence step reports back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOutcome {
    pub inserted: u64,
    pub status: PriceUpdateStatus,
}
