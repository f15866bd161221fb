//! Price discovery: fetch the cheapest fare per route and date, then make
//! sure each one can still be booked.

pub mod confirmation;
pub mod discovery;
pub mod fetcher;
pub mod monitor;

use chrono::{Duration, NaiveDate};

pub use monitor::PriceMonitor;

/// Closed range of departure dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// `[today, today + days]`, both ends inclusive.
    pub fn starting(today: NaiveDate, days: u32) -> Self {
        Self {
            from: today,
            to: today + Duration::days(i64::from(days)),
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            from: date,
            to: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}
