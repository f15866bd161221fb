use chrono::{DateTime, Duration, NaiveTime, Utc};
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::models::price_update::PriceUpdateStatus;

/// Delay before retrying after an incomplete run.
pub const RETRY_SOON_MINUTES: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRunReason {
    /// Today's prices are in place; refresh on the next calendar day.
    Midnight,
    /// The last attempt fell short of the completeness threshold.
    Soon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextRun {
    pub at: DateTime<Utc>,
    pub reason: NextRunReason,
}

impl NextRun {
    pub fn midnight_after(now: DateTime<Utc>) -> Self {
        Self {
            at: next_utc_midnight(now),
            reason: NextRunReason::Midnight,
        }
    }

    pub fn soon_after(now: DateTime<Utc>) -> Self {
        Self {
            at: now + Duration::minutes(RETRY_SOON_MINUTES),
            reason: NextRunReason::Soon,
        }
    }
}

pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Duration::days(1);
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}

/// Translate a wall-clock target into a point on the monotonic timer.
///
/// Only the offset between `target` and `now_wall` is used, so clock jumps after
/// this call do not move the deadline. Targets in the past fire immediately.
pub fn monotonic_deadline(
    target: DateTime<Utc>,
    now_wall: DateTime<Utc>,
    now_monotonic: Instant,
) -> Instant {
    let offset = (target - now_wall).to_std().unwrap_or_default();
    now_monotonic + offset
}

pub fn offset_to_utc(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
}

/// Decides whether a run produced enough flights to count as done for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletenessPolicy {
    pub expected: u64,
}

impl CompletenessPolicy {
    pub fn new(routes: usize, window_days: u32) -> Self {
        Self {
            expected: routes as u64 * u64::from(window_days),
        }
    }

    /// Smallest flight count that is not below two thirds of `expected`.
    pub fn threshold(&self) -> u64 {
        (self.expected * 2).div_ceil(3)
    }

    pub fn is_complete(&self, persisted: u64) -> bool {
        persisted > 0 && persisted >= self.threshold()
    }

    pub fn status_for(&self, persisted: u64) -> PriceUpdateStatus {
        if self.is_complete(persisted) {
            PriceUpdateStatus::Completed
        } else {
            PriceUpdateStatus::Failed
        }
    }

    pub fn next_run(&self, persisted: u64, now: DateTime<Utc>) -> NextRun {
        if self.is_complete(persisted) {
            NextRun::midnight_after(now)
        } else {
            NextRun::soon_after(now)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 8, 4, h, m, 0).unwrap()
    }

    #[test]
    fn midnight_is_start_of_next_utc_day() {
        let next = next_utc_midnight(at(13, 45));
        assert_eq!(next, Utc.with_ymd_and_hms(2020, 8, 5, 0, 0, 0).unwrap());
        let from_midnight = next_utc_midnight(Utc.with_ymd_and_hms(2020, 8, 5, 0, 0, 0).unwrap());
        assert_eq!(
            from_midnight,
            Utc.with_ymd_and_hms(2020, 8, 6, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn deadline_keeps_wall_clock_offset() {
        let mono = Instant::now();
        let deadline = monotonic_deadline(at(23, 40), at(23, 20), mono);
        assert_eq!(deadline - mono, std::time::Duration::from_secs(20 * 60));
    }

    #[test]
    fn past_targets_fire_immediately() {
        let mono = Instant::now();
        assert_eq!(monotonic_deadline(at(10, 0), at(11, 0), mono), mono);
    }

    #[test]
    fn threshold_rounds_two_thirds_up() {
        assert_eq!(CompletenessPolicy::new(10, 30).threshold(), 200);
        assert_eq!(CompletenessPolicy::new(1, 4).threshold(), 3);
        assert_eq!(CompletenessPolicy::new(1, 1).threshold(), 1);
    }

    #[test]
    fn completeness_boundary_picks_next_run() {
        let policy = CompletenessPolicy::new(2, 7);
        let threshold = policy.threshold();
        assert_eq!(threshold, 10);
        let now = at(9, 0);

        let below = policy.next_run(threshold - 1, now);
        assert_eq!(below.reason, NextRunReason::Soon);
        assert_eq!(below.at, now + Duration::minutes(20));
        assert_eq!(policy.status_for(threshold - 1), PriceUpdateStatus::Failed);

        let exact = policy.next_run(threshold, now);
        assert_eq!(exact.reason, NextRunReason::Midnight);
        assert_eq!(exact.at, next_utc_midnight(now));
        assert_eq!(policy.status_for(threshold), PriceUpdateStatus::Completed);
    }

    #[test]
    fn zero_flights_never_complete() {
        let policy = CompletenessPolicy::new(0, 30);
        assert_eq!(policy.threshold(), 0);
        assert!(!policy.is_complete(0));
        assert_eq!(policy.status_for(0), PriceUpdateStatus::Failed);
    }

    #[test]
    fn converts_offset_datetime() {
        let odt = OffsetDateTime::from_unix_timestamp(1_596_499_200).unwrap();
        let utc = offset_to_utc(odt).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2020, 8, 4, 0, 0, 0).unwrap());
    }
}
