//! crates/flower_timer_core/src/clock.rs
//!
//! `Clock` implementations: the real system clock and a manually driven one
//! for deterministic hosts and tests.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::ports::Clock;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// The calendar date is tracked separately from the millisecond counter so a
/// day boundary can be crossed without simulating a full day of time.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
    today: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(start_millis: i64, today: NaiveDate) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
            today: Mutex::new(today),
        }
    }

    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_millis(secs * 1000);
    }

    pub fn set_today(&self, today: NaiveDate) {
        let mut guard = match self.today.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = today;
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        match self.today.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_millis())
            .single()
            .unwrap_or_default()
    }
}
