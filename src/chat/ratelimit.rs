use chrono::{DateTime, Datelike, Timelike, Utc};

/// Per-user hourly send counter. Resets whenever the calendar date or the
/// calendar hour of a new send differs from the previous send's date/hour.
#[derive(Debug, Clone, Default)]
pub struct RateCounter {
    count: u32,
    last: Option<DateTime<Utc>>,
}

impl RateCounter {
    pub fn new() -> Self {
        RateCounter {
            count: 0,
            last: None,
        }
    }

    fn same_window(&self, now: &DateTime<Utc>) -> bool {
        match self.last {
            Some(last) => last.date_naive() == now.date_naive() && last.hour() == now.hour(),
            None => false,
        }
    }

    /// Checks the cap and records the send as one atomic step. Returns
    /// `false` (refusal) without mutating the counter when `cap` has already
    /// been reached within the current window; the counter updates only on
    /// a successful send.
    pub fn try_record(&mut self, cap: u32, now: DateTime<Utc>) -> bool {
        if self.same_window(&now) {
            if self.count >= cap {
                return false;
            }
            self.count += 1;
        } else {
            self.count = 1;
        }
        self.last = Some(now);
        true
    }
}
