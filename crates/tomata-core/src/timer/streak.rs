//! Daily streak tracking.
//!
//! A streak is the number of consecutive calendar days with at least one
//! completed focus session. The record advances at most once per day; the
//! caller decides what "today" is so the logic stays clock-free.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreakRecord {
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_active_day: Option<NaiveDate>,
}

impl StreakRecord {
    /// Advance the streak for a focus completion on `today`.
    ///
    /// Consecutive days increment, a gap resets to 1, a second completion
    /// on the same day leaves the record unchanged.
    pub fn advance(&self, today: NaiveDate) -> StreakRecord {
        if self.last_active_day == Some(today) {
            return self.clone();
        }
        let consecutive = self.last_active_day.and_then(|d| d.succ_opt()) == Some(today);
        let current = if consecutive {
            self.current_streak + 1
        } else {
            1
        };
        StreakRecord {
            current_streak: current,
            best_streak: self.best_streak.max(current),
            last_active_day: Some(today),
        }
    }
}
