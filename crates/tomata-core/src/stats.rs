//! Session statistics.
//!
//! The database hands back raw [`SessionRecord`]s for a time range; the
//! functions here fold them into the summaries the dashboard shows. Days
//! are bucketed in local time, matching what the user's clock says.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One completed focus phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub task_id: Option<String>,
    pub duration_min: u64,
    pub completed_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Calendar day this session belongs to, in local time.
    pub fn local_day(&self) -> NaiveDate {
        self.completed_at.with_timezone(&Local).date_naive()
    }
}

/// A session joined with the title of the task it credited, for the
/// recent-activity list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSession {
    pub completed_at: DateTime<Utc>,
    pub duration_min: u64,
    pub task_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodaySummary {
    pub focus_sessions: u64,
    pub focus_minutes: u64,
}

impl TodaySummary {
    pub fn from_sessions(sessions: &[SessionRecord]) -> Self {
        Self {
            focus_sessions: sessions.len() as u64,
            focus_minutes: sessions.iter().map(|s| s.duration_min).sum(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub focus_sessions: u64,
    pub focus_minutes: u64,
    /// Distinct days this week with at least one session.
    pub active_days: u64,
    /// Sessions per active day, rounded to one decimal.
    pub daily_average: f64,
}

impl WeekSummary {
    pub fn from_sessions(sessions: &[SessionRecord]) -> Self {
        let days: BTreeSet<NaiveDate> = sessions.iter().map(SessionRecord::local_day).collect();
        let active_days = days.len() as u64;
        let focus_sessions = sessions.len() as u64;
        let daily_average = if active_days == 0 {
            0.0
        } else {
            (focus_sessions as f64 / active_days as f64 * 10.0).round() / 10.0
        };
        Self {
            focus_sessions,
            focus_minutes: sessions.iter().map(|s| s.duration_min).sum(),
            active_days,
            daily_average,
        }
    }
}

/// All-time focus totals, straight off the sessions table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllTimeSummary {
    pub focus_sessions: u64,
    pub focus_minutes: u64,
}

/// One bar of the weekly histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCount {
    pub day: NaiveDate,
    pub sessions: u64,
}

/// Sessions per calendar day over the `days` days ending at `today`,
/// oldest first. Days without sessions appear with a zero count.
pub fn daily_histogram(sessions: &[SessionRecord], today: NaiveDate, days: u32) -> Vec<DayCount> {
    (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_days(chrono::Days::new(u64::from(back))))
        .map(|day| DayCount {
            day,
            sessions: sessions.iter().filter(|s| s.local_day() == day).count() as u64,
        })
        .collect()
}

/// Start of the Sunday-based calendar week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - chrono::Days::new(u64::from(day.weekday().num_days_from_sunday()))
}

/// Composite 0-100 productivity score: up to 40 points for today's focus
/// sessions (5 each), up to 30 for task completion rate, up to 30 for the
/// day streak (2 per day).
pub fn productivity_score(
    today_sessions: u64,
    completion_rate_percent: f64,
    current_streak: u32,
) -> u32 {
    let session_score = (today_sessions * 5).min(40) as u32;
    let rate = (completion_rate_percent / 100.0).clamp(0.0, 1.0);
    let task_score = (rate * 30.0).round() as u32;
    let streak_score = (current_streak.saturating_mul(2)).min(30);
    (session_score + task_score + streak_score).min(100)
}
