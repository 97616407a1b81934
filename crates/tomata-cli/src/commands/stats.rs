use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use clap::Subcommand;
use serde::Serialize;

use tomata_core::stats::{self, DayCount};
use tomata_core::storage::Database;
use tomata_core::{AllTimeSummary, StreakRecord, TaskStats, TodaySummary, WeekSummary};

use crate::session::{self, day_start_utc};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's focus sessions and minutes
    Today,
    /// This week's totals and daily average
    Week,
    /// All-time totals
    All,
    /// Summaries, streak, task stats, histogram, and recent activity
    Dashboard,
}

#[derive(Serialize)]
struct RecentView {
    completed_at: DateTime<Utc>,
    duration_min: u64,
    task: String,
}

#[derive(Serialize)]
struct Dashboard {
    today: TodaySummary,
    week: WeekSummary,
    all_time: AllTimeSummary,
    streak: StreakRecord,
    tasks: TaskStats,
    productivity_score: u32,
    week_histogram: Vec<DayCount>,
    recent: Vec<RecentView>,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let today = Local::now().date_naive();

    match action {
        StatsAction::Today => {
            let start = day_start_utc(today);
            let end = day_start_utc(today + Days::new(1));
            let summary = TodaySummary::from_sessions(&db.sessions_between(start, end)?);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::Week => {
            let start = day_start_utc(stats::week_start(today));
            let end = day_start_utc(today + Days::new(1));
            let summary = WeekSummary::from_sessions(&db.sessions_between(start, end)?);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::All => {
            let summary = db.all_time_summary()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::Dashboard => {
            let dashboard = build_dashboard(&db, today)?;
            println!("{}", serde_json::to_string_pretty(&dashboard)?);
        }
    }
    Ok(())
}

fn build_dashboard(
    db: &Database,
    today: NaiveDate,
) -> Result<Dashboard, Box<dyn std::error::Error>> {
    let end = day_start_utc(today + Days::new(1));

    let today_summary =
        TodaySummary::from_sessions(&db.sessions_between(day_start_utc(today), end)?);

    let week_sessions = db.sessions_between(day_start_utc(stats::week_start(today)), end)?;
    let week = WeekSummary::from_sessions(&week_sessions);

    let histogram_sessions = db.sessions_between(day_start_utc(today - Days::new(6)), end)?;
    let week_histogram = stats::daily_histogram(&histogram_sessions, today, 7);

    let tasks = TaskStats::from_tasks(&db.list_tasks(true)?);
    let streak = session::load_streak(db);
    let productivity_score = stats::productivity_score(
        today_summary.focus_sessions,
        tasks.completion_rate,
        streak.current_streak,
    );

    let recent = db
        .recent_sessions(10)?
        .into_iter()
        .map(|s| RecentView {
            completed_at: s.completed_at,
            duration_min: s.duration_min,
            task: s.task_title.unwrap_or_else(|| "N/A".to_string()),
        })
        .collect();

    Ok(Dashboard {
        today: today_summary,
        week,
        all_time: db.all_time_summary()?,
        streak,
        tasks,
        productivity_score,
        week_histogram,
        recent,
    })
}
