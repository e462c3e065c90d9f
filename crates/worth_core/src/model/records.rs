use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// The monetary goal. Only the most recently created target is in play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub target_date: OffsetDateTime,
    pub target_amount: Decimal,
    #[serde(default)]
    pub start_amount: Decimal,
}

/// A recurring daily task whose completion credits worth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonNegotiable {
    pub id: String,
    pub target_id: String,
    pub title: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub order_index: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    Missed,
}

impl CompletionStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Missed => "missed",
        }
    }
}

/// One task's mark for one calendar day. No row means the task is unmarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCompletion {
    pub task_id: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub status: CompletionStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub id: String,
    pub target_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A calendar day's task tally as consumed by the worth engine.
///
/// `tasks_total == 0` marks a day before any task existed; the engine skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub tasks_completed: u32,
    pub tasks_total: u32,
}

impl DayRecord {
    pub fn new(date: Date, tasks_completed: u32, tasks_total: u32) -> Self {
        Self {
            date,
            tasks_completed,
            tasks_total,
        }
    }

    pub fn tasks_missed(&self) -> u32 {
        self.tasks_total.saturating_sub(self.tasks_completed)
    }
}
