//! Rebuilds per-day task tallies from stored tasks and completion rows.

use crate::model::{CompletionStatus, DailyCompletion, DayRecord, NonNegotiable, Target};
use serde::Serialize;
use std::collections::HashMap;
use time::{Date, UtcOffset};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    /// Day after target creation through yesterday, days without tasks omitted.
    pub past: Vec<DayRecord>,
    pub today: DayRecord,
}

impl History {
    /// Past days plus today's partial tally, as the worth calculation wants them.
    pub fn with_today(&self) -> Vec<DayRecord> {
        let mut days = self.past.clone();
        days.push(self.today);
        days
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodayStats {
    pub done: u32,
    pub missed: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayEntry {
    pub task_id: String,
    pub title: String,
    pub status: Option<CompletionStatus>,
    pub note: Option<String>,
}

type CompletionIndex<'a> = HashMap<(&'a str, Date), &'a DailyCompletion>;

fn index_completions(completions: &[DailyCompletion]) -> CompletionIndex<'_> {
    completions
        .iter()
        .map(|completion| ((completion.task_id.as_str(), completion.date), completion))
        .collect()
}

fn created_on(task: &NonNegotiable, offset: UtcOffset) -> Date {
    task.created_at.to_offset(offset).date()
}

pub fn target_start_date(target: &Target, offset: UtcOffset) -> Date {
    target.created_at.to_offset(offset).date()
}

/// 1-based day count since the target was created.
pub fn day_number(target: &Target, date: Date, offset: UtcOffset) -> i64 {
    (date - target_start_date(target, offset)).whole_days() + 1
}

/// Tasks of `target` that existed on `date`, whether or not they were removed since.
fn tasks_existing_on<'a>(
    target: &'a Target,
    tasks: &'a [NonNegotiable],
    date: Date,
    offset: UtcOffset,
) -> impl Iterator<Item = &'a NonNegotiable> {
    tasks
        .iter()
        .filter(move |task| task.target_id == target.id && created_on(task, offset) <= date)
}

fn tally<'a>(
    tasks: impl Iterator<Item = &'a NonNegotiable>,
    index: &CompletionIndex<'_>,
    date: Date,
) -> DayRecord {
    let mut record = DayRecord::new(date, 0, 0);
    for task in tasks {
        record.tasks_total += 1;
        let completed = index
            .get(&(task.id.as_str(), date))
            .is_some_and(|completion| completion.status == CompletionStatus::Completed);
        if completed {
            record.tasks_completed += 1;
        }
    }
    record
}

pub fn build_history(
    target: &Target,
    tasks: &[NonNegotiable],
    completions: &[DailyCompletion],
    today: Date,
    offset: UtcOffset,
) -> History {
    let index = index_completions(completions);
    let mut past = Vec::new();

    let mut cursor = target_start_date(target, offset).next_day();
    while let Some(date) = cursor {
        if date >= today {
            break;
        }
        let record = tally(tasks_existing_on(target, tasks, date, offset), &index, date);
        if record.tasks_total > 0 {
            past.push(record);
        }
        cursor = date.next_day();
    }

    let active_today = tasks_existing_on(target, tasks, today, offset).filter(|task| task.active);
    let today = tally(active_today, &index, today);

    History { past, today }
}

pub fn today_stats(
    target: &Target,
    tasks: &[NonNegotiable],
    completions: &[DailyCompletion],
    today: Date,
    offset: UtcOffset,
) -> TodayStats {
    let index = index_completions(completions);
    let mut stats = TodayStats::default();

    for task in tasks_existing_on(target, tasks, today, offset).filter(|task| task.active) {
        stats.total += 1;
        match index.get(&(task.id.as_str(), today)).map(|c| c.status) {
            Some(CompletionStatus::Completed) => stats.done += 1,
            Some(CompletionStatus::Missed) => stats.missed += 1,
            None => {}
        }
    }

    stats
}

/// What each task looked like on `date`, in display order.
pub fn day_view(
    target: &Target,
    tasks: &[NonNegotiable],
    completions: &[DailyCompletion],
    date: Date,
    offset: UtcOffset,
) -> Vec<DayEntry> {
    let index = index_completions(completions);
    let mut existing: Vec<&NonNegotiable> = tasks_existing_on(target, tasks, date, offset).collect();
    existing.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then(a.created_at.cmp(&b.created_at))
    });

    existing
        .into_iter()
        .map(|task| {
            let completion = index.get(&(task.id.as_str(), date));
            DayEntry {
                task_id: task.id.clone(),
                title: task.title.clone(),
                status: completion.map(|c| c.status),
                note: completion.and_then(|c| c.note.clone()),
            }
        })
        .collect()
}
