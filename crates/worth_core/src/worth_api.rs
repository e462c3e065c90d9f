use crate::error::AppError;
use crate::history::{self, DayEntry, TodayStats};
use crate::model::{CompletionStatus, DailyCompletion, NonNegotiable, Penalty, Target};
use crate::storage::json_store::{self, RecordState};
use crate::worth;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time, UtcOffset};

/// The instant an operation runs at and the offset that decides calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub now: OffsetDateTime,
    pub offset: UtcOffset,
}

impl Clock {
    pub fn system() -> Self {
        let offset = local_offset();
        Self {
            now: OffsetDateTime::now_utc().to_offset(offset),
            offset,
        }
    }

    pub fn today(&self) -> Date {
        self.now.to_offset(self.offset).date()
    }
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub task: NonNegotiable,
    pub status: Option<CompletionStatus>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorthStatus {
    pub target: Option<Target>,
    pub worth: Decimal,
    pub daily_rate: Decimal,
    pub penalty_total: Decimal,
    pub adjusted_date: Option<OffsetDateTime>,
    pub today: TodayStats,
    pub day_number: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    pub date: Date,
    pub day_number: i64,
    pub is_today: bool,
    pub entries: Vec<DayEntry>,
}

pub fn set_target(
    target_amount: &str,
    target_date: &str,
    start_amount: Option<&str>,
) -> Result<Target, AppError> {
    let path = json_store::store_path()?;
    set_target_with_path(
        &path,
        target_amount,
        target_date,
        start_amount,
        &Clock::system(),
    )
}

pub fn current_target() -> Result<Option<Target>, AppError> {
    let path = json_store::store_path()?;
    current_target_with_path(&path)
}

pub fn add_task(title: &str) -> Result<NonNegotiable, AppError> {
    let path = json_store::store_path()?;
    add_task_with_path(&path, title, &Clock::system())
}

pub fn list_tasks() -> Result<Vec<TaskView>, AppError> {
    let path = json_store::store_path()?;
    list_tasks_with_path(&path, &Clock::system())
}

pub fn remove_task(id: &str) -> Result<NonNegotiable, AppError> {
    let path = json_store::store_path()?;
    remove_task_with_path(&path, id)
}

pub fn move_task(id: &str, position: usize) -> Result<Vec<NonNegotiable>, AppError> {
    let path = json_store::store_path()?;
    move_task_with_path(&path, id, position)
}

pub fn mark_task(
    id: &str,
    status: CompletionStatus,
    note: Option<&str>,
) -> Result<DailyCompletion, AppError> {
    let path = json_store::store_path()?;
    mark_task_with_path(&path, id, status, note, &Clock::system())
}

pub fn set_note(id: &str, note: &str) -> Result<DailyCompletion, AppError> {
    let path = json_store::store_path()?;
    set_note_with_path(&path, id, note, &Clock::system())
}

pub fn clear_mark(id: &str) -> Result<DailyCompletion, AppError> {
    let path = json_store::store_path()?;
    clear_mark_with_path(&path, id, &Clock::system())
}

pub fn add_penalty(amount: &str, reason: Option<&str>) -> Result<Penalty, AppError> {
    let path = json_store::store_path()?;
    add_penalty_with_path(&path, amount, reason, &Clock::system())
}

pub fn list_penalties() -> Result<Vec<Penalty>, AppError> {
    let path = json_store::store_path()?;
    list_penalties_with_path(&path)
}

pub fn status() -> Result<WorthStatus, AppError> {
    let path = json_store::store_path()?;
    status_with_path(&path, &Clock::system())
}

pub fn day(date: &str) -> Result<DayReport, AppError> {
    let path = json_store::store_path()?;
    day_with_path(&path, date, &Clock::system())
}

/// Largest amount accepted from user input.
const MAX_AMOUNT: Decimal = dec!(1000000000000);

fn record_id(prefix: &str, now: OffsetDateTime, sequence: usize) -> String {
    format!("{prefix}-{}-{sequence}", now.unix_timestamp_nanos())
}

fn parse_amount(raw: &str, field: &str) -> Result<Decimal, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input(format!("{field} is required")));
    }
    let amount = Decimal::from_str(trimmed)
        .map_err(|_| AppError::invalid_input(format!("{field} must be a number")))?;
    if amount.abs() > MAX_AMOUNT {
        return Err(AppError::invalid_input(format!(
            "{field} must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(amount)
}

fn parse_calendar_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid_input("date must be YYYY-MM-DD"))
}

/// `YYYY-MM-DD` means midnight UTC of that day; full RFC 3339 timestamps are kept as given.
fn parse_target_date(raw: &str) -> Result<OffsetDateTime, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("target date is required"));
    }

    if let Ok(timestamp) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(timestamp);
    }

    parse_calendar_date(trimmed)
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
        .map_err(|_| AppError::invalid_input("target date must be YYYY-MM-DD or RFC3339"))
}

fn trimmed_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn require_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed)
}

fn require_target(state: &RecordState) -> Result<Target, AppError> {
    state
        .current_target()
        .cloned()
        .ok_or_else(|| AppError::invalid_input("no target set"))
}

fn penalty_total(state: &RecordState, target: &Target) -> Decimal {
    state
        .penalties
        .iter()
        .filter(|penalty| penalty.target_id == target.id)
        .fold(Decimal::ZERO, |total, penalty| total.saturating_add(penalty.amount))
}

/// Active tasks of `target` in display order.
fn ordered_active_tasks<'a>(state: &'a RecordState, target: &Target) -> Vec<&'a NonNegotiable> {
    let mut tasks: Vec<&NonNegotiable> = state
        .tasks
        .iter()
        .filter(|task| task.target_id == target.id && task.active)
        .collect();
    tasks.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then(a.created_at.cmp(&b.created_at))
    });
    tasks
}

/// Index of an active task of the current target.
fn active_task_index(state: &RecordState, target: &Target, id: &str) -> Result<usize, AppError> {
    let index = state
        .tasks
        .iter()
        .position(|task| task.id == id && task.target_id == target.id)
        .ok_or_else(|| AppError::not_found(format!("task not found: {id}")))?;
    if !state.tasks[index].active {
        return Err(AppError::invalid_input("task was removed"));
    }
    Ok(index)
}

fn set_target_with_path(
    path: &Path,
    target_amount: &str,
    target_date: &str,
    start_amount: Option<&str>,
    clock: &Clock,
) -> Result<Target, AppError> {
    let target_amount = parse_amount(target_amount, "target amount")?;
    if target_amount <= Decimal::ZERO {
        return Err(AppError::invalid_input("target amount must be positive"));
    }

    let start_amount = match start_amount.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => parse_amount(raw, "start amount")?,
        None => Decimal::ZERO,
    };
    if start_amount < Decimal::ZERO {
        return Err(AppError::invalid_input("start amount cannot be negative"));
    }

    let target_date = parse_target_date(target_date)?;
    if target_date <= clock.now {
        return Err(AppError::invalid_input("target date must be in the future"));
    }

    let mut state = json_store::load_state(path)?;
    let target = Target {
        id: record_id("target", clock.now, state.targets.len() + 1),
        created_at: clock.now,
        target_date,
        target_amount,
        start_amount,
    };
    state.targets.push(target.clone());
    json_store::save_state(path, &state)?;

    log::debug!("created target {} for {}", target.id, target.target_amount);
    Ok(target)
}

fn current_target_with_path(path: &Path) -> Result<Option<Target>, AppError> {
    let state = json_store::load_state(path)?;
    Ok(state.current_target().cloned())
}

fn add_task_with_path(path: &Path, title: &str, clock: &Clock) -> Result<NonNegotiable, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }

    let mut state = json_store::load_state(path)?;
    let target = require_target(&state)?;
    let order_index = ordered_active_tasks(&state, &target).len() as u32;

    let task = NonNegotiable {
        id: record_id("nn", clock.now, state.tasks.len() + 1),
        target_id: target.id.clone(),
        title: trimmed.to_string(),
        active: true,
        order_index,
        created_at: clock.now,
    };
    state.tasks.push(task.clone());
    json_store::save_state(path, &state)?;

    log::debug!("added task {} to target {}", task.id, target.id);
    Ok(task)
}

fn list_tasks_with_path(path: &Path, clock: &Clock) -> Result<Vec<TaskView>, AppError> {
    let state = json_store::load_state(path)?;
    let Some(target) = state.current_target() else {
        return Ok(Vec::new());
    };
    let today = clock.today();

    let views = ordered_active_tasks(&state, target)
        .into_iter()
        .map(|task| {
            let completion = state
                .completions
                .iter()
                .find(|completion| completion.task_id == task.id && completion.date == today);
            TaskView {
                task: task.clone(),
                status: completion.map(|c| c.status),
                note: completion.and_then(|c| c.note.clone()),
            }
        })
        .collect();

    Ok(views)
}

fn remove_task_with_path(path: &Path, id: &str) -> Result<NonNegotiable, AppError> {
    let trimmed_id = require_id(id)?;
    let mut state = json_store::load_state(path)?;
    let target = require_target(&state)?;
    let index = active_task_index(&state, &target, trimmed_id)?;

    state.tasks[index].active = false;
    let removed = state.tasks[index].clone();
    json_store::save_state(path, &state)?;

    log::debug!("deactivated task {}", removed.id);
    Ok(removed)
}

/// Moves an active task to a 1-based `position` and renumbers the rest.
fn move_task_with_path(
    path: &Path,
    id: &str,
    position: usize,
) -> Result<Vec<NonNegotiable>, AppError> {
    let trimmed_id = require_id(id)?;
    let mut state = json_store::load_state(path)?;
    let target = require_target(&state)?;
    active_task_index(&state, &target, trimmed_id)?;

    let mut order: Vec<String> = ordered_active_tasks(&state, &target)
        .into_iter()
        .map(|task| task.id.clone())
        .collect();
    if position == 0 || position > order.len() {
        return Err(AppError::invalid_input(format!(
            "position must be between 1 and {}",
            order.len()
        )));
    }

    let from = order
        .iter()
        .position(|task_id| task_id == trimmed_id)
        .ok_or_else(|| AppError::not_found(format!("task not found: {trimmed_id}")))?;
    let moved = order.remove(from);
    order.insert(position - 1, moved);

    for task in state.tasks.iter_mut() {
        if let Some(index) = order.iter().position(|task_id| *task_id == task.id) {
            task.order_index = index as u32;
        }
    }
    json_store::save_state(path, &state)?;

    let reordered = ordered_active_tasks(&state, &target)
        .into_iter()
        .cloned()
        .collect();
    Ok(reordered)
}

fn mark_task_with_path(
    path: &Path,
    id: &str,
    status: CompletionStatus,
    note: Option<&str>,
    clock: &Clock,
) -> Result<DailyCompletion, AppError> {
    let trimmed_id = require_id(id)?;
    let mut state = json_store::load_state(path)?;
    let target = require_target(&state)?;
    active_task_index(&state, &target, trimmed_id)?;

    let today = clock.today();
    let completion = DailyCompletion {
        task_id: trimmed_id.to_string(),
        date: today,
        status,
        note: trimmed_text(note),
    };

    match state
        .completions
        .iter_mut()
        .find(|existing| existing.task_id == trimmed_id && existing.date == today)
    {
        Some(existing) => *existing = completion.clone(),
        None => state.completions.push(completion.clone()),
    }
    json_store::save_state(path, &state)?;

    log::debug!("marked task {} {} on {}", trimmed_id, status.label(), today);
    Ok(completion)
}

fn set_note_with_path(
    path: &Path,
    id: &str,
    note: &str,
    clock: &Clock,
) -> Result<DailyCompletion, AppError> {
    let trimmed_id = require_id(id)?;
    let mut state = json_store::load_state(path)?;
    let target = require_target(&state)?;
    active_task_index(&state, &target, trimmed_id)?;
    let today = clock.today();

    let existing = state
        .completions
        .iter_mut()
        .find(|existing| existing.task_id == trimmed_id && existing.date == today)
        .ok_or_else(|| AppError::invalid_input("task is not marked today"))?;
    existing.note = trimmed_text(Some(note));
    let updated = existing.clone();
    json_store::save_state(path, &state)?;

    log::debug!("updated note of task {} on {}", trimmed_id, today);
    Ok(updated)
}

fn clear_mark_with_path(
    path: &Path,
    id: &str,
    clock: &Clock,
) -> Result<DailyCompletion, AppError> {
    let trimmed_id = require_id(id)?;
    let mut state = json_store::load_state(path)?;
    let target = require_target(&state)?;
    active_task_index(&state, &target, trimmed_id)?;
    let today = clock.today();

    let index = state
        .completions
        .iter()
        .position(|existing| existing.task_id == trimmed_id && existing.date == today)
        .ok_or_else(|| AppError::invalid_input("task is not marked today"))?;
    let removed = state.completions.remove(index);
    json_store::save_state(path, &state)?;

    log::debug!("cleared mark of task {} on {}", trimmed_id, today);
    Ok(removed)
}

fn add_penalty_with_path(
    path: &Path,
    amount: &str,
    reason: Option<&str>,
    clock: &Clock,
) -> Result<Penalty, AppError> {
    let amount = parse_amount(amount, "amount")?;
    if amount <= Decimal::ZERO {
        return Err(AppError::invalid_input("amount must be positive"));
    }

    let mut state = json_store::load_state(path)?;
    let target = require_target(&state)?;
    let penalty = Penalty {
        id: record_id("penalty", clock.now, state.penalties.len() + 1),
        target_id: target.id.clone(),
        amount,
        reason: trimmed_text(reason),
        created_at: clock.now,
    };
    state.penalties.push(penalty.clone());
    json_store::save_state(path, &state)?;

    log::debug!("applied penalty {} of {}", penalty.id, penalty.amount);
    Ok(penalty)
}

fn list_penalties_with_path(path: &Path) -> Result<Vec<Penalty>, AppError> {
    let state = json_store::load_state(path)?;
    let Some(target) = state.current_target() else {
        return Ok(Vec::new());
    };

    let mut penalties: Vec<Penalty> = state
        .penalties
        .iter()
        .filter(|penalty| penalty.target_id == target.id)
        .cloned()
        .collect();
    penalties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(penalties)
}

fn status_with_path(path: &Path, clock: &Clock) -> Result<WorthStatus, AppError> {
    let state = json_store::load_state(path)?;
    Ok(compute_status(&state, clock))
}

/// One engine invocation over the stored records.
pub fn compute_status(state: &RecordState, clock: &Clock) -> WorthStatus {
    let Some(target) = state.current_target() else {
        return WorthStatus {
            target: None,
            worth: Decimal::ZERO,
            daily_rate: Decimal::ZERO,
            penalty_total: Decimal::ZERO,
            adjusted_date: None,
            today: TodayStats::default(),
            day_number: None,
        };
    };

    let today = clock.today();
    let history = history::build_history(
        target,
        &state.tasks,
        &state.completions,
        today,
        clock.offset,
    );
    let penalties = penalty_total(state, target);

    WorthStatus {
        target: Some(target.clone()),
        worth: worth::current_worth(target, penalties, &history.with_today()),
        daily_rate: worth::daily_rate(target),
        penalty_total: penalties,
        adjusted_date: worth::adjusted_completion_date(target, &history.past),
        today: history::today_stats(
            target,
            &state.tasks,
            &state.completions,
            today,
            clock.offset,
        ),
        day_number: Some(history::day_number(target, today, clock.offset)),
    }
}

fn day_with_path(path: &Path, date: &str, clock: &Clock) -> Result<DayReport, AppError> {
    let date = parse_calendar_date(date)?;
    let state = json_store::load_state(path)?;
    let target = require_target(&state)?;

    let today = clock.today();
    let start = history::target_start_date(&target, clock.offset);
    if date < start || date > today {
        return Err(AppError::invalid_input(format!(
            "date must be between {start} and {today}"
        )));
    }

    Ok(DayReport {
        date,
        day_number: history::day_number(&target, date, clock.offset),
        is_today: date == today,
        entries: history::day_view(
            &target,
            &state.tasks,
            &state.completions,
            date,
            clock.offset,
        ),
    })
}
