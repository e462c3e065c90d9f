use clap::{CommandFactory, Parser};
use rust_decimal::Decimal;
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};
use worth_cli::cli::{
    self, Cli, Command, PenaltyCommand, TargetCommand, TaskCommand, expand_alias,
    split_command_line,
};
use worth_core::config::{self, Config, Palette};
use worth_core::error::AppError;
use worth_core::format::{
    format_currency, format_date, format_date_time, format_day_label, format_penalty,
};
use worth_core::model::{CompletionStatus, DailyCompletion, Penalty, Target};
use worth_core::worth_api::{self, DayReport, TaskView, WorthStatus, local_offset};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Non-negotiable")]
    title: String,
    #[tabled(rename = "Today")]
    today: String,
    #[tabled(rename = "Note")]
    note: String,
}

#[derive(Tabled)]
struct PenaltyRow {
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Date")]
    date: String,
}

fn mark_label(status: Option<CompletionStatus>) -> &'static str {
    match status {
        Some(CompletionStatus::Completed) => "done",
        Some(CompletionStatus::Missed) => "missed",
        None => "-",
    }
}

fn mark_box(status: Option<CompletionStatus>) -> &'static str {
    match status {
        Some(CompletionStatus::Completed) => "[x]",
        Some(CompletionStatus::Missed) => "[-]",
        None => "[ ]",
    }
}

fn rfc3339(value: OffsetDateTime) -> Result<String, AppError> {
    value
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn target_json(target: &Target, offset: UtcOffset) -> Result<serde_json::Value, AppError> {
    Ok(serde_json::json!({
        "id": target.id,
        "created_at": rfc3339(target.created_at)?,
        "target_date": rfc3339(target.target_date)?,
        "target_amount": target.target_amount,
        "start_amount": target.start_amount,
        "target_date_display": format_date(target.target_date, offset)?,
        "daily_rate": worth_core::daily_rate(target),
    }))
}

fn completion_json(completion: &DailyCompletion) -> serde_json::Value {
    serde_json::json!({
        "task_id": completion.task_id,
        "date": completion.date.to_string(),
        "status": completion.status,
        "note": completion.note,
    })
}

fn penalty_json(penalty: &Penalty) -> Result<serde_json::Value, AppError> {
    Ok(serde_json::json!({
        "id": penalty.id,
        "amount": penalty.amount,
        "reason": penalty.reason,
        "created_at": rfc3339(penalty.created_at)?,
    }))
}

fn status_json(status: &WorthStatus, offset: UtcOffset) -> Result<serde_json::Value, AppError> {
    let target = status
        .target
        .as_ref()
        .map(|target| target_json(target, offset))
        .transpose()?;
    let adjusted_date = status.adjusted_date.map(rfc3339).transpose()?;
    let adjusted_date_display = status
        .adjusted_date
        .map(|date| format_date_time(date, offset))
        .transpose()?;

    Ok(serde_json::json!({
        "worth": status.worth,
        "worth_display": format_currency(status.worth),
        "daily_rate": status.daily_rate,
        "penalty_total": status.penalty_total,
        "target": target,
        "adjusted_date": adjusted_date,
        "adjusted_date_display": adjusted_date_display,
        "today": status.today,
        "day_number": status.day_number,
    }))
}

fn status_lines(
    status: &WorthStatus,
    palette: &Palette,
    offset: UtcOffset,
) -> Result<Vec<String>, AppError> {
    let worth = palette.signed(status.worth < Decimal::ZERO, &format_currency(status.worth));
    let mut lines = vec![format!("Current Worth: {worth}")];

    let Some(target) = status.target.as_ref() else {
        lines.push(palette.mutedize(
            "No target set. Run `worthmeter target set <amount> <date>` to start.",
        ));
        return Ok(lines);
    };

    let original = format_date(target.target_date, offset)?;
    let by = match status.adjusted_date {
        Some(adjusted) => format!(
            "{} -> {}",
            palette.mutedize(&original),
            palette.alert(&format_date_time(adjusted, offset)?)
        ),
        None => original,
    };
    lines.push(format!(
        "Target: {} by {}",
        format_currency(target.target_amount),
        by
    ));

    let mut day_line = format!("Day {}", status.day_number.unwrap_or(1));
    if status.today.total > 0 {
        day_line.push_str(&format!(
            " | ▲ {} ▼ {} of {}",
            status.today.done, status.today.missed, status.today.total
        ));
    }
    lines.push(day_line);

    lines.push(palette.mutedize(&format!(
        "Daily rate: {} | Penalties: {}",
        format_currency(status.daily_rate),
        format_penalty(status.penalty_total)
    )));

    Ok(lines)
}

fn print_status(
    status: &WorthStatus,
    json: bool,
    palette: &Palette,
    offset: UtcOffset,
) -> Result<(), AppError> {
    if json {
        println!("{}", status_json(status, offset)?);
    } else {
        for line in status_lines(status, palette, offset)? {
            println!("{line}");
        }
    }
    Ok(())
}

fn print_task_table(views: &[TaskView]) {
    if views.is_empty() {
        println!("No non-negotiables yet.");
        return;
    }

    let rows = views.iter().enumerate().map(|(index, view)| TaskRow {
        position: index + 1,
        id: view.task.id.clone(),
        title: view.task.title.clone(),
        today: mark_label(view.status).to_string(),
        note: view.note.clone().unwrap_or_default(),
    });
    println!("{}", Table::new(rows).with(Style::psql()));
}

fn print_penalty_table(penalties: &[Penalty], offset: UtcOffset) -> Result<(), AppError> {
    if penalties.is_empty() {
        println!("No penalties yet. Stay on track.");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(penalties.len());
    for penalty in penalties {
        rows.push(PenaltyRow {
            amount: format_penalty(penalty.amount),
            reason: penalty
                .reason
                .clone()
                .unwrap_or_else(|| "No reason given".to_string()),
            date: format_date(penalty.created_at, offset)?,
        });
    }
    println!("{}", Table::new(rows).with(Style::psql()));
    Ok(())
}

fn print_day(report: &DayReport, json: bool) -> Result<(), AppError> {
    if json {
        let entries: Vec<serde_json::Value> = report
            .entries
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "task_id": entry.task_id,
                    "title": entry.title,
                    "status": entry.status.map(CompletionStatus::label).unwrap_or("unmarked"),
                    "note": entry.note,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "date": report.date.to_string(),
                "day_number": report.day_number,
                "is_today": report.is_today,
                "entries": entries,
            })
        );
        return Ok(());
    }

    let label = if report.is_today {
        "Today".to_string()
    } else {
        format_day_label(report.date)?
    };
    println!("Day {} - {}", report.day_number, label);

    if report.entries.is_empty() {
        println!("No non-negotiables on this day.");
    }
    for entry in &report.entries {
        match entry.note.as_deref() {
            Some(note) => println!("{} {} ({})", mark_box(entry.status), entry.title, note),
            None => println!("{} {}", mark_box(entry.status), entry.title),
        }
    }
    Ok(())
}

fn print_mark(completion: &DailyCompletion, verb: &str, json: bool) {
    if json {
        println!("{}", completion_json(completion));
    } else {
        println!("{verb} task: {}", completion.task_id);
    }
}

/// Recomputes status on a fixed tick and prints whenever the rendering changes.
fn run_watch(
    interval_secs: u64,
    count: Option<u64>,
    json: bool,
    palette: &Palette,
) -> Result<(), AppError> {
    let offset = local_offset();
    let interval = std::time::Duration::from_secs(interval_secs.max(1));
    let mut previous: Option<(Decimal, Vec<String>)> = None;
    let mut ticks = 0u64;

    loop {
        let status = worth_api::status()?;
        let lines = status_lines(&status, palette, offset)?;
        ticks += 1;
        log::debug!("watch tick {ticks}: worth {}", status.worth);

        let changed = previous
            .as_ref()
            .is_none_or(|(_, previous_lines)| *previous_lines != lines);
        if changed {
            let dropped = previous
                .as_ref()
                .is_some_and(|(previous_worth, _)| status.worth < *previous_worth);
            if dropped && !json {
                println!("{}", palette.alert("▼ worth dropped"));
            }
            print_status(&status, json, palette, offset)?;
        }
        previous = Some((status.worth, lines));

        if count.is_some_and(|limit| ticks >= limit) {
            break;
        }
        std::thread::sleep(interval);
    }

    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(cli: Cli, base: &Config) -> Result<(), AppError> {
    let overrides = cli::collect_overrides(&cli.config_override)?;
    let config = config::merge_overrides(base, &overrides);
    let palette = config.palette();
    let offset = local_offset();

    match cli.command {
        Command::Target { target } => match target {
            TargetCommand::Set {
                amount,
                date,
                start,
            } => {
                let target = worth_api::set_target(&amount, &date, start.as_deref())?;
                if cli.json {
                    println!("{}", target_json(&target, offset)?);
                } else {
                    println!(
                        "Target set: {} by {} ({})",
                        format_currency(target.target_amount),
                        format_date(target.target_date, offset)?,
                        target.id
                    );
                }
            }
            TargetCommand::Show => {
                let target = worth_api::current_target()?;
                match (target, cli.json) {
                    (Some(target), true) => println!("{}", target_json(&target, offset)?),
                    (None, true) => println!("null"),
                    (Some(target), false) => {
                        println!(
                            "Target: {} by {} ({})",
                            format_currency(target.target_amount),
                            format_date(target.target_date, offset)?,
                            target.id
                        );
                        println!("Start: {}", format_currency(target.start_amount));
                        println!("Created: {}", format_date(target.created_at, offset)?);
                        println!(
                            "Daily rate: {}",
                            format_currency(worth_core::daily_rate(&target))
                        );
                    }
                    (None, false) => println!("No target set."),
                }
            }
        },
        Command::Task { task } => match task {
            TaskCommand::Add { title } => {
                let title = match title {
                    Some(value) if !value.trim().is_empty() => value,
                    _ => return Err(AppError::invalid_input("title is required")),
                };
                let task = worth_api::add_task(&title)?;
                if cli.json {
                    println!("{}", serde_json::json!({ "id": task.id, "title": task.title }));
                } else {
                    println!("Added task: {} ({})", task.title, task.id);
                }
            }
            TaskCommand::List => {
                let views = worth_api::list_tasks()?;
                if cli.json {
                    let payload = serde_json::to_value(&views)
                        .map_err(|err| AppError::invalid_data(err.to_string()))?;
                    println!("{payload}");
                } else {
                    print_task_table(&views);
                }
            }
            TaskCommand::Remove { id } => {
                let task = worth_api::remove_task(&id)?;
                if cli.json {
                    println!("{}", serde_json::json!({ "id": task.id, "active": task.active }));
                } else {
                    println!("Removed task: {} ({})", task.title, task.id);
                }
            }
            TaskCommand::Move { id, position } => {
                let ordered = worth_api::move_task(&id, position)?;
                if cli.json {
                    let ids: Vec<&str> = ordered.iter().map(|task| task.id.as_str()).collect();
                    println!("{}", serde_json::json!(ids));
                } else {
                    for (index, task) in ordered.iter().enumerate() {
                        println!("{}. {} ({})", index + 1, task.title, task.id);
                    }
                }
            }
        },
        Command::Done { id, message } => {
            let completion =
                worth_api::mark_task(&id, CompletionStatus::Completed, message.as_deref())?;
            print_mark(&completion, "Completed", cli.json);
        }
        Command::Miss { id, message } => {
            let completion =
                worth_api::mark_task(&id, CompletionStatus::Missed, message.as_deref())?;
            print_mark(&completion, "Missed", cli.json);
        }
        Command::Clear { id } => {
            let completion = worth_api::clear_mark(&id)?;
            print_mark(&completion, "Cleared", cli.json);
        }
        Command::Note { id, text } => {
            let completion = worth_api::set_note(&id, &text)?;
            print_mark(&completion, "Noted", cli.json);
        }
        Command::Penalty { penalty } => match penalty {
            PenaltyCommand::Add { amount, reason } => {
                let penalty = worth_api::add_penalty(&amount, reason.as_deref())?;
                if cli.json {
                    println!("{}", penalty_json(&penalty)?);
                } else {
                    let reason = penalty.reason.as_deref().unwrap_or("No reason given");
                    println!(
                        "Penalty applied: {} ({})",
                        palette.alert(&format_penalty(penalty.amount)),
                        reason
                    );
                }
            }
            PenaltyCommand::List => {
                let penalties = worth_api::list_penalties()?;
                if cli.json {
                    let payload = penalties
                        .iter()
                        .map(penalty_json)
                        .collect::<Result<Vec<_>, _>>()?;
                    println!("{}", serde_json::Value::Array(payload));
                } else {
                    print_penalty_table(&penalties, offset)?;
                }
            }
        },
        Command::Status => {
            let status = worth_api::status()?;
            print_status(&status, cli.json, &palette, offset)?;
        }
        Command::Day { date } => {
            let report = worth_api::day(&date)?;
            print_day(&report, cli.json)?;
        }
        Command::Watch { interval, count } => {
            let interval = interval.unwrap_or_else(|| config.refresh_seconds());
            run_watch(interval, count, cli.json, &palette)?;
        }
    }

    Ok(())
}

/// Expands aliases and parses one argument vector (without the program name).
fn parse_args(args: Vec<String>, base: &Config) -> Result<Option<Cli>, AppError> {
    let early = cli::collect_overrides(&cli::scan_config_overrides(&args)).unwrap_or_default();
    let aliases = config::merge_overrides(base, &early).aliases;
    let args = expand_alias(args, &aliases)?;

    let argv = std::iter::once("worthmeter".to_string()).chain(args);
    match Cli::try_parse_from(argv) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            Ok(None)
        }
        Err(err) => Err(normalize_parse_error(err)),
    }
}

fn run_interactive(base: &Config) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        let cli = match parse_args(args, base) {
            Ok(Some(cli)) => cli,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if let Err(err) = run_command(cli, base) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let loaded = config::load_config_with_fallback();
    if let Some(err) = loaded.error.as_ref() {
        log::warn!("using default configuration: {err}");
    }
    let base = loaded.config;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        if let Err(err) = run_interactive(&base) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match parse_args(args, &base) {
        Ok(Some(cli)) => cli,
        Ok(None) => return,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli, &base) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
