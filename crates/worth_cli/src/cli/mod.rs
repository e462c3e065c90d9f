use clap::{Parser, Subcommand};
use std::collections::HashMap;
use worth_core::config::{ConfigOverrides, Theme};
use worth_core::error::AppError;

#[derive(Parser, Debug)]
#[command(name = "worthmeter", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set or show the savings target
    Target {
        #[command(subcommand)]
        target: TargetCommand,
    },
    /// Manage daily non-negotiables
    Task {
        #[command(subcommand)]
        task: TaskCommand,
    },
    /// Mark a non-negotiable as done today
    ///
    /// Example: worthmeter done nn-1 -m "5k before work"
    Done {
        id: String,
        #[arg(short = 'm', long = "message", value_name = "MESSAGE")]
        message: Option<String>,
    },
    /// Mark a non-negotiable as missed today
    ///
    /// Example: worthmeter miss nn-1 -m "sick"
    Miss {
        id: String,
        #[arg(short = 'm', long = "message", value_name = "MESSAGE")]
        message: Option<String>,
    },
    /// Remove today's mark from a non-negotiable
    Clear { id: String },
    /// Attach a note to today's mark
    ///
    /// Example: worthmeter note nn-1 "ran the long route"
    Note { id: String, text: String },
    /// Apply or list penalties
    Penalty {
        #[command(subcommand)]
        penalty: PenaltyCommand,
    },
    /// Show current worth and the adjusted target date
    Status,
    /// Show how each non-negotiable went on a past day
    ///
    /// Example: worthmeter day 2025-12-24
    Day { date: String },
    /// Recompute worth periodically and print changes
    ///
    /// Example: worthmeter watch --interval 5
    Watch {
        /// Seconds between refreshes (defaults to the configured refresh_seconds)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        /// Stop after this many refreshes
        #[arg(long, value_name = "N")]
        count: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TargetCommand {
    /// Lock in a new target
    ///
    /// Example: worthmeter target set 100000 2026-12-31 --start 2500
    Set {
        amount: String,
        /// YYYY-MM-DD or RFC3339
        date: String,
        #[arg(long, value_name = "AMOUNT")]
        start: Option<String>,
    },
    /// Show the active target
    Show,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a non-negotiable
    ///
    /// Example: worthmeter task add "Read 20 pages"
    Add { title: Option<String> },
    /// List active non-negotiables with today's marks
    List,
    /// Stop tracking a non-negotiable (history is kept)
    Remove { id: String },
    /// Move a non-negotiable to a 1-based position
    ///
    /// Example: worthmeter task move nn-3 1
    Move { id: String, position: usize },
}

#[derive(Subcommand, Debug)]
pub enum PenaltyCommand {
    /// Deduct an amount from current worth
    ///
    /// Example: worthmeter penalty add 25 -r "skipped gym"
    Add {
        #[arg(allow_negative_numbers = true)]
        amount: String,
        #[arg(short = 'r', long = "reason", value_name = "REASON")]
        reason: Option<String>,
    },
    /// List penalties, newest first
    List,
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    Alias(String),
    RefreshSeconds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field =
        canonicalize_flag_name(field).ok_or_else(|| "override key cannot be empty".to_string())?;

    match canonical_field.as_str() {
        "theme" | "refresh_seconds" | "refresh" => {
            if remainder.is_some() {
                return Err(format!("{canonical_field} override cannot have subfields"));
            }
            let target = if canonical_field == "theme" {
                ConfigOverrideTarget::Theme
            } else {
                ConfigOverrideTarget::RefreshSeconds
            };
            Ok(ParsedConfigOverride { target, value })
        }
        "aliases" | "alias" => {
            let alias_name = remainder
                .filter(|segment| !segment.is_empty())
                .ok_or_else(|| "aliases override requires an alias name".to_string())?;
            Ok(ParsedConfigOverride {
                target: ConfigOverrideTarget::Alias(alias_name.to_string()),
                value,
            })
        }
        other => Err(format!("unknown config field '{other}'")),
    }
}

/// Folds every `--config-override` value into one set of overrides.
pub fn collect_overrides(raw_overrides: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for raw in raw_overrides {
        let parsed = parse_config_override(raw).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => {
                let theme = Theme::parse(&parsed.value).ok_or_else(|| {
                    AppError::invalid_input(format!("unknown theme '{}'", parsed.value))
                })?;
                overrides.theme = Some(theme);
            }
            ConfigOverrideTarget::Alias(name) => {
                overrides.aliases.insert(name, parsed.value);
            }
            ConfigOverrideTarget::RefreshSeconds => {
                let seconds = parsed.value.parse::<u64>().map_err(|_| {
                    AppError::invalid_input("refresh_seconds must be a whole number")
                })?;
                overrides.refresh_seconds = Some(seconds);
            }
        }
    }
    Ok(overrides)
}

/// Pulls `--config-override` values out of raw arguments before clap sees them.
pub fn scan_config_overrides(args: &[String]) -> Vec<String> {
    let mut found = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == CONFIG_OVERRIDE_FLAG {
            if let Some(value) = iter.next() {
                found.push(value.clone());
            }
        } else if let Some(value) = arg
            .strip_prefix(CONFIG_OVERRIDE_FLAG)
            .and_then(|rest| rest.strip_prefix('='))
        {
            found.push(value.to_string());
        }
    }
    found
}

/// Replaces a leading alias with the words it stands for.
pub fn expand_alias(
    args: Vec<String>,
    aliases: &HashMap<String, String>,
) -> Result<Vec<String>, AppError> {
    let Some(first) = args.first() else {
        return Ok(args);
    };
    let Some(expansion) = aliases.get(first) else {
        return Ok(args);
    };

    let mut expanded = split_command_line(expansion)?;
    expanded.extend(args.into_iter().skip(1));
    Ok(expanded)
}

pub fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
