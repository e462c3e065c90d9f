use crate::error::AppError;
use rust_decimal::{Decimal, RoundingStrategy};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

const SHORT_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[month padding:none]/[day padding:none]/[year]");
const SHORT_DATE_TIME: &[BorrowedFormatItem<'static>] = format_description!(
    "[month padding:none]/[day padding:none]/[year], [hour repr:12 padding:none]:[minute] [period]"
);
const DAY_LABEL: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:short], [month repr:short] [day padding:none]");

/// `$1,234.50` / `-$1,234.50`. Rounds half away from zero to cents.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{rounded:.2}");
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let sign = if value < Decimal::ZERO { "-$" } else { "$" };
    format!("{sign}{}.{cents}", group_thousands(whole))
}

/// Penalty log entries always read as deductions.
pub fn format_penalty(amount: Decimal) -> String {
    format!("-{}", format_currency(amount))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_date(value: OffsetDateTime, offset: UtcOffset) -> Result<String, AppError> {
    value
        .to_offset(offset)
        .format(SHORT_DATE)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

/// Adjusted dates move in fractions of a day, so they carry the clock time.
pub fn format_date_time(value: OffsetDateTime, offset: UtcOffset) -> Result<String, AppError> {
    value
        .to_offset(offset)
        .format(SHORT_DATE_TIME)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn format_day_label(date: Date) -> Result<String, AppError> {
    date.format(DAY_LABEL)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}
