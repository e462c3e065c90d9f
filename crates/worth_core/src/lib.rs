pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod model;
pub mod storage;
pub mod worth;
pub mod worth_api;

pub use worth::{adjusted_completion_date, current_worth, daily_rate};
