mod records;

pub use records::{CompletionStatus, DailyCompletion, DayRecord, NonNegotiable, Penalty, Target};
