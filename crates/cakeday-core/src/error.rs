use thiserror::Error;

#[derive(Debug, Error)]
pub enum CakedayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid anniversary date: month {month}, day {day}")]
    InvalidDate { month: u32, day: u32 },

    #[error("Invalid birth year: {0}")]
    InvalidYear(i32),
}

pub type Result<T> = std::result::Result<T, CakedayError>;
