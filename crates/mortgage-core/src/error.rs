use thiserror::Error;

#[derive(Debug, Error)]
pub enum MortgageError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid payment number: month {month} is outside the schedule (1..={schedule_len})")]
    InvalidPaymentNumber { month: u32, schedule_len: usize },

    #[error("Invalid rate change month: {month} must fall strictly inside the schedule (0, {schedule_len})")]
    InvalidRateChangeMonth { month: u32, schedule_len: usize },

    #[error("Schedule too long: {months} months requested, limit is {limit}")]
    ScheduleTooLong { months: u32, limit: u32 },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MortgageError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        MortgageError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MortgageError {
    fn from(e: serde_json::Error) -> Self {
        MortgageError::SerializationError(e.to_string())
    }
}
