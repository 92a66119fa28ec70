pub mod amortization;
pub mod error;
pub mod fees;
pub mod loan;
pub mod scenario;
pub mod time_value;
pub mod types;

#[cfg(feature = "optimization")]
pub mod optimization;

#[cfg(feature = "tool_call")]
pub mod tool_call;

pub use error::MortgageError;
pub use types::*;

/// Standard result type for all mortgage operations
pub type MortgageResult<T> = Result<T, MortgageError>;
