pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "appraisal")]
pub mod appraisal;

pub use error::AppraisalError;
pub use types::*;

/// Standard result type for all appraisal operations
pub type CapexResult<T> = Result<T, AppraisalError>;
