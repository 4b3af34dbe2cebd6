//! Input validation errors.
//!
//! Every controller operation validates its input before a request is
//! sent to the compute service. A [`ValidationError`] therefore always
//! means "nothing was sent and nothing changed".

/// Errors raised when controller input is rejected locally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The requested board size lies outside the supported range.
    #[error("board size {n} is outside the supported range {min}..={max}")]
    BoardSize {
        /// The requested size.
        n: u8,
        /// Smallest supported size.
        min: u8,
        /// Largest supported size.
        max: u8,
    },

    /// The optimizer needs more cities before it can start.
    #[error("at least {required} cities are required, got {count}")]
    NotEnoughCities {
        /// Number of cities currently placed.
        count: usize,
        /// Minimum number of cities.
        required: usize,
    },

    /// A simulation parameter is out of range.
    #[error("invalid simulation parameter `{field}`: {reason}")]
    Params {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
